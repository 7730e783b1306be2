use {
    chrono::{DateTime, TimeZone, Utc},
    serde::{Deserialize, Serialize},
};

/// A scalar that arrives as either a JSON number or a JSON string.
///
/// Report ids and time bounds are produced by an upstream analysis engine
/// that is inconsistent about this, so both spellings must round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn zero() -> Self {
        Scalar::Int(0)
    }

    /// Interpret the scalar as a UTC timestamp.
    ///
    /// Numbers are taken as epoch milliseconds, strings as RFC 3339.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Scalar::Int(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Scalar::Float(ms) => Utc.timestamp_millis_opt(*ms as i64).single(),
            Scalar::Text(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A single transaction inside a report.
///
/// Only `id` and `value` are guaranteed on the wire; every other field is
/// filled in depending on which graph the report targets, so absences
/// default instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique within the containing report.
    pub id: String,
    /// Non-negative amount in the domain's smallest unit.
    pub value: f64,
    /// Paying account, used by the account graph.
    #[serde(default)]
    pub src: String,
    /// Receiving account, used by the account graph.
    #[serde(default)]
    pub target: String,
    /// Ids of transactions this one causally precedes.
    #[serde(default)]
    pub successor: Vec<String>,
    /// Causal/chronological rank, grouping hint only.
    #[serde(default)]
    pub depth: u32,
    /// Cross-border flag.
    #[serde(default, rename = "xCountry")]
    pub x_country: bool,
    /// Cash-settlement flag.
    #[serde(default)]
    pub cash: bool,
}

/// One analysis result batch: a time window plus its transactions.
///
/// Immutable once stored. `id` is the identifier embedded in the payload by
/// the analysis engine; it is unrelated to the key the report store assigns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Scalar,
    #[serde(default = "Scalar::zero")]
    pub start: Scalar,
    #[serde(default = "Scalar::zero")]
    pub end: Scalar,
    pub members: Vec<Transaction>,
}
