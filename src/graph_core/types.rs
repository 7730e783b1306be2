use {crate::model::Transaction, serde::Serialize};

/// Aggregate flow totals for one account node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotals {
    /// Sum of `value` over transactions targeting this account.
    pub in_sum: f64,
    /// Sum of `value` over transactions paid from this account.
    pub out_sum: f64,
    pub in_count: u64,
    pub out_count: u64,
}

impl AccountTotals {
    pub fn zeroed() -> Self {
        Self {
            in_sum: 0.0,
            out_sum: 0.0,
            in_count: 0,
            out_count: 0,
        }
    }
}

/// A node in a built graph.
///
/// Node identity is 1:1 with either a transaction id or an account
/// identifier; a built graph never contains two nodes with the same id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphNode {
    Transaction {
        id: String,
        depth: u32,
        transaction: Transaction,
        #[serde(rename = "displayValue")]
        display_value: f64,
    },
    Account {
        id: String,
        account: AccountTotals,
        #[serde(rename = "displayValue")]
        display_value: f64,
    },
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            GraphNode::Transaction { id, .. } => id,
            GraphNode::Account { id, .. } => id,
        }
    }

    pub fn display_value(&self) -> f64 {
        match self {
            GraphNode::Transaction { display_value, .. } => *display_value,
            GraphNode::Account { display_value, .. } => *display_value,
        }
    }
}

/// A directed link in a built graph.
///
/// `source`/`target` reference nodes by id; the node list holds the single
/// instance for each id. Transaction links are kept one per successor entry
/// (parallel edges possible); account links are collapsed to one per
/// ordered (src, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphLink {
    Transaction {
        source: String,
        target: String,
    },
    Account {
        source: String,
        target: String,
        #[serde(rename = "xCountry")]
        x_country: bool,
        /// Every underlying transaction for this ordered pair, in report
        /// order, for detail drill-down and count badges.
        transactions: Vec<Transaction>,
    },
}

impl GraphLink {
    pub fn source(&self) -> &str {
        match self {
            GraphLink::Transaction { source, .. } => source,
            GraphLink::Account { source, .. } => source,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            GraphLink::Transaction { target, .. } => target,
            GraphLink::Account { target, .. } => target,
        }
    }
}

/// The complete `{nodes, links}` pair handed to the rendering layer.
///
/// Node and link order equals first-occurrence order in the source report,
/// so rebuilds are stable and diffs are meaningful.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl Graph {
    /// Look up a node by its id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }
}
