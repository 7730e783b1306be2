//! Pluggable per-domain behavior.
//!
//! The same graph engine serves different transaction domains (Bitcoin
//! traces, bank transfer batches); everything domain-specific (display
//! scaling, inspector text, report list signatures) lives behind the
//! [`UseCase`] trait and is resolved by name at configuration time.

use {
    crate::graph_core::{GraphLink, GraphNode},
    crate::model::Report,
    std::collections::HashMap,
    std::sync::Arc,
};

/// Any element of a built graph an inspector can ask details for.
#[derive(Debug, Clone, Copy)]
pub enum GraphElement<'a> {
    Node(&'a GraphNode),
    Link(&'a GraphLink),
}

/// One transaction domain's behavior.
pub trait UseCase: Send + Sync + std::fmt::Debug {
    /// Registry name for logging and configuration.
    fn name(&self) -> &'static str;

    /// Fixed-point divisor for transaction-node display values:
    /// `display_value = 1 + value / value_scale`.
    fn value_scale(&self) -> f64;

    /// Renderable description of any node or link, for the inspector pane.
    fn details_for(&self, element: GraphElement<'_>) -> String;

    /// Short descriptive line for the report list.
    fn report_signature(&self, report: &Report) -> String;
}

#[derive(Debug)]
pub struct UnknownStrategyError {
    pub name: String,
}

impl std::fmt::Display for UnknownStrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "No use case registered under the name '{}'", self.name)
    }
}

impl std::error::Error for UnknownStrategyError {}

/// Name → implementation registry, resolved once per configuration change.
pub struct UseCaseRegistry {
    strategies: HashMap<&'static str, Arc<dyn UseCase>>,
}

impl UseCaseRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn register(&mut self, strategy: Arc<dyn UseCase>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn UseCase>, UnknownStrategyError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownStrategyError {
                name: name.to_string(),
            })
    }
}

impl Default for UseCaseRegistry {
    /// Registry with both built-in domains.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Bitcoin));
        registry.register(Arc::new(BankTransactions));
        registry
    }
}

/// Bitcoin transaction traces; values are satoshis.
#[derive(Debug)]
pub struct Bitcoin;

const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

impl UseCase for Bitcoin {
    fn name(&self) -> &'static str {
        "Bitcoin"
    }

    fn value_scale(&self) -> f64 {
        SATOSHIS_PER_BTC
    }

    fn details_for(&self, element: GraphElement<'_>) -> String {
        match element {
            GraphElement::Node(GraphNode::Transaction { id, transaction, .. }) => format!(
                "Transaction {}\nAmount: {:.8} BTC\nDepth: {}",
                id,
                transaction.value / SATOSHIS_PER_BTC,
                transaction.depth
            ),
            GraphElement::Node(GraphNode::Account { id, account, .. }) => format!(
                "Address {}\nReceived: {:.8} BTC over {} transactions\nSent: {:.8} BTC over {} transactions",
                id,
                account.in_sum / SATOSHIS_PER_BTC,
                account.in_count,
                account.out_sum / SATOSHIS_PER_BTC,
                account.out_count
            ),
            GraphElement::Link(GraphLink::Transaction { source, target }) => {
                format!("Output of {} spent by {}", source, target)
            }
            GraphElement::Link(GraphLink::Account { source, target, transactions, .. }) => {
                let total: f64 = transactions.iter().map(|t| t.value).sum();
                format!(
                    "{} -> {}\n{} transactions, {:.8} BTC total",
                    source,
                    target,
                    transactions.len(),
                    total / SATOSHIS_PER_BTC
                )
            }
        }
    }

    fn report_signature(&self, report: &Report) -> String {
        let total: f64 = report.members.iter().map(|t| t.value).sum();
        format!(
            "{} transactions, {:.8} BTC moved",
            report.members.len(),
            total / SATOSHIS_PER_BTC
        )
    }
}

/// Bank transfer batches; values are cents.
#[derive(Debug)]
pub struct BankTransactions;

const CENTS_PER_UNIT: f64 = 100.0;

impl UseCase for BankTransactions {
    fn name(&self) -> &'static str {
        "BankTransactions"
    }

    fn value_scale(&self) -> f64 {
        CENTS_PER_UNIT
    }

    fn details_for(&self, element: GraphElement<'_>) -> String {
        match element {
            GraphElement::Node(GraphNode::Transaction { id, transaction, .. }) => {
                let mut details = format!(
                    "Transfer {}\nAmount: {:.2}",
                    id,
                    transaction.value / CENTS_PER_UNIT
                );
                if transaction.x_country {
                    details.push_str("\nCross-border transfer");
                }
                if transaction.cash {
                    details.push_str("\nCash settlement");
                }
                details
            }
            GraphElement::Node(GraphNode::Account { id, account, .. }) => format!(
                "Account {}\nInflow: {:.2} ({} transfers)\nOutflow: {:.2} ({} transfers)",
                id,
                account.in_sum / CENTS_PER_UNIT,
                account.in_count,
                account.out_sum / CENTS_PER_UNIT,
                account.out_count
            ),
            GraphElement::Link(GraphLink::Transaction { source, target }) => {
                format!("Transfer {} precedes {}", source, target)
            }
            GraphElement::Link(GraphLink::Account { source, target, x_country, transactions }) => {
                let total: f64 = transactions.iter().map(|t| t.value).sum();
                format!(
                    "{} -> {}{}\n{} transfers, {:.2} total",
                    source,
                    target,
                    if *x_country { " (cross-border)" } else { "" },
                    transactions.len(),
                    total / CENTS_PER_UNIT
                )
            }
        }
    }

    fn report_signature(&self, report: &Report) -> String {
        let cross_border = report.members.iter().filter(|t| t.x_country).count();
        let cash = report.members.iter().filter(|t| t.cash).count();
        format!(
            "{} transfers, {} cross-border, {} cash",
            report.members.len(),
            cross_border,
            cash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scalar, Transaction};

    fn make_report() -> Report {
        Report {
            id: Scalar::Int(1),
            start: Scalar::Int(0),
            end: Scalar::Int(1000),
            members: vec![
                Transaction {
                    id: "t1".to_string(),
                    value: 150_000_000.0,
                    src: "A".to_string(),
                    target: "B".to_string(),
                    successor: Vec::new(),
                    depth: 0,
                    x_country: true,
                    cash: false,
                },
                Transaction {
                    id: "t2".to_string(),
                    value: 50_000_000.0,
                    src: "B".to_string(),
                    target: "C".to_string(),
                    successor: Vec::new(),
                    depth: 1,
                    x_country: false,
                    cash: true,
                },
            ],
        }
    }

    #[test]
    fn test_registry_resolves_builtins() {
        let registry = UseCaseRegistry::default();
        assert_eq!(registry.resolve("Bitcoin").unwrap().name(), "Bitcoin");
        assert_eq!(
            registry.resolve("BankTransactions").unwrap().name(),
            "BankTransactions"
        );
    }

    #[test]
    fn test_registry_rejects_unknown_name() {
        let registry = UseCaseRegistry::default();
        let err = registry.resolve("Monopoly").unwrap_err();
        assert_eq!(err.name, "Monopoly");
    }

    #[test]
    fn test_value_scales_differ_per_domain() {
        assert_eq!(Bitcoin.value_scale(), 100_000_000.0);
        assert_eq!(BankTransactions.value_scale(), 100.0);
    }

    #[test]
    fn test_bitcoin_signature() {
        let signature = Bitcoin.report_signature(&make_report());
        assert_eq!(signature, "2 transactions, 2.00000000 BTC moved");
    }

    #[test]
    fn test_bank_signature_counts_flags() {
        let signature = BankTransactions.report_signature(&make_report());
        assert_eq!(signature, "2 transfers, 1 cross-border, 1 cash");
    }

    #[test]
    fn test_details_produced_for_every_element_kind() {
        let report = make_report();
        let transaction_graph =
            crate::graph_core::build_transaction_graph(&report, Bitcoin.value_scale()).unwrap();
        let account_graph = crate::graph_core::build_account_graph(&report);

        for strategy in [&Bitcoin as &dyn UseCase, &BankTransactions as &dyn UseCase] {
            for node in transaction_graph.nodes.iter().chain(&account_graph.nodes) {
                assert!(!strategy.details_for(GraphElement::Node(node)).is_empty());
            }
            for link in account_graph.links.iter() {
                assert!(!strategy.details_for(GraphElement::Link(link)).is_empty());
            }
        }
    }
}
