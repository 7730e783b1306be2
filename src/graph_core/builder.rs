//! Pure report-to-graph transformations.

use {
    super::types::{AccountTotals, Graph, GraphLink, GraphNode},
    crate::model::Report,
    std::collections::{HashMap, HashSet},
};

#[derive(Debug, PartialEq)]
pub enum GraphBuildError {
    /// A successor id referenced a transaction that is not part of the
    /// same report. The build fails whole; no partial edge is emitted.
    DanglingReference { transaction: String, successor: String },
}

impl std::fmt::Display for GraphBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphBuildError::DanglingReference { transaction, successor } => write!(
                f,
                "Transaction {} names successor {} which is not in the report",
                transaction, successor
            ),
        }
    }
}

impl std::error::Error for GraphBuildError {}

/// Build the transaction-dependency graph for one report.
///
/// One node per member; `display_value = 1 + value / value_scale`, with the
/// scale supplied by the active domain strategy (the reference domain uses
/// satoshi fixed-point, 1e8). One link per successor entry; a report may
/// legitimately contain parallel edges between the same pair, so edges are
/// not deduplicated.
///
/// A successor id that is absent from the report fails the entire build
/// with [`GraphBuildError::DanglingReference`].
pub fn build_transaction_graph(report: &Report, value_scale: f64) -> Result<Graph, GraphBuildError> {
    let mut graph = Graph::default();

    // Index on transaction id, for successor resolution
    let mut known_ids: HashSet<&str> = HashSet::with_capacity(report.members.len());

    for transaction in &report.members {
        known_ids.insert(transaction.id.as_str());
        graph.nodes.push(GraphNode::Transaction {
            id: transaction.id.clone(),
            depth: transaction.depth,
            transaction: transaction.clone(),
            display_value: 1.0 + transaction.value / value_scale,
        });
    }

    for transaction in &report.members {
        for successor in &transaction.successor {
            if !known_ids.contains(successor.as_str()) {
                return Err(GraphBuildError::DanglingReference {
                    transaction: transaction.id.clone(),
                    successor: successor.clone(),
                });
            }
            graph.links.push(GraphLink::Transaction {
                source: transaction.id.clone(),
                target: successor.clone(),
            });
        }
    }

    Ok(graph)
}

/// Build the account-relationship graph for one report.
///
/// Nodes are lazily created per distinct account identifier (src or target)
/// with `display_value = 10`; each transaction adds `value` to the source's
/// outflow and the target's inflow. Links collapse to one per ordered
/// (src, target) pair: the pair's `x_country` flag is frozen from the first
/// transaction observed for it, and every transaction for the pair is
/// appended to the link's list either way.
///
/// Node and link order equals first-occurrence order in the member list.
pub fn build_account_graph(report: &Report) -> Graph {
    let mut graph = Graph::default();

    // Index on account id -> position in graph.nodes
    let mut accounts: HashMap<String, usize> = HashMap::new();
    // Index on ordered (src, target) -> position in graph.links
    let mut pairs: HashMap<(String, String), usize> = HashMap::new();

    fn account_index(graph: &mut Graph, accounts: &mut HashMap<String, usize>, id: &str) -> usize {
        *accounts.entry(id.to_string()).or_insert_with(|| {
            graph.nodes.push(GraphNode::Account {
                id: id.to_string(),
                account: AccountTotals::zeroed(),
                display_value: 10.0,
            });
            graph.nodes.len() - 1
        })
    }

    for transaction in &report.members {
        let src_index = account_index(&mut graph, &mut accounts, &transaction.src);
        if let GraphNode::Account { account, .. } = &mut graph.nodes[src_index] {
            account.out_sum += transaction.value;
            account.out_count += 1;
        }

        let target_index = account_index(&mut graph, &mut accounts, &transaction.target);
        if let GraphNode::Account { account, .. } = &mut graph.nodes[target_index] {
            account.in_sum += transaction.value;
            account.in_count += 1;
        }

        let pair = (transaction.src.clone(), transaction.target.clone());
        let link_index = *pairs.entry(pair).or_insert_with(|| {
            graph.links.push(GraphLink::Account {
                source: transaction.src.clone(),
                target: transaction.target.clone(),
                x_country: transaction.x_country,
                transactions: Vec::new(),
            });
            graph.links.len() - 1
        });
        if let GraphLink::Account { transactions, .. } = &mut graph.links[link_index] {
            transactions.push(transaction.clone());
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scalar, Transaction};

    fn make_tx(id: &str, value: f64) -> Transaction {
        Transaction {
            id: id.to_string(),
            value,
            src: String::new(),
            target: String::new(),
            successor: Vec::new(),
            depth: 0,
            x_country: false,
            cash: false,
        }
    }

    fn make_transfer(id: &str, src: &str, target: &str, value: f64, x_country: bool) -> Transaction {
        Transaction {
            src: src.to_string(),
            target: target.to_string(),
            x_country,
            ..make_tx(id, value)
        }
    }

    fn make_report(members: Vec<Transaction>) -> Report {
        Report {
            id: Scalar::Int(1),
            start: Scalar::Int(0),
            end: Scalar::Int(86_400_000),
            members,
        }
    }

    const SATOSHI_SCALE: f64 = 100_000_000.0;

    fn account_totals<'a>(graph: &'a Graph, id: &str) -> &'a AccountTotals {
        match graph.node(id) {
            Some(GraphNode::Account { account, .. }) => account,
            other => panic!("expected account node {}, got {:?}", id, other),
        }
    }

    #[test]
    fn test_transaction_graph_nodes_and_display_scaling() {
        // Two members: 1 BTC and 50 BTC in satoshis
        let mut t1 = make_tx("t1", 100_000_000.0);
        t1.successor = vec!["t2".to_string()];
        let mut t2 = make_tx("t2", 5_000_000_000.0);
        t2.depth = 1;

        let report = make_report(vec![t1, t2]);
        let graph = build_transaction_graph(&report, SATOSHI_SCALE).unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("t1").unwrap().display_value(), 2.0);
        assert_eq!(graph.node("t2").unwrap().display_value(), 51.0);

        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].source(), "t1");
        assert_eq!(graph.links[0].target(), "t2");
    }

    #[test]
    fn test_transaction_graph_keeps_parallel_edges() {
        let mut t1 = make_tx("t1", 0.0);
        t1.successor = vec!["t2".to_string(), "t2".to_string()];
        let t2 = make_tx("t2", 0.0);

        let graph = build_transaction_graph(&make_report(vec![t1, t2]), SATOSHI_SCALE).unwrap();

        // Edge count is the sum of successor-list lengths, not deduplicated
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_transaction_graph_rejects_dangling_successor() {
        let mut t1 = make_tx("t1", 0.0);
        t1.successor = vec!["missing".to_string()];

        let err = build_transaction_graph(&make_report(vec![t1]), SATOSHI_SCALE).unwrap_err();
        assert_eq!(
            err,
            GraphBuildError::DanglingReference {
                transaction: "t1".to_string(),
                successor: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_transaction_graph_forward_successor_reference() {
        // Successor declared before the target appears in the member list
        let mut t1 = make_tx("t1", 0.0);
        t1.successor = vec!["t3".to_string()];
        let t3 = make_tx("t3", 0.0);

        let graph = build_transaction_graph(&make_report(vec![t1, t3]), SATOSHI_SCALE).unwrap();
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].target(), "t3");
    }

    #[test]
    fn test_account_graph_aggregates_flow() {
        // Scenario: A pays B 100, B pays C 50 cross-border
        let report = make_report(vec![
            make_transfer("t1", "A", "B", 100.0, false),
            make_transfer("t2", "B", "C", 50.0, true),
        ]);
        let graph = build_account_graph(&report);

        assert_eq!(graph.nodes.len(), 3);

        let a = account_totals(&graph, "A");
        assert_eq!((a.out_sum, a.out_count, a.in_sum, a.in_count), (100.0, 1, 0.0, 0));

        let b = account_totals(&graph, "B");
        assert_eq!((b.in_sum, b.in_count, b.out_sum, b.out_count), (100.0, 1, 50.0, 1));

        let c = account_totals(&graph, "C");
        assert_eq!((c.in_sum, c.in_count, c.out_sum, c.out_count), (50.0, 1, 0.0, 0));

        assert_eq!(graph.links.len(), 2);
        match &graph.links[0] {
            GraphLink::Account { source, target, x_country, transactions } => {
                assert_eq!((source.as_str(), target.as_str()), ("A", "B"));
                assert!(!*x_country);
                assert_eq!(transactions.len(), 1);
                assert_eq!(transactions[0].id, "t1");
            }
            other => panic!("expected account link, got {:?}", other),
        }
        match &graph.links[1] {
            GraphLink::Account { source, target, x_country, transactions } => {
                assert_eq!((source.as_str(), target.as_str()), ("B", "C"));
                assert!(*x_country);
                assert_eq!(transactions[0].id, "t2");
            }
            other => panic!("expected account link, got {:?}", other),
        }
    }

    #[test]
    fn test_account_graph_collapses_pair_and_freezes_flag() {
        let report = make_report(vec![
            make_transfer("t1", "A", "B", 10.0, false),
            make_transfer("t2", "A", "B", 20.0, true), // same pair, later flag ignored
            make_transfer("t3", "B", "A", 5.0, true),  // reverse direction is its own pair
        ]);
        let graph = build_account_graph(&report);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.links.len(), 2);

        match &graph.links[0] {
            GraphLink::Account { x_country, transactions, .. } => {
                assert!(!*x_country, "flag comes from the first transaction of the pair");
                assert_eq!(transactions.len(), 2);
            }
            other => panic!("expected account link, got {:?}", other),
        }

        let a = account_totals(&graph, "A");
        assert_eq!((a.out_sum, a.out_count, a.in_sum, a.in_count), (30.0, 2, 5.0, 1));
    }

    #[test]
    fn test_account_graph_first_occurrence_order() {
        let report = make_report(vec![
            make_transfer("t1", "C", "A", 1.0, false),
            make_transfer("t2", "B", "A", 1.0, false),
            make_transfer("t3", "A", "C", 1.0, false),
        ]);
        let graph = build_account_graph(&report);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);

        let pairs: Vec<(&str, &str)> = graph.links.iter().map(|l| (l.source(), l.target())).collect();
        assert_eq!(pairs, vec![("C", "A"), ("B", "A"), ("A", "C")]);
    }

    #[test]
    fn test_builds_are_idempotent() {
        let mut t1 = make_transfer("t1", "A", "B", 100_000_000.0, true);
        t1.successor = vec!["t2".to_string()];
        let t2 = make_transfer("t2", "B", "C", 50.0, false);
        let report = make_report(vec![t1, t2]);

        assert_eq!(
            build_transaction_graph(&report, SATOSHI_SCALE).unwrap(),
            build_transaction_graph(&report, SATOSHI_SCALE).unwrap()
        );
        assert_eq!(build_account_graph(&report), build_account_graph(&report));
    }

    #[test]
    fn test_empty_report_builds_empty_graphs() {
        let report = make_report(Vec::new());
        let graph = build_transaction_graph(&report, SATOSHI_SCALE).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
        assert_eq!(build_account_graph(&report), Graph::default());
    }
}
