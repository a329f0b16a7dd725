//! Integration tests for transaction graph construction.

mod common;

use common::{accounts_with_balances, addr, graph, transfers, ONE};
use txnet_analysis::{BuildOptions, DuplicatePolicy, EndpointPolicy, GraphError, TransactionGraph};
use txnet_data::{AccountRecord, TransferRecord};

/// Vertex count equals distinct addresses; edge count equals accepted transfers.
#[test]
fn counts_match_records() {
    let accounts = accounts_with_balances(&[1, 2, 3]);
    let transfers = transfers(&[(0, 1), (0, 1), (1, 2), (2, 2)]);

    let (graph, stats) =
        TransactionGraph::build(&accounts, &transfers, &BuildOptions::default()).unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(stats.accounts_read, 3);
    assert_eq!(stats.transfers_read, 4);
    assert_eq!(stats.self_transfers, 1);
    assert_eq!(stats.transfers_dropped, 0);
}

/// Parallel transfers stay separate edges and each counts toward degree.
#[test]
fn parallel_transfers_count_toward_degree() {
    let graph = graph(2, &[(0, 1), (0, 1), (0, 1), (1, 0)]);

    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.degree(&addr(0)).unwrap(), 4);
    assert_eq!(graph.degree(&addr(1)).unwrap(), 4);
    assert_eq!(graph.successors(&addr(0)).unwrap(), vec![addr(1).as_str()]);
}

/// Building twice from the same records gives the same vertices, edges and attributes.
#[test]
fn rebuild_is_isomorphic() {
    let accounts = accounts_with_balances(&[5, 0, 250, 1]);
    let transfers = transfers(&[(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)]);

    let first = TransactionGraph::from_records(&accounts, &transfers).unwrap();
    let second = TransactionGraph::from_records(&accounts, &transfers).unwrap();

    let first_nodes: Vec<_> = first.nodes().cloned().collect();
    let second_nodes: Vec<_> = second.nodes().cloned().collect();
    assert_eq!(first_nodes, second_nodes);

    let edge_keys = |g: &TransactionGraph| -> Vec<(String, String, u64, u128)> {
        g.edges()
            .map(|e| {
                (
                    e.source.to_string(),
                    e.target.to_string(),
                    e.transfer.sequence,
                    e.transfer.amount_atomic,
                )
            })
            .collect()
    };
    assert_eq!(edge_keys(&first), edge_keys(&second));
}

#[test]
fn balances_are_scaled_and_sized() {
    let accounts = vec![
        AccountRecord::new(addr(0), 1234 * ONE),
        AccountRecord::new(addr(1), ONE / 2),
        AccountRecord::new(addr(2), 0),
    ];
    let graph = TransactionGraph::from_records(&accounts, &[]).unwrap();

    let rich = graph.account(&addr(0)).unwrap();
    assert_eq!(rich.balance, 1234.0);
    assert_eq!(rich.display_size, 4);
    assert_eq!(graph.account(&addr(1)).unwrap().balance, 0.5);
    assert_eq!(graph.account(&addr(1)).unwrap().display_size, 1);
    assert_eq!(graph.account(&addr(2)).unwrap().display_size, 1);
}

#[test]
fn custom_unit_scale() {
    let accounts = vec![AccountRecord::new("a", 2_500_000)];
    let options = BuildOptions::default().with_unit_scale(1_000_000);
    let (graph, _) = TransactionGraph::build(&accounts, &[], &options).unwrap();
    assert_eq!(graph.account("a").unwrap().balance, 2.5);
}

#[test]
fn dangling_endpoint_is_rejected_by_default() {
    let accounts = accounts_with_balances(&[1]);
    let transfers = vec![TransferRecord::new(9, addr(0), "0xghost", ONE)];

    let err = TransactionGraph::from_records(&accounts, &transfers).unwrap_err();
    assert!(matches!(err, GraphError::MalformedRecord { .. }));
}

#[test]
fn dangling_endpoint_can_be_dropped() {
    let accounts = accounts_with_balances(&[1, 1]);
    let mut records = transfers(&[(0, 1)]);
    records.push(TransferRecord::new(1, "0xghost", addr(1), ONE));

    let options = BuildOptions::default().with_endpoint_policy(EndpointPolicy::Drop);
    let (graph, stats) = TransactionGraph::build(&accounts, &records, &options).unwrap();

    assert_eq!(graph.edge_count(), 1);
    assert_eq!(stats.transfers_dropped, 1);
    assert!(!graph.contains("0xghost"));
}

#[test]
fn dangling_endpoint_can_create_vertex() {
    let accounts = accounts_with_balances(&[1]);
    let records = vec![TransferRecord::new(0, addr(0), "0xghost", ONE)];

    let options = BuildOptions::default().with_endpoint_policy(EndpointPolicy::CreateVertex);
    let (graph, stats) = TransactionGraph::build(&accounts, &records, &options).unwrap();

    assert_eq!(graph.node_count(), 2);
    assert_eq!(stats.implicit_vertices, 1);
    let ghost = graph.account("0xghost").unwrap();
    assert!(ghost.implicit);
    assert_eq!(ghost.balance, 0.0);
}

#[test]
fn identical_duplicate_accounts_collapse() {
    let accounts = vec![AccountRecord::new("a", ONE), AccountRecord::new("a", ONE)];
    let (graph, stats) =
        TransactionGraph::build(&accounts, &[], &BuildOptions::default()).unwrap();
    assert_eq!(graph.node_count(), 1);
    assert_eq!(stats.duplicate_accounts, 1);
}

#[test]
fn conflicting_duplicate_accounts() {
    let accounts = vec![AccountRecord::new("a", ONE), AccountRecord::new("a", 3 * ONE)];

    assert!(matches!(
        TransactionGraph::from_records(&accounts, &[]),
        Err(GraphError::MalformedRecord { .. })
    ));

    let options = BuildOptions::default().with_duplicate_policy(DuplicatePolicy::LastWriteWins);
    let (graph, _) = TransactionGraph::build(&accounts, &[], &options).unwrap();
    assert_eq!(graph.account("a").unwrap().balance, 3.0);
}

#[test]
fn empty_address_is_malformed() {
    let accounts = vec![AccountRecord::new("", ONE)];
    assert!(matches!(
        TransactionGraph::from_records(&accounts, &[]),
        Err(GraphError::MalformedRecord { .. })
    ));
}

#[test]
fn unknown_address_queries_fail() {
    let graph = graph(1, &[]);
    assert_eq!(
        graph.degree("0xnobody"),
        Err(GraphError::UnknownAddress {
            address: "0xnobody".to_string()
        })
    );
    assert!(graph.successors("0xnobody").is_err());
}
