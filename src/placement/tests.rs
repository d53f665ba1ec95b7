//! Placement Module Tests
//!
//! ## Test Scopes
//! - **Target selection**: scarcity failures, distinctness, spread over time.
//! - **Replication decision**: complete / partial / failed verdicts without any network.

#[cfg(test)]
mod tests {
    use crate::error::StorageError;
    use crate::health::{HealthMonitor, NodeId, NodeInfo};
    use crate::placement::{
        NodeOutcome, PlacementCoordinator, ReplicationDecision, choose_targets, decide,
    };
    use crate::testing::table_probe;
    use dashmap::DashMap;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    fn nodes(count: usize) -> Vec<NodeInfo> {
        (1..=count)
            .map(|i| NodeInfo::new(format!("node{}", i), format!("http://localhost:{}", 5000 + i)))
            .collect()
    }

    async fn coordinator(healthy: &[&str], total: usize, rf: usize) -> PlacementCoordinator {
        let table = Arc::new(DashMap::new());
        for id in healthy {
            table.insert(NodeId::from(*id), true);
        }
        let monitor = HealthMonitor::with_probe(
            nodes(total),
            Duration::from_secs(30),
            Duration::from_secs(1),
            table_probe(table),
        );
        monitor.check_all_nodes().await;
        PlacementCoordinator::new(monitor, rf)
    }

    // ============================================================
    // TARGET SELECTION
    // ============================================================

    #[test]
    fn test_choose_fails_when_too_few_healthy() {
        let healthy = nodes(1);
        let mut rng = StdRng::seed_from_u64(1);

        let result = choose_targets(&healthy, 2, &mut rng);

        assert!(matches!(
            result,
            Err(StorageError::InsufficientHealthyNodes {
                required: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_choose_rejects_zero_replicas() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(choose_targets(&nodes(3), 0, &mut rng).is_err());
    }

    #[test]
    fn test_choose_returns_exactly_r_distinct_nodes_across_seeds() {
        let healthy = nodes(5);

        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for replicas in 1..=5 {
                let targets = choose_targets(&healthy, replicas, &mut rng).unwrap();
                let distinct: HashSet<_> = targets.iter().map(|n| n.node_id.clone()).collect();

                assert_eq!(targets.len(), replicas);
                assert_eq!(distinct.len(), replicas, "seed {} produced duplicates", seed);
                assert!(targets.iter().all(|t| healthy.contains(t)));
            }
        }
    }

    #[test]
    fn test_choose_spreads_load_over_time() {
        let healthy = nodes(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits: HashMap<NodeId, usize> = HashMap::new();

        for _ in 0..2000 {
            for node in choose_targets(&healthy, 2, &mut rng).unwrap() {
                *hits.entry(node.node_id).or_insert(0) += 1;
            }
        }

        // 4000 picks over 4 nodes, ~1000 each.
        assert_eq!(hits.len(), 4);
        for (node, count) in hits {
            assert!((800..1200).contains(&count), "{} picked {} times", node, count);
        }
    }

    #[tokio::test]
    async fn test_coordinator_only_selects_healthy_nodes() {
        let coordinator = coordinator(&["node1", "node3"], 3, 2).await;

        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let targets = coordinator.select_targets_with_rng(2, &mut rng).unwrap();
            let ids: HashSet<String> = targets.into_iter().map(|n| n.node_id.0).collect();
            assert_eq!(ids, HashSet::from(["node1".to_string(), "node3".to_string()]));
        }
    }

    #[tokio::test]
    async fn test_coordinator_fails_before_first_probe_cycle() {
        let monitor = HealthMonitor::with_probe(
            nodes(3),
            Duration::from_secs(30),
            Duration::from_secs(1),
            table_probe(Arc::new(DashMap::new())),
        );
        let coordinator = PlacementCoordinator::new(monitor, 2);

        let result = coordinator.select_targets(coordinator.replication_factor());
        assert!(matches!(
            result,
            Err(StorageError::InsufficientHealthyNodes {
                required: 2,
                available: 0
            })
        ));
    }

    // ============================================================
    // REPLICATION DECISION
    // ============================================================

    #[test]
    fn test_all_replicas_stored_is_complete() {
        let outcomes = vec![
            NodeOutcome::success(NodeId::from("node1")),
            NodeOutcome::success(NodeId::from("node2")),
        ];

        let decision = decide(&outcomes, 2);

        assert!(matches!(decision, ReplicationDecision::Complete { .. }));
        assert_eq!(decision.achieved(), 2);
        assert!(decision.is_stored());
    }

    #[test]
    fn test_one_of_two_is_partial_and_still_stored() {
        let outcomes = vec![
            NodeOutcome::failure(NodeId::from("node1"), "timeout"),
            NodeOutcome::success(NodeId::from("node2")),
        ];

        let decision = decide(&outcomes, 2);

        assert_eq!(
            decision,
            ReplicationDecision::Partial {
                nodes: vec![NodeId::from("node2")],
                requested: 2
            }
        );
        assert!(decision.is_stored());
        assert_eq!(decision.stored_on(), &[NodeId::from("node2")]);
    }

    #[test]
    fn test_zero_of_two_is_failed_and_not_stored() {
        let outcomes = vec![
            NodeOutcome::failure(NodeId::from("node1"), "500"),
            NodeOutcome::failure(NodeId::from("node2"), "connection refused"),
        ];

        let decision = decide(&outcomes, 2);

        assert_eq!(decision, ReplicationDecision::Failed { requested: 2 });
        assert!(!decision.is_stored());
        assert!(decision.stored_on().is_empty());
    }

    #[test]
    fn test_no_outcomes_is_failed() {
        assert_eq!(decide(&[], 1), ReplicationDecision::Failed { requested: 1 });
    }

    #[test]
    fn test_duplicate_successes_count_once() {
        let outcomes = vec![
            NodeOutcome::success(NodeId::from("node1")),
            NodeOutcome::success(NodeId::from("node1")),
        ];

        let decision = decide(&outcomes, 2);
        assert_eq!(decision.achieved(), 1);
        assert!(matches!(decision, ReplicationDecision::Partial { .. }));
    }
}
