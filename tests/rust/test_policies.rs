/// Integration tests for the GC placement policies: the selector registry
/// and the delay tables each schedule produces.
use aggsim_policies::{available_policies, policy_by_code, DelayPolicy};

/// Delay table of a policy over all levels of an `levels`-deep tree.
fn table(policy: &dyn DelayPolicy, levels: u32) -> Vec<Option<i64>> {
    (0..levels).map(|l| policy.delay_at(l, levels)).collect()
}

#[test]
fn test_registry_is_complete() {
    for (code, name) in available_policies() {
        let policy = policy_by_code(code, 100, 10).unwrap_or_else(|| panic!("missing {}", code));
        assert_eq!(policy.name(), name);
    }
    assert!(policy_by_code(7, 100, 10).is_none());
}

#[test]
fn test_passthrough_disables_gc_everywhere() {
    let policy = policy_by_code(0, 100, 10).unwrap();
    assert_eq!(table(policy.as_ref(), 5), vec![None; 5]);
}

#[test]
fn test_flat_all_delay_table() {
    let policy = policy_by_code(1, 100, 10).unwrap();
    assert_eq!(table(policy.as_ref(), 4), vec![Some(25); 4]);
}

#[test]
fn test_root_heavy_delay_table() {
    // Budget 100 over 4 levels with weights 4:3:2:1.
    let policy = policy_by_code(2, 100, 10).unwrap();
    assert_eq!(
        table(policy.as_ref(), 4),
        vec![Some(40), Some(30), Some(20), Some(10)]
    );
}

#[test]
fn test_leaf_heavy_delay_table() {
    let policy = policy_by_code(3, 100, 10).unwrap();
    assert_eq!(
        table(policy.as_ref(), 4),
        vec![Some(10), Some(20), Some(30), Some(40)]
    );
}

#[test]
fn test_top_k_policies_limit_scope() {
    for code in [4, 5, 6] {
        let policy = policy_by_code(code, 100, 2).unwrap();
        let t = table(policy.as_ref(), 5);
        assert!(t[0].is_some() && t[1].is_some(), "policy {}", code);
        assert_eq!(&t[2..], &[None, None, None], "policy {}", code);
    }
}

#[test]
fn test_top_k_delay_tables() {
    let flat = policy_by_code(4, 100, 2).unwrap();
    assert_eq!(table(flat.as_ref(), 5)[..2], [Some(50), Some(50)]);

    let root_heavy = policy_by_code(5, 100, 2).unwrap();
    assert_eq!(table(root_heavy.as_ref(), 5)[..2], [Some(67), Some(33)]);

    let leaf_heavy = policy_by_code(6, 100, 2).unwrap();
    assert_eq!(table(leaf_heavy.as_ref(), 5)[..2], [Some(33), Some(67)]);
}

#[test]
fn test_top_k_clamps_to_tree_depth() {
    // With k larger than the tree, the top-k schedules match the all-hub
    // ones.
    for (top_code, all_code) in [(4, 1), (5, 2), (6, 3)] {
        let top = policy_by_code(top_code, 100, 10).unwrap();
        let all = policy_by_code(all_code, 100, 10).unwrap();
        assert_eq!(
            table(top.as_ref(), 3),
            table(all.as_ref(), 3),
            "codes {} vs {}",
            top_code,
            all_code
        );
    }
}

#[test]
fn test_sloped_schedules_spend_the_whole_budget() {
    // The triangular weights sum to the budget exactly when it divides
    // evenly, and within rounding slack otherwise.
    for code in [2, 3] {
        for levels in 1..=8u32 {
            let policy = policy_by_code(code, 1000, 10).unwrap();
            let total: i64 = table(policy.as_ref(), levels)
                .into_iter()
                .map(|d| d.unwrap())
                .sum();
            let slack = levels as i64; // at most half a tick per level
            assert!(
                (total - 1000).abs() <= slack,
                "policy {} levels {} spent {}",
                code,
                levels,
                total
            );
        }
    }
}

#[test]
fn test_delays_are_never_negative() {
    for (code, _) in available_policies() {
        let policy = policy_by_code(code, 100, 3).unwrap();
        for levels in 0..6 {
            for level in 0..levels {
                if let Some(delay) = policy.delay_at(level, levels) {
                    assert!(delay >= 0, "policy {} level {}/{}", code, level, levels);
                }
            }
        }
    }
}
