//! Cascade and select-all tests

use capmatrix::{
    aggregated_state, create_initial_flags, set_flag, set_flag_for_all_leaves, Flag, MenuRecord, MenuTree, NodeKey,
    TriState,
};

fn finance_tree() -> MenuTree {
    MenuTree::build(&[
        MenuRecord::new(1, None, "Finance"),
        MenuRecord::new(2, Some(1), "Invoices"),
        MenuRecord::new(3, Some(2), "Drafts"),
        MenuRecord::new(4, Some(2), "Sent"),
        MenuRecord::new(5, Some(1), "Payments"),
        MenuRecord::new(6, None, "Settings"),
        MenuRecord::new(7, Some(6), "Users"),
    ])
}

fn key(tree: &MenuTree, id: u64) -> &NodeKey {
    tree.key_of(id).unwrap()
}

/// Setting A selects B and C; A reads checked
#[test]
fn internal_write_selects_all_leaves() {
    let tree = MenuTree::build(&[
        MenuRecord::new(1, None, "A"),
        MenuRecord::new(2, Some(1), "B"),
        MenuRecord::new(3, Some(1), "C"),
    ]);
    let mut store = create_initial_flags(&tree, 1);
    assert!(set_flag(&tree, &mut store, key(&tree, 1), Flag::View, true));
    assert!(store.flag(key(&tree, 2), Flag::View));
    assert!(store.flag(key(&tree, 3), Flag::View));
    assert_eq!(
        aggregated_state(&tree, &store, key(&tree, 1), Flag::View),
        TriState { checked: true, indeterminate: false }
    );
}

#[test]
fn cascade_reaches_deep_leaves_only_in_subtree() {
    let tree = finance_tree();
    let mut store = create_initial_flags(&tree, 1);
    set_flag(&tree, &mut store, key(&tree, 1), Flag::Edit, true);
    for id in [3, 4, 5] {
        assert!(store.flag(key(&tree, id), Flag::Edit), "leaf {id}");
    }
    assert!(!store.flag(key(&tree, 7), Flag::Edit));
    assert!(!store.flag(key(&tree, 3), Flag::View));
}

/// Deselect overwrites, it does not toggle
#[test]
fn internal_deselect_clears_mixed_subtree() {
    let tree = finance_tree();
    let mut store = create_initial_flags(&tree, 1);
    set_flag(&tree, &mut store, key(&tree, 3), Flag::Delete, true);
    assert_eq!(aggregated_state(&tree, &store, key(&tree, 2), Flag::Delete), TriState::INDETERMINATE);
    set_flag(&tree, &mut store, key(&tree, 2), Flag::Delete, false);
    assert!(!store.flag(key(&tree, 3), Flag::Delete));
    assert!(!store.flag(key(&tree, 4), Flag::Delete));
    assert_eq!(aggregated_state(&tree, &store, key(&tree, 2), Flag::Delete), TriState::UNCHECKED);
}

#[test]
fn leaf_write_touches_one_entry() {
    let tree = finance_tree();
    let mut store = create_initial_flags(&tree, 1);
    let before = store.clone();
    set_flag(&tree, &mut store, key(&tree, 4), Flag::Upload, true);
    for n in tree.nodes() {
        let expected = n.id == 4;
        assert_eq!(store.flag(&n.key, Flag::Upload), expected, "node {}", n.id);
        if n.id != 4 {
            assert_eq!(store.get(&n.key), before.get(&n.key));
        }
    }
}

#[test]
fn repeated_write_is_idempotent() {
    let tree = finance_tree();
    let mut once = create_initial_flags(&tree, 1);
    set_flag(&tree, &mut once, key(&tree, 2), Flag::Create, true);
    let mut twice = once.clone();
    set_flag(&tree, &mut twice, key(&tree, 2), Flag::Create, true);
    assert_eq!(once, twice);
}

#[test]
fn unknown_key_writes_nothing() {
    let tree = finance_tree();
    let mut store = create_initial_flags(&tree, 1);
    let before = store.clone();
    assert!(!set_flag(&tree, &mut store, &NodeKey::from("42"), Flag::View, true));
    assert_eq!(store, before);
}

// ============================================================================
// Column select-all
// ============================================================================

#[test]
fn select_all_matches_cascading_every_root() {
    let tree = finance_tree();
    let mut fast = create_initial_flags(&tree, 1);
    set_flag_for_all_leaves(&tree, &mut fast, Flag::View, true);

    let mut slow = create_initial_flags(&tree, 1);
    for root in tree.roots() {
        set_flag(&tree, &mut slow, root, Flag::View, true);
    }
    assert_eq!(fast, slow);
    for leaf in tree.leaves() {
        assert!(fast.flag(&leaf.key, Flag::View));
    }
}

#[test]
fn clear_all_in_column() {
    let tree = finance_tree();
    let mut store = create_initial_flags(&tree, 1);
    set_flag_for_all_leaves(&tree, &mut store, Flag::Edit, true);
    set_flag_for_all_leaves(&tree, &mut store, Flag::Edit, false);
    for n in tree.nodes() {
        assert_eq!(aggregated_state(&tree, &store, &n.key, Flag::Edit), TriState::UNCHECKED);
    }
}
