//! Hydration and flattening tests

use capmatrix::constants::ALL;
use capmatrix::{
    create_initial_flags, hydrate, set_flag, to_leaf_grants, CapabilityFlags, Flag, LeafGrant, MenuRecord, MenuTree,
    SavePayload,
};

const PID: u64 = 42;

fn abc() -> MenuTree {
    MenuTree::build(&[
        MenuRecord::new(1, None, "A"),
        MenuRecord::new(2, Some(1), "B"),
        MenuRecord::new(3, Some(1), "C"),
    ])
}

fn view_only() -> CapabilityFlags {
    CapabilityFlags { can_view: true, ..Default::default() }
}

// ============================================================================
// Flatten
// ============================================================================

/// B.can_view set directly: one grant for B and one for C, none for A
#[test]
fn flatten_emits_leaves_only() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    store.set_flag(tree.key_of(2).unwrap(), Flag::View, true);

    let grants = to_leaf_grants(&tree, &store, PID);
    assert_eq!(
        grants,
        vec![
            LeafGrant::new(PID, 2, Some(1), view_only()),
            LeafGrant::new(PID, 3, Some(1), CapabilityFlags::default()),
        ]
    );
}

#[test]
fn flatten_ignores_internal_values() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    store.set_flag(tree.key_of(1).unwrap(), Flag::Edit, true);
    let grants = to_leaf_grants(&tree, &store, PID);
    assert!(grants.iter().all(|g| !g.flags.can_edit));
    assert!(grants.iter().all(|g| g.menu_id != 1));
}

#[test]
fn flatten_follows_traversal_order() {
    let tree = MenuTree::build(&[
        MenuRecord::new(9, Some(1), "late child"),
        MenuRecord::new(1, None, "root"),
        MenuRecord::new(5, None, "lone leaf"),
        MenuRecord::new(2, Some(1), "child"),
    ]);
    let store = create_initial_flags(&tree, PID);
    let order: Vec<u64> = to_leaf_grants(&tree, &store, PID).iter().map(|g| g.menu_id).collect();
    assert_eq!(order, vec![9, 2, 5]);
}

#[test]
fn flatten_empty_tree() {
    let tree = MenuTree::build(&[]);
    let store = create_initial_flags(&tree, PID);
    assert!(to_leaf_grants(&tree, &store, PID).is_empty());
}

// ============================================================================
// Hydrate
// ============================================================================

/// Grant for B only: B set, C left false
#[test]
fn hydrate_partial_grants() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    let report = hydrate(&mut store, &[LeafGrant::new(PID, 2, Some(1), view_only())], &tree);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 0);
    assert!(store.flag(tree.key_of(2).unwrap(), Flag::View));
    assert!(!store.flag(tree.key_of(3).unwrap(), Flag::View));
}

#[test]
fn hydrate_skips_unknown_menu_and_continues() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    let grants = [
        LeafGrant::new(PID, 77, None, CapabilityFlags::from_mask(ALL)),
        LeafGrant::new(PID, 3, Some(1), CapabilityFlags::from_mask(ALL)),
    ];
    let report = hydrate(&mut store, &grants, &tree);
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.get(tree.key_of(3).unwrap()), Some(&CapabilityFlags::from_mask(ALL)));
}

/// All five fields are overwritten, including back to false
#[test]
fn hydrate_overwrites_whole_record() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    set_flag(&tree, &mut store, tree.key_of(2).unwrap(), Flag::Delete, true);
    hydrate(&mut store, &[LeafGrant::new(PID, 2, Some(1), view_only())], &tree);
    assert_eq!(store.get(tree.key_of(2).unwrap()), Some(&view_only()));
}

#[test]
fn flatten_then_hydrate_reproduces_leaves() {
    let tree = abc();
    let mut store = create_initial_flags(&tree, PID);
    set_flag(&tree, &mut store, tree.key_of(2).unwrap(), Flag::Create, true);
    set_flag(&tree, &mut store, tree.key_of(3).unwrap(), Flag::Upload, true);

    let mut fresh = create_initial_flags(&tree, PID);
    hydrate(&mut fresh, &to_leaf_grants(&tree, &store, PID), &tree);
    for leaf in tree.leaves() {
        assert_eq!(fresh.get(&leaf.key), store.get(&leaf.key));
    }
}

// ============================================================================
// Wire shape
// ============================================================================

#[test]
fn leaf_grant_json_shape() {
    let g = LeafGrant::new(PID, 2, Some(1), view_only());
    let v = serde_json::to_value(g).unwrap();
    assert_eq!(
        v,
        serde_json::json!({
            "permission_id": 42,
            "menu_id": 2,
            "parent_id": 1,
            "can_view": true,
            "can_create": false,
            "can_edit": false,
            "can_delete": false,
            "can_upload": false
        })
    );
    let back: LeafGrant = serde_json::from_value(v).unwrap();
    assert_eq!(back, g);
}

#[test]
fn save_payload_json_shape() {
    let payload = SavePayload { permission_id: PID, permissions: vec![LeafGrant::new(PID, 3, None, view_only())] };
    let v = serde_json::to_value(&payload).unwrap();
    assert_eq!(v["permission_id"], 42);
    assert_eq!(v["permissions"][0]["menu_id"], 3);
    assert!(v["permissions"][0]["parent_id"].is_null());
}
