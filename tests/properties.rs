//! Property tests over generated menu forests

use capmatrix::{
    aggregated_state, create_initial_flags, hydrate, set_flag, to_leaf_grants, Flag, FlagStore, MenuRecord, MenuTree,
    TriState,
};
use proptest::prelude::*;

/// Records 1..=n where each parent is an earlier id (or none), so the input is a proper forest
fn forest() -> impl Strategy<Value = Vec<MenuRecord>> {
    prop::collection::vec(any::<prop::sample::Index>(), 1..40).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, pick)| {
                let id = i as u64 + 1;
                // Roughly one in four records is a root
                let slot = pick.index(i * 4 + 4);
                let parent = if slot < i { Some(slot as u64 + 1) } else { None };
                MenuRecord::new(id, parent, format!("menu {id}"))
            })
            .collect()
    })
}

fn flag() -> impl Strategy<Value = Flag> {
    prop::sample::select(Flag::ALL.to_vec())
}

/// Random leaf-level writes on top of a fresh store
fn scramble(tree: &MenuTree, bits: &[bool], f: Flag) -> FlagStore {
    let mut store = create_initial_flags(tree, 1);
    for (leaf, &b) in tree.leaves().zip(bits.iter().cycle()) {
        store.set_flag(&leaf.key, f, b);
    }
    store
}

proptest! {
    #[test]
    fn root_checked_iff_all_leaves_true(records in forest(), bits in prop::collection::vec(any::<bool>(), 1..16), f in flag()) {
        let tree = MenuTree::build(&records);
        let store = scramble(&tree, &bits, f);
        for root in tree.roots() {
            let leaves = tree.leaf_descendants(root);
            if leaves.is_empty() {
                continue;
            }
            let all = leaves.iter().all(|k| store.flag(k, f));
            let any = leaves.iter().any(|k| store.flag(k, f));
            let state = aggregated_state(&tree, &store, root, f);
            prop_assert_eq!(state.checked, all);
            prop_assert_eq!(state.indeterminate, any && !all);
        }
    }

    #[test]
    fn cascade_true_checks_whole_subtree(records in forest(), bits in prop::collection::vec(any::<bool>(), 1..16), f in flag(), pick in any::<prop::sample::Index>()) {
        let tree = MenuTree::build(&records);
        let mut store = scramble(&tree, &bits, f);
        let node = tree.nodes()[pick.index(tree.len())].key.clone();
        set_flag(&tree, &mut store, &node, f, true);
        for leaf in tree.leaf_descendants(&node) {
            prop_assert!(store.flag(leaf, f));
        }
        prop_assert_eq!(aggregated_state(&tree, &store, &node, f), TriState::CHECKED);
    }

    #[test]
    fn set_flag_twice_equals_once(records in forest(), f in flag(), value in any::<bool>(), pick in any::<prop::sample::Index>()) {
        let tree = MenuTree::build(&records);
        let node = tree.nodes()[pick.index(tree.len())].key.clone();
        let mut once = create_initial_flags(&tree, 1);
        set_flag(&tree, &mut once, &node, f, value);
        let mut twice = once.clone();
        set_flag(&tree, &mut twice, &node, f, value);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn hydrate_of_flatten_restores_leaves(records in forest(), bits in prop::collection::vec(any::<bool>(), 1..16), f in flag()) {
        let tree = MenuTree::build(&records);
        let store = scramble(&tree, &bits, f);
        let mut fresh = create_initial_flags(&tree, 1);
        let report = hydrate(&mut fresh, &to_leaf_grants(&tree, &store, 1), &tree);
        prop_assert_eq!(report.skipped, 0);
        for leaf in tree.leaves() {
            prop_assert_eq!(fresh.get(&leaf.key), store.get(&leaf.key));
        }
    }
}
