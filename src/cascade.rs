//! Cascading writes

use tracing::trace;

use crate::caps::Flag;
use crate::store::FlagStore;
use crate::tree::{MenuTree, NodeKey};

/// Write `value` to `key`, and to every transitive leaf descendant if `key` is internal.
///
/// Full select/deselect semantics: descendants are overwritten, not toggled.
/// Returns false (and writes nothing) for a key the store does not hold.
pub fn set_flag(tree: &MenuTree, store: &mut FlagStore, key: &NodeKey, flag: Flag, value: bool) -> bool {
    if !store.set_flag(key, flag, value) {
        return false;
    }
    if !tree.is_leaf(key) {
        let leaves = tree.leaf_descendants(key);
        trace!(key = %key, %flag, value, leaves = leaves.len(), "cascading flag");
        for leaf in leaves {
            store.set_flag(leaf, flag, value);
        }
    }
    true
}

/// Column select-all. Same result as `set_flag` on every root, in one pass over the
/// node list instead of one subtree walk per root.
pub fn set_flag_for_all_leaves(tree: &MenuTree, store: &mut FlagStore, flag: Flag, value: bool) {
    for node in tree.nodes() {
        if node.parent.is_none() || tree.is_leaf(&node.key) {
            store.set_flag(&node.key, flag, value);
        }
    }
}
