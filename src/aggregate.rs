//! Tri-state aggregation
//!
//! Internal nodes are never read from the store as a source of truth: their state is
//! re-derived from the transitive leaf descendants on every read.

use serde::Serialize;

use crate::caps::Flag;
use crate::store::FlagStore;
use crate::tree::{MenuId, MenuTree, NodeKey};

/// Checkbox state of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TriState {
    pub checked: bool,
    pub indeterminate: bool,
}

impl TriState {
    pub const CHECKED: TriState = TriState { checked: true, indeterminate: false };
    pub const UNCHECKED: TriState = TriState { checked: false, indeterminate: false };
    pub const INDETERMINATE: TriState = TriState { checked: false, indeterminate: true };

    fn leaf(value: bool) -> Self {
        if value { Self::CHECKED } else { Self::UNCHECKED }
    }

    /// Fold a sequence of leaf values; `None` if the sequence is empty
    fn fold<I: IntoIterator<Item = bool>>(values: I) -> Option<Self> {
        let (mut any_true, mut any_false) = (false, false);
        for v in values {
            if v { any_true = true } else { any_false = true }
            if any_true && any_false {
                return Some(Self::INDETERMINATE);
            }
        }
        match (any_true, any_false) {
            (false, false) => None,
            (true, _) => Some(Self::CHECKED),
            (false, true) => Some(Self::UNCHECKED),
        }
    }
}

/// Aggregated state of `key` for `flag`.
///
/// Leaf: its stored value. Internal: all leaves true => checked, all false => unchecked,
/// mixed => indeterminate; an internal node without any leaf falls back to its own value.
/// Unknown keys are unchecked.
pub fn aggregated_state(tree: &MenuTree, store: &FlagStore, key: &NodeKey, flag: Flag) -> TriState {
    if tree.is_leaf(key) {
        return TriState::leaf(store.flag(key, flag));
    }
    let leaves = tree.leaf_descendants(key);
    TriState::fold(leaves.into_iter().map(|k| store.flag(k, flag)))
        .unwrap_or_else(|| TriState::leaf(store.flag(key, flag)))
}

/// Header state of a whole column: aggregation over every leaf of the forest
pub fn column_state(tree: &MenuTree, store: &FlagStore, flag: Flag) -> TriState {
    TriState::fold(tree.leaves().map(|n| store.flag(&n.key, flag))).unwrap_or_default()
}

/// One rendered row of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub key: NodeKey,
    pub id: MenuId,
    pub title: String,
    pub level: usize,
    pub leaf: bool,
    /// One cell per flag, in column order
    pub cells: Vec<(Flag, TriState)>,
}

/// Every node of `tree` with its per-flag state, in traversal order
pub fn matrix_rows(tree: &MenuTree, store: &FlagStore) -> Vec<MatrixRow> {
    tree.nodes()
        .iter()
        .map(|n| MatrixRow {
            key: n.key.clone(),
            id: n.id,
            title: n.title.clone(),
            level: n.level,
            leaf: tree.is_leaf(&n.key),
            cells: Flag::ALL
                .into_iter()
                .map(|f| (f, aggregated_state(tree, store, &n.key, f)))
                .collect(),
        })
        .collect()
}
