//! Menu tree: flat menu records turned into a keyed forest
//!
//! Keys are path keys built from sibling positions (`"0"`, `"0-1"`, `"0-1-0"`), so the same
//! input always yields the same keys. Construction never fails:
//! - a `parent_id` that resolves nowhere (or to the record itself) makes the record a root
//! - duplicate ids keep the first occurrence
//! - in a parent cycle that no root reaches, the first member in input order is promoted
//!   to a root
//!
//! Roots keep input order; a promoted root sits where the first record hanging off its
//! cycle appears.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// External menu identifier
pub type MenuId = u64;

/// A flat menu record as delivered by the menu configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: MenuId,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    pub title: String,
}

impl MenuRecord {
    pub fn new(id: MenuId, parent_id: Option<MenuId>, title: impl Into<String>) -> Self {
        Self { id, parent_id, title: title.into() }
    }
}

/// Stable key of a node inside one built forest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    fn root(index: usize) -> Self {
        NodeKey(index.to_string())
    }

    fn child(&self, index: usize) -> Self {
        NodeKey(format!("{}-{}", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        NodeKey(s.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        NodeKey(s)
    }
}

/// One node of the forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub key: NodeKey,
    pub id: MenuId,
    /// Parent id as given by the record, even if it did not resolve
    pub parent_id: Option<MenuId>,
    /// Parent key inside the forest; `None` for roots
    pub parent: Option<NodeKey>,
    pub title: String,
    /// Depth, roots at 0
    pub level: usize,
}

/// The built forest plus its lookups
#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    nodes: Vec<MenuNode>,
    nodes_by_key: HashMap<NodeKey, usize>,
    key_by_external_id: HashMap<MenuId, NodeKey>,
    children_by_parent_key: HashMap<NodeKey, Vec<NodeKey>>,
    roots: Vec<NodeKey>,
}

/// Earliest record (by input position) on the parent cycle above `i`.
/// Only called for records no root reaches, whose parent chain always ends in a cycle.
fn cycle_head(i: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut j = i;
    while seen.insert(j) {
        match parent_of[j] {
            Some(p) => j = p,
            None => return j,
        }
    }
    let mut head = j;
    let mut k = parent_of[j];
    while let Some(p) = k.filter(|&p| p != j) {
        head = head.min(p);
        k = parent_of[p];
    }
    head
}

impl MenuTree {
    /// Build the forest from flat records
    pub fn build(records: &[MenuRecord]) -> Self {
        let mut index: HashMap<MenuId, usize> = HashMap::with_capacity(records.len());
        let mut kept: Vec<&MenuRecord> = Vec::with_capacity(records.len());
        for r in records {
            if index.contains_key(&r.id) {
                warn!(id = r.id, "duplicate menu id, keeping first occurrence");
                continue;
            }
            index.insert(r.id, kept.len());
            kept.push(r);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); kept.len()];
        let mut parent_of: Vec<Option<usize>> = vec![None; kept.len()];
        let mut is_root = vec![false; kept.len()];
        for (i, r) in kept.iter().enumerate() {
            match r.parent_id.and_then(|p| index.get(&p).copied()) {
                Some(p) if p != i => {
                    children[p].push(i);
                    parent_of[i] = Some(p);
                }
                _ => {
                    if let Some(p) = r.parent_id.filter(|p| *p != r.id) {
                        debug!(id = r.id, parent_id = p, "unresolved parent, treating menu as root");
                    }
                    is_root[i] = true;
                }
            }
        }

        // Anything a genuine root cannot reach hangs off a parent cycle
        let mut reached = is_root.clone();
        let mut pending: Vec<usize> = (0..kept.len()).filter(|&i| is_root[i]).collect();
        while let Some(i) = pending.pop() {
            for &c in &children[i] {
                if !reached[c] {
                    reached[c] = true;
                    pending.push(c);
                }
            }
        }

        let mut tree = MenuTree {
            nodes: Vec::with_capacity(kept.len()),
            nodes_by_key: HashMap::with_capacity(kept.len()),
            key_by_external_id: HashMap::with_capacity(kept.len()),
            ..Default::default()
        };
        let mut placed = vec![false; kept.len()];
        for i in 0..kept.len() {
            if placed[i] || (reached[i] && !is_root[i]) {
                continue;
            }
            let start = if reached[i] { i } else { cycle_head(i, &parent_of) };
            if !reached[i] {
                warn!(id = kept[start].id, "menu parent chain is cyclic, promoting to root");
            }
            tree.place_subtree(start, &kept, &children, &mut placed);
        }
        tree
    }

    /// Pre-order walk from `start`, appending nodes with siblings in input order
    fn place_subtree(
        &mut self,
        start: usize,
        records: &[&MenuRecord],
        children: &[Vec<usize>],
        placed: &mut [bool],
    ) {
        let root_key = NodeKey::root(self.roots.len());
        self.roots.push(root_key.clone());
        placed[start] = true;

        let mut stack: Vec<(usize, NodeKey, Option<NodeKey>, usize)> = vec![(start, root_key, None, 0)];
        while let Some((i, key, parent, level)) = stack.pop() {
            let kids: Vec<usize> = children[i].iter().copied().filter(|&c| !placed[c]).collect();
            let child_keys: Vec<NodeKey> = (0..kids.len()).map(|n| key.child(n)).collect();
            for (&c, ck) in kids.iter().zip(&child_keys).rev() {
                placed[c] = true;
                stack.push((c, ck.clone(), Some(key.clone()), level + 1));
            }
            if !child_keys.is_empty() {
                self.children_by_parent_key.insert(key.clone(), child_keys);
            }

            let rec = records[i];
            self.nodes_by_key.insert(key.clone(), self.nodes.len());
            self.key_by_external_id.insert(rec.id, key.clone());
            self.nodes.push(MenuNode {
                key,
                id: rec.id,
                parent_id: rec.parent_id,
                parent,
                title: rec.title.clone(),
                level,
            });
        }
    }

    /// All nodes, parents before children
    pub fn nodes(&self) -> &[MenuNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn node(&self, key: &NodeKey) -> Option<&MenuNode> {
        self.nodes_by_key.get(key).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes_by_key.contains_key(key)
    }

    /// Resolve an external menu id to its key
    pub fn key_of(&self, id: MenuId) -> Option<&NodeKey> {
        self.key_by_external_id.get(&id)
    }

    /// Direct children in input order; empty for leaves
    pub fn children(&self, key: &NodeKey) -> &[NodeKey] {
        self.children_by_parent_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A node is a leaf iff it has no children entry
    #[inline]
    pub fn is_leaf(&self, key: &NodeKey) -> bool {
        !self.children_by_parent_key.contains_key(key)
    }

    /// Every leaf of the forest in traversal order
    pub fn leaves(&self) -> impl Iterator<Item = &MenuNode> + '_ {
        self.nodes.iter().filter(|n| self.is_leaf(&n.key))
    }

    /// Transitive leaf descendants of `key` in traversal order.
    /// Empty for leaves and unknown keys. Guards against revisiting a key.
    pub fn leaf_descendants(&self, key: &NodeKey) -> Vec<&NodeKey> {
        let mut out = Vec::new();
        let Some(kids) = self.children_by_parent_key.get(key) else {
            return out;
        };
        let mut seen: HashSet<&NodeKey> = HashSet::new();
        let mut stack: Vec<&NodeKey> = kids.iter().rev().collect();
        while let Some(k) = stack.pop() {
            if k == key || !seen.insert(k) {
                continue;
            }
            match self.children_by_parent_key.get(k) {
                Some(c) => stack.extend(c.iter().rev()),
                None => out.push(k),
            }
        }
        out
    }
}
