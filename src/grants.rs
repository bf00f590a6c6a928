//! Persisted leaf grants: hydration into a store and flattening back out

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caps::CapabilityFlags;
use crate::store::{FlagStore, PermissionId};
use crate::tree::{MenuId, MenuTree};

/// One persisted grant: a permission's flags on one leaf menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafGrant {
    pub permission_id: PermissionId,
    pub menu_id: MenuId,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    #[serde(flatten)]
    pub flags: CapabilityFlags,
}

impl LeafGrant {
    pub fn new(permission_id: PermissionId, menu_id: MenuId, parent_id: Option<MenuId>, flags: CapabilityFlags) -> Self {
        Self { permission_id, menu_id, parent_id, flags }
    }
}

/// Body submitted on save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    pub permission_id: PermissionId,
    pub permissions: Vec<LeafGrant>,
}

/// Outcome counts of a hydration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrateReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Merge grants into `store`. A grant whose `menu_id` does not resolve in `tree` is skipped;
/// keys not named by any grant keep their current value.
pub fn hydrate(store: &mut FlagStore, grants: &[LeafGrant], tree: &MenuTree) -> HydrateReport {
    let mut report = HydrateReport::default();
    for g in grants {
        match tree.key_of(g.menu_id) {
            Some(key) if store.replace(key, g.flags) => report.applied += 1,
            _ => {
                debug!(menu_id = g.menu_id, permission_id = g.permission_id, "skipping unresolved grant");
                report.skipped += 1;
            }
        }
    }
    report
}

/// One grant per leaf in traversal order; internal nodes are never emitted
pub fn to_leaf_grants(tree: &MenuTree, store: &FlagStore, permission_id: PermissionId) -> Vec<LeafGrant> {
    tree.leaves()
        .map(|n| LeafGrant {
            permission_id,
            menu_id: n.id,
            parent_id: n.parent_id,
            flags: store.get(&n.key).copied().unwrap_or_default(),
        })
        .collect()
}
