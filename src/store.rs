//! Per-permission flag store: node key -> capability flags

use std::collections::HashMap;

use crate::caps::{CapabilityFlags, Flag};
use crate::tree::{MenuTree, NodeKey};

/// Permission identifier
pub type PermissionId = u64;

/// Flags for every node of a tree, owned by exactly one permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagStore {
    permission_id: PermissionId,
    flags: HashMap<NodeKey, CapabilityFlags>,
}

impl FlagStore {
    /// Fresh store with every node of `tree` all-false
    pub fn create_initial(tree: &MenuTree, permission_id: PermissionId) -> Self {
        let flags = tree
            .nodes()
            .iter()
            .map(|n| (n.key.clone(), CapabilityFlags::default()))
            .collect();
        Self { permission_id, flags }
    }

    pub fn permission_id(&self) -> PermissionId {
        self.permission_id
    }

    pub fn get(&self, key: &NodeKey) -> Option<&CapabilityFlags> {
        self.flags.get(key)
    }

    /// Stored value of one flag; false for unknown keys
    #[inline]
    pub fn flag(&self, key: &NodeKey, flag: Flag) -> bool {
        self.flags.get(key).map(|f| f.get(flag)).unwrap_or(false)
    }

    /// Write one flag. Returns false if the key has no entry.
    #[inline]
    pub fn set_flag(&mut self, key: &NodeKey, flag: Flag, value: bool) -> bool {
        match self.flags.get_mut(key) {
            Some(f) => {
                f.set(flag, value);
                true
            }
            None => false,
        }
    }

    /// Overwrite all five fields of an entry. Returns false if the key has no entry.
    pub fn replace(&mut self, key: &NodeKey, value: CapabilityFlags) -> bool {
        match self.flags.get_mut(key) {
            Some(f) => {
                *f = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Every node key of `tree` mapped to all-false flags
pub fn create_initial_flags(tree: &MenuTree, permission_id: PermissionId) -> FlagStore {
    FlagStore::create_initial(tree, permission_id)
}
