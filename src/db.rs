//! LMDB-backed menu catalog and grant storage
//!
//! Layout:
//! - `menus`: `seq/menu_id` -> title (insertion order preserved by `seq`)
//! - `menu_parents`: `seq` -> parent menu id (absent for roots)
//! - `permissions`: permission id -> name
//! - `grants`: `permission_id/menu_id` -> capability mask
//! - `grant_parents`: `permission_id/menu_id` -> parent menu id (absent for roots)

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{GrantBackend, MenuSource};
use crate::caps::CapabilityFlags;
use crate::error::Result;
use crate::grants::{LeafGrant, SavePayload};
use crate::store::PermissionId;
use crate::tree::MenuRecord;

// Database type aliases
pub type Db = Database<Bytes, U64<BigEndian>>;
pub type DbStr = Database<Bytes, Str>;
pub type DbId = Database<U64<BigEndian>, U64<BigEndian>>;
pub type DbIdStr = Database<U64<BigEndian>, Str>;

/// Create a 16-byte key from two u64 values
#[inline]
pub fn key(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    BigEndian::write_u64(&mut k[..8], a);
    BigEndian::write_u64(&mut k[8..], b);
    k
}

/// Split a 16-byte key back into its two halves
#[inline]
fn split_key(k: &[u8]) -> Option<(u64, u64)> {
    if k.len() != 16 {
        return None;
    }
    Some((BigEndian::read_u64(&k[..8]), BigEndian::read_u64(&k[8..])))
}

/// A named permission (role) that owns a capability matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
}

/// Grant database handle
pub struct GrantDb {
    env: Env,
    menus: DbStr,
    menu_parents: DbId,
    permissions: DbIdStr,
    grants: Db,
    grant_parents: Db,
}

impl GrantDb {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe { EnvOpenOptions::new().map_size(1 << 30).max_dbs(5).open(path)? };
        let mut tx = env.write_txn()?;
        let menus = env.create_database(&mut tx, Some("menus"))?;
        let menu_parents = env.create_database(&mut tx, Some("menu_parents"))?;
        let permissions = env.create_database(&mut tx, Some("permissions"))?;
        let grants = env.create_database(&mut tx, Some("grants"))?;
        let grant_parents = env.create_database(&mut tx, Some("grant_parents"))?;
        tx.commit()?;
        info!(path = %path.display(), "opened grant database");
        Ok(Self { env, menus, menu_parents, permissions, grants, grant_parents })
    }

    /// Execute a read-only operation
    #[inline]
    fn read<T, F: FnOnce(&RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.env.read_txn()?)
    }

    /// Execute a write operation in one committed transaction
    fn write<T, F: FnOnce(&mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn()?;
        let r = f(&mut tx)?;
        tx.commit()?;
        Ok(r)
    }

    // Menus

    /// Replace the menu catalog
    pub fn put_menus(&self, records: &[MenuRecord]) -> Result<()> {
        self.write(|tx| {
            self.menus.clear(tx)?;
            self.menu_parents.clear(tx)?;
            for (seq, r) in records.iter().enumerate() {
                let seq = seq as u64;
                self.menus.put(tx, &key(seq, r.id), r.title.as_str())?;
                if let Some(p) = r.parent_id {
                    self.menu_parents.put(tx, &seq, &p)?;
                }
            }
            Ok(())
        })?;
        info!(menus = records.len(), "menu catalog replaced");
        Ok(())
    }

    // Permissions

    pub fn put_permission(&self, id: PermissionId, name: &str) -> Result<()> {
        self.write(|tx| Ok(self.permissions.put(tx, &id, name)?))
    }

    pub fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.read(|tx| {
            Ok(self
                .permissions
                .get(tx, &id)?
                .map(|name| Permission { id, name: name.to_string() }))
        })
    }

    /// All permissions ordered by id
    pub fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.read(|tx| {
            let mut r = Vec::new();
            for item in self.permissions.iter(tx)? {
                let (id, name) = item?;
                r.push(Permission { id, name: name.to_string() });
            }
            Ok(r)
        })
    }

    /// Remove a permission together with its grants
    pub fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        self.write(|tx| {
            let removed = self.delete_grants(tx, id)?;
            debug!(permission_id = id, grants = removed, "deleted permission grants");
            Ok(self.permissions.delete(tx, &id)?)
        })
    }

    // Grants

    fn delete_grants(&self, tx: &mut RwTxn, permission_id: PermissionId) -> Result<usize> {
        let mut keys: Vec<Vec<u8>> = Vec::new();
        for item in self.grants.prefix_iter(tx, &permission_id.to_be_bytes())? {
            let (k, _) = item?;
            keys.push(k.to_vec());
        }
        for k in &keys {
            self.grants.delete(tx, k.as_slice())?;
            self.grant_parents.delete(tx, k.as_slice())?;
        }
        Ok(keys.len())
    }

    /// Number of grants stored for a permission
    pub fn count_grants(&self, permission_id: PermissionId) -> Result<usize> {
        self.read(|tx| Ok(self.grants.prefix_iter(tx, &permission_id.to_be_bytes())?.count()))
    }

    /// Clear all databases (for testing)
    pub fn clear_all(&self) -> Result<()> {
        self.write(|tx| {
            self.menus.clear(tx)?;
            self.menu_parents.clear(tx)?;
            self.permissions.clear(tx)?;
            self.grants.clear(tx)?;
            Ok(self.grant_parents.clear(tx)?)
        })
    }
}

impl MenuSource for GrantDb {
    /// Catalog in the order it was stored
    fn load_menus(&self) -> Result<Vec<MenuRecord>> {
        self.read(|tx| {
            let mut r = Vec::new();
            for item in self.menus.iter(tx)? {
                let (k, title) = item?;
                if let Some((seq, id)) = split_key(k) {
                    let parent_id = self.menu_parents.get(tx, &seq)?;
                    r.push(MenuRecord { id, parent_id, title: title.to_string() });
                }
            }
            Ok(r)
        })
    }
}

impl GrantBackend for GrantDb {
    /// Grants of one permission ordered by menu id
    fn fetch_grants(&self, permission_id: PermissionId) -> Result<Vec<LeafGrant>> {
        self.read(|tx| {
            let mut r = Vec::new();
            for item in self.grants.prefix_iter(tx, &permission_id.to_be_bytes())? {
                let (k, mask) = item?;
                if let Some((_, menu_id)) = split_key(k) {
                    let parent_id = self.grant_parents.get(tx, k)?;
                    r.push(LeafGrant::new(permission_id, menu_id, parent_id, CapabilityFlags::from_mask(mask)));
                }
            }
            Ok(r)
        })
    }

    /// Replace every grant of the payload's permission in one transaction
    fn save_grants(&self, payload: &SavePayload) -> Result<()> {
        let pid = payload.permission_id;
        self.write(|tx| {
            self.delete_grants(tx, pid)?;
            for g in &payload.permissions {
                let k = key(pid, g.menu_id);
                self.grants.put(tx, &k, &g.flags.to_mask())?;
                if let Some(p) = g.parent_id {
                    self.grant_parents.put(tx, &k, &p)?;
                }
            }
            Ok(())
        })?;
        info!(permission_id = pid, grants = payload.permissions.len(), "grants saved");
        Ok(())
    }
}
