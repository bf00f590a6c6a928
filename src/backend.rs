//! External collaborators: where menus come from and where grants go

use crate::error::Result;
use crate::grants::{LeafGrant, SavePayload};
use crate::store::PermissionId;
use crate::tree::MenuRecord;

/// Read-only menu configuration, fetched once per session
pub trait MenuSource {
    fn load_menus(&self) -> Result<Vec<MenuRecord>>;
}

/// Grant fetch and save for one permission at a time
pub trait GrantBackend {
    fn fetch_grants(&self, permission_id: PermissionId) -> Result<Vec<LeafGrant>>;

    /// Replace the stored grants of `payload.permission_id`
    fn save_grants(&self, payload: &SavePayload) -> Result<()>;
}

impl<T: MenuSource + ?Sized> MenuSource for &T {
    fn load_menus(&self) -> Result<Vec<MenuRecord>> {
        (**self).load_menus()
    }
}

impl<T: GrantBackend + ?Sized> GrantBackend for &T {
    fn fetch_grants(&self, permission_id: PermissionId) -> Result<Vec<LeafGrant>> {
        (**self).fetch_grants(permission_id)
    }

    fn save_grants(&self, payload: &SavePayload) -> Result<()> {
        (**self).save_grants(payload)
    }
}
