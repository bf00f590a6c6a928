//! Capability flags: the five booleans held per menu node

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{CAPS, CREATE, DELETE, EDIT, UPLOAD, VIEW};
use crate::error::MatrixError;

/// One column of the permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "can_view")]
    View,
    #[serde(rename = "can_create")]
    Create,
    #[serde(rename = "can_edit")]
    Edit,
    #[serde(rename = "can_delete")]
    Delete,
    #[serde(rename = "can_upload")]
    Upload,
}

impl Flag {
    /// All flags in column order
    pub const ALL: [Flag; 5] = [Flag::View, Flag::Create, Flag::Edit, Flag::Delete, Flag::Upload];

    /// Storage bit for this flag
    pub const fn bit(self) -> u64 {
        match self {
            Flag::View => VIEW,
            Flag::Create => CREATE,
            Flag::Edit => EDIT,
            Flag::Delete => DELETE,
            Flag::Upload => UPLOAD,
        }
    }

    /// Field name as persisted (`can_view`, ...)
    pub fn name(self) -> &'static str {
        CAPS.iter()
            .find(|(_, b)| *b == self.bit())
            .map(|(n, _)| *n)
            .unwrap_or("")
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Flag {
    type Err = MatrixError;

    /// Accepts both `can_view` and the short `view` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let full = if s.starts_with("can_") { s.to_string() } else { format!("can_{s}") };
        Flag::ALL
            .into_iter()
            .find(|f| f.name() == full)
            .ok_or_else(|| MatrixError::UnknownFlag(s.to_string()))
    }
}

/// Capability record for one node. All false by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_upload: bool,
}

impl CapabilityFlags {
    #[inline]
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::View => self.can_view,
            Flag::Create => self.can_create,
            Flag::Edit => self.can_edit,
            Flag::Delete => self.can_delete,
            Flag::Upload => self.can_upload,
        }
    }

    #[inline]
    pub fn set(&mut self, flag: Flag, value: bool) {
        let slot = match flag {
            Flag::View => &mut self.can_view,
            Flag::Create => &mut self.can_create,
            Flag::Edit => &mut self.can_edit,
            Flag::Delete => &mut self.can_delete,
            Flag::Upload => &mut self.can_upload,
        };
        *slot = value;
    }

    /// Encode as a capability bitmask
    pub fn to_mask(&self) -> u64 {
        Flag::ALL
            .into_iter()
            .filter(|f| self.get(*f))
            .fold(0, |m, f| m | f.bit())
    }

    /// Decode from a capability bitmask; unknown bits are ignored
    pub fn from_mask(mask: u64) -> Self {
        let mut flags = Self::default();
        for f in Flag::ALL {
            flags.set(f, mask & f.bit() != 0);
        }
        flags
    }
}
