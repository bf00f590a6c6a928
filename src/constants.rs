//! Capability bit constants and the flag name table

// Capability bit constants (storage encoding of CapabilityFlags)
pub const VIEW: u64 = 1;
pub const CREATE: u64 = 1 << 1;
pub const EDIT: u64 = 1 << 2;
pub const DELETE: u64 = 1 << 3;
pub const UPLOAD: u64 = 1 << 4;

pub const ALL: u64 = VIEW | CREATE | EDIT | DELETE | UPLOAD;

// Capability name mappings, in column order
pub(crate) const CAPS: &[(&str, u64)] = &[
    ("can_view", VIEW),
    ("can_create", CREATE),
    ("can_edit", EDIT),
    ("can_delete", DELETE),
    ("can_upload", UPLOAD),
];

