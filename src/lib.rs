//! Capmatrix - permission matrix engine
//!
//! Maps a permission (role) to five capability flags on every node of a menu tree:
//! - `tree`: flat menu records -> keyed forest
//! - `store`: node key -> flags, one store per selected permission
//! - `aggregate`: tri-state view of internal nodes, always derived from leaves
//! - `cascade`: select/deselect a subtree or a whole column
//! - `grants`: persisted leaf grants in and out of a store
//! - `session`: selection / fetch / edit / save state machine
//! - `db`: LMDB storage for menus, permissions and grants

pub mod aggregate;
pub mod backend;
pub mod caps;
pub mod cascade;
pub mod constants;
pub mod db;
pub mod error;
pub mod grants;
pub mod session;
pub mod store;
pub mod tree;

pub use aggregate::{aggregated_state, column_state, matrix_rows, MatrixRow, TriState};
pub use backend::{GrantBackend, MenuSource};
pub use caps::{CapabilityFlags, Flag};
pub use cascade::{set_flag, set_flag_for_all_leaves};
pub use db::{GrantDb, Permission};
pub use error::{MatrixError, Result};
pub use grants::{hydrate, to_leaf_grants, HydrateReport, LeafGrant, SavePayload};
pub use session::{FetchOutcome, FetchTicket, MatrixSession, SaveOutcome, SaveTicket, SessionState};
pub use store::{create_initial_flags, FlagStore, PermissionId};
pub use tree::{MenuId, MenuNode, MenuRecord, MenuTree, NodeKey};
