//! Editing session for the permission matrix
//!
//! State machine per selected permission:
//!
//! ```text
//! Unselected -> Loading -> Hydrated -> Editing -> Saving -> Hydrated
//! ```
//!
//! Selecting a permission at any point drops the current store and starts over at
//! `Loading`. Fetch and save are split into begin/complete halves so the caller can run the
//! I/O wherever it likes; each half carries a generation ticket and a result arriving for
//! an older generation, or for a permission other than the selected one, is discarded.
//! Generations are drawn from one process-wide counter, so a ticket issued by a session
//! that has since been replaced never matches the replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{self, MatrixRow, TriState};
use crate::backend::{GrantBackend, MenuSource};
use crate::caps::Flag;
use crate::cascade;
use crate::error::{MatrixError, Result};
use crate::grants::{hydrate, to_leaf_grants, HydrateReport, LeafGrant, SavePayload};
use crate::store::{FlagStore, PermissionId};
use crate::tree::{MenuTree, NodeKey};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unselected,
    Loading,
    Hydrated,
    Editing,
    Saving,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unselected => "unselected",
            SessionState::Loading => "loading",
            SessionState::Hydrated => "hydrated",
            SessionState::Editing => "editing",
            SessionState::Saving => "saving",
        }
    }
}

/// Handed out by [`MatrixSession::select`]; redeemed by [`MatrixSession::complete_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub permission_id: PermissionId,
    generation: u64,
}

/// Handed out by [`MatrixSession::begin_save`]; `payload` is what to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub payload: SavePayload,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Hydrated(HydrateReport),
    /// A newer selection superseded this fetch; nothing was touched
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Stale,
}

/// Owns the menu tree handle and the store of the active permission
#[derive(Debug, Clone)]
pub struct MatrixSession {
    tree: Arc<MenuTree>,
    state: SessionState,
    store: Option<FlagStore>,
    generation: u64,
    dirty: bool,
}

impl MatrixSession {
    pub fn new(tree: impl Into<Arc<MenuTree>>) -> Self {
        Self {
            tree: tree.into(),
            state: SessionState::Unselected,
            store: None,
            generation: 0,
            dirty: false,
        }
    }

    /// Build the tree from a menu source and start a session on it
    pub fn from_source<S: MenuSource>(source: &S) -> Result<Self> {
        let records = source.load_menus()?;
        let tree = MenuTree::build(&records);
        debug!(menus = records.len(), nodes = tree.len(), roots = tree.roots().len(), "menu tree built");
        Ok(Self::new(tree))
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn permission_id(&self) -> Option<PermissionId> {
        self.store.as_ref().map(FlagStore::permission_id)
    }

    pub fn store(&self) -> Option<&FlagStore> {
        self.store.as_ref()
    }

    /// True when local edits have not been saved yet
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Swap in a rebuilt menu tree. The selection is dropped and every outstanding ticket
    /// goes stale.
    pub fn reset_tree(&mut self, tree: impl Into<Arc<MenuTree>>) {
        self.tree = tree.into();
        self.store = None;
        self.state = SessionState::Unselected;
        self.dirty = false;
        self.generation = next_generation();
    }

    /// Whether a result for `permission_id` from `generation` still belongs here
    fn is_current(&self, generation: u64, permission_id: PermissionId) -> bool {
        generation == self.generation && self.permission_id() == Some(permission_id)
    }

    // Selection and fetch

    /// Switch to `permission_id`: drops any in-progress edits and starts `Loading`
    pub fn select(&mut self, permission_id: PermissionId) -> FetchTicket {
        self.generation = next_generation();
        if self.dirty {
            debug!(permission_id, "discarding unsaved edits on permission change");
        }
        self.store = Some(FlagStore::create_initial(&self.tree, permission_id));
        self.state = SessionState::Loading;
        self.dirty = false;
        FetchTicket { permission_id, generation: self.generation }
    }

    /// Apply the result of the fetch started by `ticket`.
    ///
    /// A ticket from an older selection, or from another session, yields `Stale`. On fetch failure the store stays
    /// all-false, the session becomes editable and the error is returned.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<LeafGrant>>) -> Result<FetchOutcome> {
        if !self.is_current(ticket.generation, ticket.permission_id) || self.state != SessionState::Loading {
            debug!(permission_id = ticket.permission_id, "discarding stale grant fetch");
            return Ok(FetchOutcome::Stale);
        }
        self.state = SessionState::Hydrated;
        let grants = result.map_err(|e| {
            warn!(permission_id = ticket.permission_id, error = %e, "grant fetch failed");
            MatrixError::Fetch { permission_id: ticket.permission_id, reason: e.to_string() }
        })?;
        let store = self.store.as_mut().ok_or(MatrixError::NoSelection)?;
        let report = hydrate(store, &grants, &self.tree);
        debug!(
            permission_id = ticket.permission_id,
            applied = report.applied,
            skipped = report.skipped,
            "store hydrated"
        );
        Ok(FetchOutcome::Hydrated(report))
    }

    /// Select and fetch in one go
    pub fn load<B: GrantBackend>(&mut self, permission_id: PermissionId, backend: &B) -> Result<FetchOutcome> {
        let ticket = self.select(permission_id);
        let result = backend.fetch_grants(permission_id);
        self.complete_fetch(ticket, result)
    }

    // Edits

    fn editable_store(&mut self, action: &'static str) -> Result<&mut FlagStore> {
        match self.state {
            SessionState::Hydrated | SessionState::Editing => {}
            SessionState::Unselected => return Err(MatrixError::NoSelection),
            s => return Err(MatrixError::InvalidState { action, state: s.as_str() }),
        }
        self.store.as_mut().ok_or(MatrixError::NoSelection)
    }

    /// Set one cell; cascades to every leaf below an internal node
    pub fn toggle(&mut self, key: &NodeKey, flag: Flag, value: bool) -> Result<()> {
        if !self.tree.contains(key) {
            return Err(MatrixError::UnknownNode(key.to_string()));
        }
        let tree = Arc::clone(&self.tree);
        let store = self.editable_store("toggle")?;
        cascade::set_flag(&tree, store, key, flag, value);
        self.state = SessionState::Editing;
        self.dirty = true;
        Ok(())
    }

    /// Select or clear a whole column
    pub fn set_column(&mut self, flag: Flag, value: bool) -> Result<()> {
        let tree = Arc::clone(&self.tree);
        let store = self.editable_store("set column")?;
        cascade::set_flag_for_all_leaves(&tree, store, flag, value);
        self.state = SessionState::Editing;
        self.dirty = true;
        Ok(())
    }

    // Save

    /// Flatten the store into a payload and enter `Saving`. Only one save may be in flight.
    pub fn begin_save(&mut self) -> Result<SaveTicket> {
        let tree = Arc::clone(&self.tree);
        let store = self.editable_store("save")?;
        let permission_id = store.permission_id();
        let payload = SavePayload { permission_id, permissions: to_leaf_grants(&tree, store, permission_id) };
        self.state = SessionState::Saving;
        Ok(SaveTicket { payload, generation: self.generation })
    }

    /// Apply the outcome of the save started by `ticket`.
    ///
    /// Failure keeps the local edits and returns to `Editing` so the user can retry.
    pub fn complete_save(&mut self, ticket: SaveTicket, result: Result<()>) -> Result<SaveOutcome> {
        let permission_id = ticket.payload.permission_id;
        if !self.is_current(ticket.generation, permission_id) || self.state != SessionState::Saving {
            debug!(permission_id, "discarding stale save result");
            return Ok(SaveOutcome::Stale);
        }
        match result {
            Ok(()) => {
                self.state = SessionState::Hydrated;
                self.dirty = false;
                info!(permission_id, grants = ticket.payload.permissions.len(), "permission matrix saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.state = SessionState::Editing;
                warn!(permission_id, error = %e, "permission matrix save failed");
                Err(MatrixError::Save { permission_id, reason: e.to_string() })
            }
        }
    }

    /// Flatten, submit and settle in one go
    pub fn save<B: GrantBackend>(&mut self, backend: &B) -> Result<SaveOutcome> {
        let ticket = self.begin_save()?;
        let result = backend.save_grants(&ticket.payload);
        self.complete_save(ticket, result)
    }

    // Read side

    fn current_store(&self) -> Result<&FlagStore> {
        self.store.as_ref().ok_or(MatrixError::NoSelection)
    }

    pub fn aggregated_state(&self, key: &NodeKey, flag: Flag) -> Result<TriState> {
        if !self.tree.contains(key) {
            return Err(MatrixError::UnknownNode(key.to_string()));
        }
        Ok(aggregate::aggregated_state(&self.tree, self.current_store()?, key, flag))
    }

    pub fn column_state(&self, flag: Flag) -> Result<TriState> {
        Ok(aggregate::column_state(&self.tree, self.current_store()?, flag))
    }

    /// Rows to render, one per node in traversal order
    pub fn matrix(&self) -> Result<Vec<MatrixRow>> {
        Ok(aggregate::matrix_rows(&self.tree, self.current_store()?))
    }
}
