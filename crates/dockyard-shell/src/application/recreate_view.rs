//! Deferred two-phase view recreation.
//!
//! Rebuilding a view (after its bypass or visibility settings change, for
//! instance) happens in two steps separated by delays:
//!
//! 1. `RemoveOld` fires after the remove delay and destroys the current view.
//! 2. Once the platform reports the old view destroyed, `AddBack` fires after
//!    the re-add delay and places a fresh view.
//!
//! Each pending recreation carries a generation token.  A step whose token
//! no longer matches the pending entry (because the recreation was cancelled,
//! or the definition was removed) is dropped.  Requests for a definition that
//! is already being recreated are coalesced into the pending one.

use std::collections::HashMap;
use std::time::Duration;

use dockyard_core::EntityId;
use tracing::debug;

use crate::application::events::{Scheduled, ShellEvent};
use crate::infrastructure::platform::ViewId;

/// One step of a pending recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecreateStep {
    RemoveOld { definition: EntityId, token: u64 },
    AddBack { definition: EntityId, token: u64 },
}

impl RecreateStep {
    pub fn definition(self) -> EntityId {
        match self {
            RecreateStep::RemoveOld { definition, .. }
            | RecreateStep::AddBack { definition, .. } => {
                definition
            }
        }
    }

    pub fn token(self) -> u64 {
        match self {
            RecreateStep::RemoveOld { token, .. } | RecreateStep::AddBack { token, .. } => token,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    token: u64,
    /// Old view whose destruction gates the `AddBack` step.
    awaiting: Option<ViewId>,
}

/// Bookkeeping for every pending recreation of one layout.
#[derive(Debug)]
pub struct RecreateScheduler {
    pending: HashMap<EntityId, Pending>,
    next_token: u64,
    remove_delay: Duration,
    readd_delay: Duration,
}

impl RecreateScheduler {
    pub fn new(remove_delay: Duration, readd_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            next_token: 1,
            remove_delay,
            readd_delay,
        }
    }

    /// Starts a recreation of `definition`.
    ///
    /// Returns `None` when one is already pending.
    pub fn request(&mut self, definition: EntityId) -> Option<Scheduled> {
        if self.pending.contains_key(&definition) {
            debug!("recreation of dock {definition} already pending");
            return None;
        }
        let token = self.next_token;
        self.next_token += 1;
        self.pending.insert(
            definition,
            Pending {
                token,
                awaiting: None,
            },
        );
        Some(Scheduled::after(
            self.remove_delay,
            ShellEvent::Recreate(RecreateStep::RemoveOld { definition, token }),
        ))
    }

    /// Drops any pending recreation of `definition`.  Returns `true` if one
    /// was pending.
    pub fn cancel(&mut self, definition: EntityId) -> bool {
        self.pending.remove(&definition).is_some()
    }

    pub fn is_pending(&self, definition: EntityId) -> bool {
        self.pending.contains_key(&definition)
    }

    /// `true` if `step` belongs to the current pending recreation.
    pub fn accepts(&self, step: RecreateStep) -> bool {
        self.pending
            .get(&step.definition())
            .is_some_and(|p| p.token == step.token())
    }

    /// Records that the old view of `definition` was handed to the platform.
    ///
    /// Without an old view the `AddBack` step is scheduled straight away.
    /// Otherwise it waits for [`RecreateScheduler::view_destroyed`].
    pub fn removed(&mut self, definition: EntityId, old_view: Option<ViewId>) -> Option<Scheduled> {
        let pending = self.pending.get_mut(&definition)?;
        match old_view {
            Some(view) => {
                pending.awaiting = Some(view);
                None
            }
            None => {
                let token = pending.token;
                Some(self.add_back(definition, token))
            }
        }
    }

    /// Schedules the `AddBack` step of whichever recreation was waiting for
    /// `view` to be destroyed.
    pub fn view_destroyed(&mut self, view: ViewId) -> Option<Scheduled> {
        let (definition, pending) = self
            .pending
            .iter_mut()
            .find(|(_, p)| p.awaiting == Some(view))?;
        pending.awaiting = None;
        let (definition, token) = (*definition, pending.token);
        Some(self.add_back(definition, token))
    }

    /// Closes the recreation `step` belongs to.
    pub fn finish(&mut self, step: RecreateStep) {
        if self.accepts(step) {
            self.pending.remove(&step.definition());
        }
    }

    fn add_back(&self, definition: EntityId, token: u64) -> Scheduled {
        Scheduled::after(
            self.readd_delay,
            ShellEvent::Recreate(RecreateStep::AddBack { definition, token }),
        )
    }
}
