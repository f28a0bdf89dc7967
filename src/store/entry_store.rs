use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::{AuthProvider, Identity, SessionEvent};

use super::{
    entities::{sort_canonical, EntryDraft, EntryId, TimesheetEntry},
    repository::{EntryRepository, PersistenceError},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user is not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// State observed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Always kept in canonical order.
    pub entries: Vec<TimesheetEntry>,
    pub loading: bool,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            loading: true,
        }
    }
}

/// Owns the entries of the signed in user and mediates every change to them.
///
/// Create and update change local state only after the repository confirmed them. Remove is
/// optimistic and restores the previous list if the repository fails.
///
/// Every reload starts a new generation. Results of operations started in an older generation
/// are not applied, so a mutation finishing after a session change can't leak into the list of
/// the new session. In the other direction, a reload lists again when a mutation changed the
/// entries while its list was in flight.
pub struct EntryStore<A, R> {
    auth: A,
    repository: R,
    state: watch::Sender<StoreSnapshot>,
    generation: AtomicU64,
    /// Bumped by every local change made by a mutation. Only touched while holding the state lock.
    revision: AtomicU64,
}

enum ReloadOutcome {
    Applied(usize),
    Superseded,
    ChangedMeanwhile,
}

impl<A: AuthProvider, R: EntryRepository> EntryStore<A, R> {
    pub fn new(auth: A, repository: R) -> Self {
        let (state, _) = watch::channel(StoreSnapshot::default());
        Self {
            auth,
            repository,
            state,
            generation: AtomicU64::new(0),
            revision: AtomicU64::new(0),
        }
    }

    pub fn entries(&self) -> Vec<TimesheetEntry> {
        self.state.borrow().entries.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    /// Waits until no reload is in flight.
    pub async fn wait_until_loaded(&self) -> StoreSnapshot {
        let mut receiver = self.state.subscribe();
        let loaded = receiver
            .wait_for(|state| !state.loading)
            .await
            .map(|state| state.clone());
        // The sender lives in self, so the channel can't be closed here.
        loaded.unwrap_or_else(|_| self.snapshot())
    }

    /// Replaces the whole list with the entries of the current identity. Never fails: missing
    /// identity and repository failures both result in an empty list.
    #[instrument(skip(self))]
    pub async fn reload(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_modify(|state| state.loading = true);

        loop {
            let revision = self.revision.load(Ordering::Acquire);
            let entries = self.fetch_entries().await;

            match self.publish_reload(generation, revision, entries) {
                ReloadOutcome::Applied(count) => {
                    info!("Loaded {count} entries");
                    return;
                }
                ReloadOutcome::Superseded => {
                    debug!("Reload {generation} was superseded, discarding its entries");
                    return;
                }
                ReloadOutcome::ChangedMeanwhile => {
                    debug!("Entries changed while reload {generation} was listing, listing again");
                }
            }
        }
    }

    async fn fetch_entries(&self) -> Vec<TimesheetEntry> {
        let Some(identity) = self.auth.current_identity().await else {
            warn!("User not authenticated. Cannot fetch entries");
            return Vec::new();
        };
        match self.repository.list(&identity.user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load entries {e:?}");
                Vec::new()
            }
        }
    }

    /// Replaces the list unless a newer reload started or a mutation changed the list since
    /// `revision` was read. Checked under the state lock, so no mutation can slip in between.
    fn publish_reload(
        &self,
        generation: u64,
        revision: u64,
        entries: Vec<TimesheetEntry>,
    ) -> ReloadOutcome {
        let mut outcome = ReloadOutcome::Superseded;
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            if self.revision.load(Ordering::Acquire) != revision {
                outcome = ReloadOutcome::ChangedMeanwhile;
                return false;
            }
            outcome = ReloadOutcome::Applied(entries.len());
            state.entries = entries;
            state.loading = false;
            true
        });
        outcome
    }

    /// Persists a draft and inserts the saved entry at its canonical position.
    #[instrument(skip(self, draft), fields(date = %draft.date))]
    pub async fn create(&self, draft: EntryDraft) -> Result<TimesheetEntry, StoreError> {
        let generation = self.current_generation();
        let identity = self.require_identity().await?;

        let entry = self
            .repository
            .insert(&identity.user_id, draft)
            .await
            .inspect_err(|e| error!("Failed to save entry {e:?}"))?;

        self.apply_if_current(generation, |entries| {
            entries.push(entry.clone());
            sort_canonical(entries);
        });
        Ok(entry)
    }

    /// Replaces every field of the entry with `id`.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &EntryId, patch: EntryDraft) -> Result<(), StoreError> {
        let generation = self.current_generation();
        let identity = self.require_identity().await?;

        self.repository
            .update(id, &identity.user_id, patch.clone())
            .await
            .inspect_err(|e| error!("Failed to update entry {e:?}"))?;

        self.apply_if_current(generation, |entries| {
            if let Some(entry) = entries.iter_mut().find(|entry| &entry.id == id) {
                entry.apply(patch);
            }
            sort_canonical(entries);
        });
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: &EntryId) -> Result<(), StoreError> {
        let generation = self.current_generation();
        let identity = self.require_identity().await?;

        let mut previous = Vec::new();
        let removed_locally = self.apply_if_current(generation, |entries| {
            previous = entries.clone();
            entries.retain(|entry| &entry.id != id);
        });

        if let Err(e) = self.repository.delete(id, &identity.user_id).await {
            error!("Failed to delete entry {e:?}");
            if removed_locally && self.apply_if_current(generation, |entries| *entries = previous) {
                debug!("Restored entries after failed delete of {id}");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Reloads whenever the signed in user changes. Runs until `shutdown` is cancelled or the
    /// provider goes away.
    pub async fn follow_sessions(
        &self,
        mut events: broadcast::Receiver<SessionEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Session listener cancelled");
                    return;
                }
                event = events.recv() => event,
            };

            match event {
                Ok(event) if event.requires_reload() => {
                    info!("Session changed with {event:?}, reloading");
                    self.reload().await;
                }
                Ok(event) => debug!("Ignoring session event {event:?}"),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {skipped} session events, reloading");
                    self.reload().await;
                }
                Err(RecvError::Closed) => {
                    debug!("Session events closed");
                    return;
                }
            }
        }
    }

    async fn require_identity(&self) -> Result<Identity, StoreError> {
        self.auth.current_identity().await.ok_or_else(|| {
            warn!("User not authenticated");
            StoreError::NotAuthenticated
        })
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Applies a local change unless a reload happened since `generation`.
    fn apply_if_current(
        &self,
        generation: u64,
        apply: impl FnOnce(&mut Vec<TimesheetEntry>),
    ) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            apply(&mut state.entries);
            self.revision.fetch_add(1, Ordering::AcqRel);
            true
        });
        if !applied {
            debug!("Entries were reloaded since generation {generation}, discarding change");
        }
        applied
    }
}
