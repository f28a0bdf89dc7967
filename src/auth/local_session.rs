use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{AuthProvider, Identity, SessionEvent};

const SESSION_FILE: &str = "session.json";
const EVENT_CAPACITY: usize = 16;

/// Keeps the signed in identity in a file inside the application directory. The file is read
/// on every [AuthProvider::current_identity] call so that sessions changed by another process
/// are picked up.
pub struct LocalSessionAuth {
    session_path: PathBuf,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalSessionAuth {
    pub fn new(app_dir: &Path) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session_path: app_dir.join(SESSION_FILE),
            events,
        }
    }

    pub async fn sign_in(&self, identity: &Identity) -> Result<()> {
        let data = serde_json::to_vec_pretty(identity)?;
        tokio::fs::write(&self.session_path, data).await?;
        info!("Signed in as {}", identity.user_id);
        self.notify(SessionEvent::SignedIn);
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.session_path).await {
            Ok(()) => info!("Signed out"),
            Err(e) if e.kind() == ErrorKind::NotFound => debug!("No session to sign out from"),
            Err(e) => Err(e)?,
        }
        self.notify(SessionEvent::SignedOut);
        Ok(())
    }

    /// Tells subscribers that the stored session (if any) has been resolved.
    pub fn announce_initial_session(&self) {
        self.notify(SessionEvent::InitialSession);
    }

    fn notify(&self, event: SessionEvent) {
        // Having no subscribers is fine.
        if self.events.send(event).is_err() {
            debug!("No subscribers for {event:?}");
        }
    }
}

#[async_trait]
impl AuthProvider for LocalSessionAuth {
    async fn current_identity(&self) -> Option<Identity> {
        let data = match tokio::fs::read(&self.session_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read session {:?}: {e}", self.session_path);
                return None;
            }
        };
        serde_json::from_slice(&data)
            .inspect_err(|e| warn!("Session file is corrupted {e}"))
            .ok()
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
