//! Authentication is treated as an external capability. The rest of the application only needs
//! to know who is signed in right now and when that changes.
//!
//! [local_session::LocalSessionAuth] is the implementation used by the cli.

pub mod local_session;

use std::{fmt::Display, ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct UserId(Arc<str>);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated user. Every persistence operation is scoped by [Identity::user_id].
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Identity {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    /// Sent once the provider has resolved whatever session existed on startup.
    InitialSession,
    TokenRefreshed,
    UserUpdated,
}

impl SessionEvent {
    /// Only changes of who is signed in require reloading data.
    pub fn requires_reload(self) -> bool {
        matches!(
            self,
            SessionEvent::SignedIn | SessionEvent::SignedOut | SessionEvent::InitialSession
        )
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves the identity for the current session. Implementations must not cache the
    /// answer on behalf of callers.
    async fn current_identity(&self) -> Option<Identity>;

    /// Subscribes to session changes. Dropping the receiver unsubscribes.
    fn session_events(&self) -> broadcast::Receiver<SessionEvent>;
}

#[async_trait]
impl<T> AuthProvider for T
where
    T: Deref + Send + Sync,
    T::Target: AuthProvider,
{
    async fn current_identity(&self) -> Option<Identity> {
        self.deref().current_identity().await
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.deref().session_events()
    }
}
