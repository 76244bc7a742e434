//! A client handle that can be shared between tasks.
//!
//! [`SharedClient`] keeps the current [`Session`] snapshot behind an async
//! mutex. Every operation holds the lock for its whole round trip and
//! replaces the snapshot only when the call succeeded, so concurrent callers
//! are serialized and never observe a half-applied transition.

use protocol::{CallContext, Result, RpcTransport, SessionState};
use tokio::sync::Mutex;

use crate::config::ConnectionConfig;
use crate::session::{Session, SessionManager};
use crate::users::{UserId, UserRecord};

/// One logical session, safe to call from several tasks.
pub struct SharedClient<T> {
    manager: SessionManager<T>,
    session: Mutex<Session>,
}

impl<T: RpcTransport> SharedClient<T> {
    /// Creates a disconnected client.
    pub fn new(config: ConnectionConfig, transport: T) -> Self {
        Self::from_manager(SessionManager::new(config, transport))
    }

    pub fn from_manager(manager: SessionManager<T>) -> Self {
        Self {
            manager,
            session: Mutex::new(Session::Disconnected),
        }
    }

    pub fn manager(&self) -> &SessionManager<T> {
        &self.manager
    }

    /// A copy of the current snapshot.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Drops the held session after the caller detected connection loss.
    pub async fn mark_disconnected(&self) {
        let mut session = self.session.lock().await;
        if session.state() != SessionState::Disconnected {
            tracing::info!("Session marked disconnected");
        }
        *session = Session::disconnected();
    }

    /// Opens a new session, replacing whatever was held.
    pub async fn connect(&self, ctx: &CallContext) -> Result<Session> {
        let mut session = self.session.lock().await;
        *session = self.manager.connect(ctx).await?;
        Ok(session.clone())
    }

    /// Logs in and returns the resulting snapshot.
    pub async fn login(&self, username: &str, password: &str, ctx: &CallContext) -> Result<Session> {
        let mut session = self.session.lock().await;
        let next = self.manager.login(&session, username, password, ctx).await?;
        *session = next;
        Ok(session.clone())
    }

    pub async fn logout(&self, ctx: &CallContext) -> Result<Session> {
        let mut session = self.session.lock().await;
        let next = self.manager.logout(&session, ctx).await?;
        *session = next;
        Ok(session.clone())
    }

    pub async fn create_user(
        &self,
        name: &str,
        pass: &str,
        mail: &str,
        ctx: &CallContext,
    ) -> Result<UserId> {
        let session = self.session.lock().await;
        self.manager
            .users()
            .create(&session, name, pass, mail, ctx)
            .await
    }

    pub async fn update_user(
        &self,
        user_id: UserId,
        name: &str,
        pass: &str,
        mail: &str,
        ctx: &CallContext,
    ) -> Result<()> {
        let session = self.session.lock().await;
        self.manager
            .users()
            .update(&session, user_id, name, pass, mail, ctx)
            .await
    }

    pub async fn delete_user(&self, user_id: UserId, ctx: &CallContext) -> Result<()> {
        let session = self.session.lock().await;
        self.manager.users().delete(&session, user_id, ctx).await
    }

    pub async fn get_user(&self, user_id: UserId, ctx: &CallContext) -> Result<UserRecord> {
        let session = self.session.lock().await;
        self.manager.users().get(&session, user_id, ctx).await
    }
}
