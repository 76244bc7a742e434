//! Session lifecycle: connect, login and logout.
//!
//! A [`Session`] is an immutable snapshot. Every lifecycle operation on
//! [`SessionManager`] reads the snapshot it is given and, on success, returns
//! a new one. When a call fails the caller simply keeps the snapshot it
//! already had, so a failure can never leave half-applied state behind.

use protocol::{
    build_anonymous, build_signed, methods, AuthSigner, CallArgument, CallContext, ClientError,
    Result, RpcResponse, RpcTransport, RpcValue, SessionState,
};
use serde::Deserialize;

use crate::config::ConnectionConfig;
use crate::users::{UserId, UserService};

/// Snapshot of the remote session as this client knows it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// No session identifier held.
    #[default]
    Disconnected,
    /// Holding a session identifier, nobody logged in.
    Connected { session_id: String },
    /// Holding a session identifier on which `user_id` is logged in.
    Authenticated { session_id: String, user_id: UserId },
}

impl Session {
    /// The snapshot to continue from after the connection was lost.
    pub fn disconnected() -> Self {
        Session::Disconnected
    }

    pub fn state(&self) -> SessionState {
        match self {
            Session::Disconnected => SessionState::Disconnected,
            Session::Connected { .. } => SessionState::Connected,
            Session::Authenticated { .. } => SessionState::Authenticated,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Session::Disconnected => None,
            Session::Connected { session_id } | Session::Authenticated { session_id, .. } => {
                Some(session_id)
            }
        }
    }

    /// The logged-in user, defined only while authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Session::Authenticated { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// The held session identifier, or a state error naming `operation`.
    fn require_session_id(&self, operation: &'static str) -> Result<&str> {
        self.session_id().ok_or(ClientError::State {
            operation,
            state: self.state(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    sessid: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    sessid: String,
    user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    uid: UserId,
}

/// Drives the session lifecycle over a transport.
///
/// Holds only immutable configuration; session state lives in the
/// [`Session`] snapshots passed in and out.
pub struct SessionManager<T> {
    config: ConnectionConfig,
    /// The signer, or why signed calls are unavailable.
    signer: std::result::Result<AuthSigner, String>,
    transport: T,
}

impl<T: RpcTransport> SessionManager<T> {
    /// Creates a manager. Signed operations are available only when `config`
    /// carries both a secret and an application identifier.
    pub fn new(config: ConnectionConfig, transport: T) -> Self {
        let signer = match (config.secret(), config.app_id()) {
            (Some(secret), Some(app_id)) => AuthSigner::new(secret, app_id).map_err(|err| match err {
                ClientError::Validation(reason) => reason,
                other => other.to_string(),
            }),
            _ => Err("no application secret and identifier configured".to_string()),
        };

        if let Err(reason) = &signer {
            tracing::debug!(endpoint = %config.endpoint(), reason = %reason, "Signed calls disabled");
        }
        tracing::debug!(
            endpoint = %config.endpoint(),
            signing = signer.is_ok(),
            "Created session manager"
        );

        Self {
            config,
            signer,
            transport,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// User operations on top of this manager.
    pub fn users(&self) -> UserService<'_, T> {
        UserService::new(self)
    }

    /// Opens an anonymous session with `system.connect`.
    pub async fn connect(&self, ctx: &CallContext) -> Result<Session> {
        let envelope = build_anonymous(methods::SYSTEM_CONNECT, &[]);
        let value = self.send(&envelope, ctx).await?;
        let response: ConnectResponse = value.decode(methods::SYSTEM_CONNECT)?;

        tracing::info!(session_id = %response.sessid, "Connected");

        Ok(Session::Connected {
            session_id: response.sessid,
        })
    }

    /// Logs in on the held session. Re-login while authenticated is allowed.
    ///
    /// The service may rotate the session identifier; the returned snapshot
    /// carries whatever identifier it answered with.
    pub async fn login(
        &self,
        session: &Session,
        username: &str,
        password: &str,
        ctx: &CallContext,
    ) -> Result<Session> {
        session.require_session_id("login")?;

        if username.is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "login requires a username and a password".to_string(),
            ));
        }

        let args = [CallArgument::from(username), CallArgument::from(password)];
        let value = self
            .signed_call(session, methods::USER_LOGIN, &args, ctx)
            .await?;
        let response: LoginResponse = value.decode(methods::USER_LOGIN)?;

        if session.session_id() != Some(response.sessid.as_str()) {
            tracing::debug!("Session identifier rotated on login");
        }
        tracing::info!(user_id = %response.user.uid, "Logged in");

        Ok(Session::Authenticated {
            session_id: response.sessid,
            user_id: response.user.uid,
        })
    }

    /// Logs the current user out, keeping the session identifier.
    pub async fn logout(&self, session: &Session, ctx: &CallContext) -> Result<Session> {
        let Session::Authenticated { session_id, user_id } = session else {
            return Err(ClientError::State {
                operation: "logout",
                state: session.state(),
            });
        };

        self.signed_call(session, methods::USER_LOGOUT, &[], ctx)
            .await?;

        tracing::info!(user_id = %user_id, "Logged out");

        Ok(Session::Connected {
            session_id: session_id.clone(),
        })
    }

    /// Signs and sends `method` with `args` on the held session.
    ///
    /// Any state holding a session identifier is accepted; whether the
    /// operation needs a logged-in user is for the service to decide.
    pub async fn signed_call(
        &self,
        session: &Session,
        method: &str,
        args: &[CallArgument],
        ctx: &CallContext,
    ) -> Result<RpcValue> {
        let session_id = session.require_session_id("make a signed call")?;
        let signer = self
            .signer
            .as_ref()
            .map_err(|reason| ClientError::Validation(format!("{method} cannot be signed: {reason}")))?;

        // Minted right before sending; a retry by the caller mints again.
        let packet = signer.fresh_challenge(method)?;
        let envelope = build_signed(session_id, packet, args);

        self.send(&envelope, ctx).await
    }

    async fn send(&self, envelope: &protocol::CallEnvelope, ctx: &CallContext) -> Result<RpcValue> {
        let method = envelope.method();
        tracing::debug!(method, params = envelope.params().len(), "Sending call");

        match self.transport.call(envelope, ctx).await {
            Ok(RpcResponse::Success(value)) => Ok(value),
            Ok(RpcResponse::Fault(fault)) => {
                tracing::warn!(method, code = fault.code, message = %fault.message, "Remote fault");
                Err(ClientError::RemoteFault {
                    method: method.to_string(),
                    code: fault.code,
                    message: fault.message,
                })
            }
            Err(err) => {
                if err.is_connection_loss() {
                    tracing::warn!(method, error = %err, "Connection lost");
                } else {
                    tracing::debug!(method, error = %err, "Transport error");
                }
                Err(err.into())
            }
        }
    }
}
