//! # UserRPC Client Library
//!
//! Session lifecycle and user operations against a user-management RPC
//! service that authenticates every privileged call with a per-call
//! HMAC signature.
//!
//! ## Overview
//!
//! - **Sessions**: connect, login and logout as immutable [`Session`] snapshots
//! - **Users**: create, read, update and delete through [`UserService`]
//! - **Shared handle**: [`SharedClient`] serializes calls from many tasks
//! - **Configuration**: TOML file with environment overrides
//!
//! The wire encoding and HTTP transport are supplied by the caller as an
//! implementation of [`protocol::RpcTransport`].
//!
//! ## Lifecycle
//!
//! ```text
//!  Disconnected ──connect──▶ Connected ──login──▶ Authenticated
//!        ▲                      ▲                      │
//!        │                      └───────logout─────────┘
//!        └──── connection loss (detected by the caller)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use client::{ConnectionConfig, SessionManager, UserId};
//! use client::testing::ScriptedTransport;
//! use protocol::CallContext;
//!
//! # async fn run() -> protocol::Result<()> {
//! let config = ConnectionConfig::new("users.example.com", "services/xmlrpc")?
//!     .with_credentials("shared-secret", "users.example.com");
//! let manager = SessionManager::new(config, ScriptedTransport::new());
//! let ctx = CallContext::new();
//!
//! let session = manager.connect(&ctx).await?;
//! let session = manager.login(&session, "bob", "pw", &ctx).await?;
//! let record = manager.users().get(&session, UserId(42), &ctx).await?;
//! println!("{} <{}>", record.name, record.mail);
//! let _session = manager.logout(&session, &ctx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Connection settings and configuration file loading
//! - [`session`]: Session snapshots and the lifecycle manager
//! - [`users`]: User operations and records
//! - [`shared`]: Mutex-guarded handle for concurrent callers
//! - [`testing`]: Scripted in-memory transport

pub mod config;
pub mod session;
pub mod shared;
pub mod testing;
pub mod users;

// Re-export protocol for convenience
pub use protocol;

pub use config::{ClientConfig, ConfigError, ConnectionConfig, DEFAULT_PORT};
pub use session::{Session, SessionManager};
pub use shared::SharedClient;
pub use users::{UserId, UserRecord, UserService};
