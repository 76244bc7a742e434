//! User lifecycle operations: create, read, update and delete.

use std::collections::BTreeMap;
use std::fmt;

use protocol::{methods, CallArgument, CallContext, Record, Result, RpcTransport, RpcValue, Scalar};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::{Session, SessionManager};

/// Identifier the service assigns to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for Scalar {
    fn from(id: UserId) -> Self {
        Scalar::Int(id.0)
    }
}

impl From<UserId> for CallArgument {
    fn from(id: UserId) -> Self {
        CallArgument::Scalar(id.into())
    }
}

// Services return identifiers either as integers or as numeric strings.
impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(UserId(id)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(UserId)
                .map_err(|_| D::Error::custom(format!("invalid user id '{text}'"))),
        }
    }
}

/// A user as returned by `user.get`.
///
/// Only `uid`, `name` and `mail` are interpreted; every other field the
/// service returns is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// User operations, each a single signed call on the given session.
///
/// Any session holding an identifier is accepted. The service decides
/// whether an operation needs a logged-in user.
pub struct UserService<'a, T> {
    manager: &'a SessionManager<T>,
}

impl<'a, T: RpcTransport> UserService<'a, T> {
    pub fn new(manager: &'a SessionManager<T>) -> Self {
        Self { manager }
    }

    /// Creates a user and returns the identifier the service assigned.
    pub async fn create(
        &self,
        session: &Session,
        name: &str,
        pass: &str,
        mail: &str,
        ctx: &CallContext,
    ) -> Result<UserId> {
        let account = Record::new()
            .field("name", name)
            .field("pass", pass)
            .field("mail", mail);

        let value = self
            .manager
            .signed_call(session, methods::USER_SAVE, &[CallArgument::from(account)], ctx)
            .await?;

        // Some services wrap the new identifier in a struct.
        let id_value = match value {
            RpcValue::Struct(mut members) => members
                .remove("uid")
                .unwrap_or(RpcValue::Struct(members)),
            other => other,
        };
        let user_id: UserId = id_value.decode(methods::USER_SAVE)?;

        tracing::info!(user_id = %user_id, name, "Created user");
        Ok(user_id)
    }

    /// Replaces name, password and mail of an existing user.
    pub async fn update(
        &self,
        session: &Session,
        user_id: UserId,
        name: &str,
        pass: &str,
        mail: &str,
        ctx: &CallContext,
    ) -> Result<()> {
        let account = Record::new()
            .field("uid", user_id)
            .field("name", name)
            .field("pass", pass)
            .field("mail", mail);

        self.manager
            .signed_call(session, methods::USER_SAVE, &[CallArgument::from(account)], ctx)
            .await?;

        tracing::info!(user_id = %user_id, "Updated user");
        Ok(())
    }

    pub async fn delete(&self, session: &Session, user_id: UserId, ctx: &CallContext) -> Result<()> {
        self.manager
            .signed_call(session, methods::USER_DELETE, &[CallArgument::from(user_id)], ctx)
            .await?;

        tracing::info!(user_id = %user_id, "Deleted user");
        Ok(())
    }

    /// Fetches the full record of a user.
    pub async fn get(&self, session: &Session, user_id: UserId, ctx: &CallContext) -> Result<UserRecord> {
        let value: RpcValue = self
            .manager
            .signed_call(session, methods::USER_GET, &[CallArgument::from(user_id)], ctx)
            .await?;

        value.decode(methods::USER_GET)
    }
}
