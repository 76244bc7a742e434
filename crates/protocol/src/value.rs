//! Argument and result values for remote calls.
//!
//! Arguments are deliberately flat: a [`CallArgument`] is either a single
//! [`Scalar`] or a [`Record`] whose fields are scalars. A record holding a
//! record cannot be constructed. Results come back as [`RpcValue`], which may
//! nest, and are decoded into typed structs with serde.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{ClientError, Result};

/// A single typed scalar argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A flat record of named scalar fields, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing an earlier field of the same name.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a field in place, replacing an earlier field of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One positional argument of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgument {
    Scalar(Scalar),
    Record(Record),
}

macro_rules! scalar_argument {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CallArgument {
                fn from(value: $ty) -> Self {
                    CallArgument::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_argument!(&str, String, i64, i32, f64, bool);

impl From<Scalar> for CallArgument {
    fn from(scalar: Scalar) -> Self {
        CallArgument::Scalar(scalar)
    }
}

impl From<Record> for CallArgument {
    fn from(record: Record) -> Self {
        CallArgument::Record(record)
    }
}

impl CallArgument {
    /// Converts the argument into the transport's value representation.
    pub fn to_rpc_value(&self) -> RpcValue {
        match self {
            CallArgument::Scalar(scalar) => RpcValue::from(scalar.clone()),
            CallArgument::Record(record) => RpcValue::Struct(
                record
                    .iter()
                    .map(|(name, value)| (name.to_string(), RpcValue::from(value.clone())))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<JsonValue> for CallArgument {
    type Error = ClientError;

    /// Accepts a JSON scalar or an object of scalars. Anything deeper is
    /// rejected rather than flattened.
    fn try_from(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => {
                let mut record = Record::new();
                for (name, field) in map {
                    let scalar = json_scalar(field).map_err(|found| {
                        ClientError::Validation(format!(
                            "record field '{name}' must be a scalar, found {found}"
                        ))
                    })?;
                    record.insert(name, scalar);
                }
                Ok(CallArgument::Record(record))
            }
            other => json_scalar(other).map(CallArgument::Scalar).map_err(|found| {
                ClientError::Validation(format!(
                    "call argument must be a scalar or a flat record, found {found}"
                ))
            }),
        }
    }
}

fn json_scalar(value: JsonValue) -> std::result::Result<Scalar, &'static str> {
    match value {
        JsonValue::String(s) => Ok(Scalar::String(s)),
        JsonValue::Bool(b) => Ok(Scalar::Bool(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Scalar::Int(i)),
            None => n.as_f64().map(Scalar::Double).ok_or("an unrepresentable number"),
        },
        JsonValue::Null => Err("null"),
        JsonValue::Array(_) => Err("an array"),
        JsonValue::Object(_) => Err("a nested record"),
    }
}

/// A value as exchanged with the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<RpcValue>),
    Struct(BTreeMap<String, RpcValue>),
}

impl From<Scalar> for RpcValue {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::String(s) => RpcValue::String(s),
            Scalar::Int(i) => RpcValue::Int(i),
            Scalar::Double(d) => RpcValue::Double(d),
            Scalar::Bool(b) => RpcValue::Bool(b),
        }
    }
}

impl RpcValue {
    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RpcValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a member of a struct value.
    pub fn get(&self, key: &str) -> Option<&RpcValue> {
        match self {
            RpcValue::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Builds a struct value from `(name, value)` pairs.
    pub fn structure<K, I>(members: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, RpcValue)>,
    {
        RpcValue::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Decodes the value into a typed response for `method`.
    pub fn decode<T: DeserializeOwned>(self, method: &str) -> Result<T> {
        serde_json::from_value(JsonValue::from(self))
            .map_err(|err| ClientError::malformed(method, err.to_string()))
    }
}

impl From<&str> for RpcValue {
    fn from(value: &str) -> Self {
        RpcValue::String(value.to_string())
    }
}

impl From<i64> for RpcValue {
    fn from(value: i64) -> Self {
        RpcValue::Int(value)
    }
}

impl From<RpcValue> for JsonValue {
    fn from(value: RpcValue) -> Self {
        match value {
            RpcValue::Nil => JsonValue::Null,
            RpcValue::Bool(b) => JsonValue::Bool(b),
            RpcValue::Int(i) => JsonValue::from(i),
            // Non-finite doubles have no JSON form.
            RpcValue::Double(d) => serde_json::Number::from_f64(d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            RpcValue::String(s) => JsonValue::String(s),
            RpcValue::Array(items) => JsonValue::Array(items.into_iter().map(Into::into).collect()),
            RpcValue::Struct(members) => JsonValue::Object(
                members
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}
