//! User preferences.
//!
//! Preferences are a flat map from string keys to scalar or list values.
//! They are persisted as a JSON object and decoded strictly: objects and
//! nulls anywhere in the value tree are rejected rather than coerced.
//! Non-finite floats have no JSON form and are refused before encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CaidenceError;

/// A single preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<PreferenceValue>),
}

impl From<bool> for PreferenceValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PreferenceValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for PreferenceValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PreferenceValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PreferenceValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<PreferenceValue>> From<Vec<T>> for PreferenceValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(BTreeMap<String, PreferenceValue>);

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<PreferenceValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PreferenceValue)> {
        self.0.iter()
    }

    /// Decode a stored JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CaidenceError> {
        if !value.is_object() {
            return Err(CaidenceError::Validation {
                message: "preferences must be a JSON object".into(),
            });
        }
        serde_json::from_value(value).map_err(|e| CaidenceError::Validation {
            message: format!("invalid preferences: {e}"),
        })
    }

    /// Encode for storage. Fails if any float (including inside a list)
    /// is NaN or infinite.
    pub fn to_json(&self) -> Result<serde_json::Value, CaidenceError> {
        if let Some((key, _)) = self.0.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CaidenceError::Validation {
                message: format!("preference {key:?} holds a non-finite number"),
            });
        }
        serde_json::to_value(self).map_err(|e| CaidenceError::Validation {
            message: format!("invalid preferences: {e}"),
        })
    }
}

impl PreferenceValue {
    fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::List(items) => items.iter().all(Self::is_finite),
            _ => true,
        }
    }
}

impl FromIterator<(String, PreferenceValue)> for Preferences {
    fn from_iter<I: IntoIterator<Item = (String, PreferenceValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
