//! Submitted records: an ordered mapping from field name to scalar value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ─── Scalar ──────────────────────────────────────────────────────────────────

/// A single field value. Only flat values can be stored in a ledger cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
  Bool(bool),
  Number(serde_json::Number),
  Text(String),
  Null,
}

impl Scalar {
  /// Render as a ledger cell.
  pub fn to_cell(&self) -> String {
    match self {
      Self::Bool(b) => b.to_string(),
      Self::Number(n) => n.to_string(),
      Self::Text(s) => s.clone(),
      Self::Null => String::new(),
    }
  }

  /// `true` for null and for text that is empty after trimming.
  pub fn is_blank(&self) -> bool {
    match self {
      Self::Null => true,
      Self::Text(s) => s.trim().is_empty(),
      _ => false,
    }
  }
}

impl From<&str> for Scalar {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for Scalar {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for Scalar {
  fn from(n: i64) -> Self { Self::Number(n.into()) }
}

impl From<bool> for Scalar {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("field {0:?} is not a scalar value")]
pub struct NotScalar(pub String);

/// Field names in first-seen order with their values.
///
/// Inserting a name that is already present replaces its value in place, so
/// the order a caller supplied is what the ledger header will follow.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Record {
  fields: Vec<(String, Scalar)>,
}

impl Record {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
    let name = name.into();
    let value = value.into();
    match self.fields.iter_mut().find(|(n, _)| *n == name) {
      Some((_, v)) => *v = value,
      None => self.fields.push((name, value)),
    }
  }

  /// Builder-style [`insert`](Self::insert).
  pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
    self.insert(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&Scalar> {
    self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
    self.fields.iter().map(|(n, v)| (n.as_str(), v))
  }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl TryFrom<Map<String, Value>> for Record {
  type Error = NotScalar;

  fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
    let mut record = Record::new();
    for (name, value) in map {
      let scalar = match value {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(b),
        Value::Number(n) => Scalar::Number(n),
        Value::String(s) => Scalar::Text(s),
        Value::Array(_) | Value::Object(_) => return Err(NotScalar(name)),
      };
      record.insert(name, scalar);
    }
    Ok(record)
  }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Record {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut record = Record::new();
    for (k, v) in iter {
      record.insert(k, v);
    }
    record
  }
}
