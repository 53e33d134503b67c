// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Contains the Value enum that represents one materialized leaf value.

use std::fmt;

use basic::ColumnType;

/// A single leaf value as exchanged with record shredders and
/// assemblers. `Null` stands for an absent value, i.e. a triple whose
/// definition level is below the column's maximum.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Boolean(bool),
  UnsignedInt(u64),
  SignedInt(i64),
  Float(f64),
  String(String),
  /// Microseconds since the UNIX epoch.
  DateTime(u64)
}

impl Value {
  pub fn is_null(&self) -> bool {
    *self == Value::Null
  }

  /// The logical column type this value belongs to, or `None` for
  /// `Null` (which fits any optional column).
  pub fn column_type(&self) -> Option<ColumnType> {
    match *self {
      Value::Null => None,
      Value::Boolean(_) => Some(ColumnType::BOOLEAN),
      Value::UnsignedInt(_) => Some(ColumnType::UNSIGNED_INT),
      Value::SignedInt(_) => Some(ColumnType::SIGNED_INT),
      Value::Float(_) => Some(ColumnType::FLOAT),
      Value::String(_) => Some(ColumnType::STRING),
      Value::DateTime(_) => Some(ColumnType::DATETIME)
    }
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Value {
    Value::Boolean(v)
  }
}

impl From<u64> for Value {
  fn from(v: u64) -> Value {
    Value::UnsignedInt(v)
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Value {
    Value::SignedInt(v)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Value {
    Value::Float(v)
  }
}

impl From<String> for Value {
  fn from(v: String) -> Value {
    Value::String(v)
  }
}

impl<'a> From<&'a str> for Value {
  fn from(v: &'a str) -> Value {
    Value::String(v.to_owned())
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      Value::Null => write!(f, "null"),
      Value::Boolean(value) => write!(f, "{}", value),
      Value::UnsignedInt(value) => write!(f, "{}", value),
      Value::SignedInt(value) => write!(f, "{}", value),
      Value::Float(value) => write!(f, "{:?}", value),
      Value::String(ref value) => write!(f, "\"{}\"", value),
      Value::DateTime(value) => write!(f, "{}", value)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_null() {
    assert!(Value::Null.is_null());
    assert!(!Value::Boolean(false).is_null());
    assert!(!Value::UnsignedInt(0).is_null());
  }

  #[test]
  fn test_column_type() {
    assert_eq!(Value::Null.column_type(), None);
    assert_eq!(Value::Boolean(true).column_type(), Some(ColumnType::BOOLEAN));
    assert_eq!(Value::UnsignedInt(1).column_type(), Some(ColumnType::UNSIGNED_INT));
    assert_eq!(Value::SignedInt(-1).column_type(), Some(ColumnType::SIGNED_INT));
    assert_eq!(Value::Float(0.5).column_type(), Some(ColumnType::FLOAT));
    assert_eq!(
      Value::String("x".to_string()).column_type(),
      Some(ColumnType::STRING));
    assert_eq!(Value::DateTime(0).column_type(), Some(ColumnType::DATETIME));
  }

  #[test]
  fn test_from() {
    assert_eq!(Value::from(true), Value::Boolean(true));
    assert_eq!(Value::from(42u64), Value::UnsignedInt(42));
    assert_eq!(Value::from(-42i64), Value::SignedInt(-42));
    assert_eq!(Value::from(2.5f64), Value::Float(2.5));
    assert_eq!(Value::from("abc"), Value::String("abc".to_string()));
  }

  #[test]
  fn test_display() {
    assert_eq!(format!("{}", Value::Null), "null");
    assert_eq!(format!("{}", Value::Boolean(true)), "true");
    assert_eq!(format!("{}", Value::UnsignedInt(3)), "3");
    assert_eq!(format!("{}", Value::SignedInt(-4)), "-4");
    assert_eq!(format!("{}", Value::Float(5.0)), "5.0");
    assert_eq!(format!("{}", Value::Float(5.1234)), "5.1234");
    assert_eq!(format!("{}", Value::String("abc".to_string())), "\"abc\"");
    assert_eq!(format!("{}", Value::DateTime(12345678)), "12345678");
  }
}
