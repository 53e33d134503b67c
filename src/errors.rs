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

//! Common error types and macros for this crate.

use std::io;
use std::result;

quick_error! {
  /// Errors surfaced by table readers, writers and codecs.
  ///
  /// Nothing in this crate retries internally; every fallible call
  /// returns one of these variants verbatim to the caller.
  #[derive(Debug, PartialEq)]
  pub enum CSTableError {
    /// An underlying read, write or sync failed.
    Io(message: String) {
      display("I/O error: {}", message)
      description("I/O error")
      from(e: io::Error) -> (format!("{}", e))
    }
    /// The file is malformed: bad magic, unknown version, corrupt
    /// footer or index.
    Format(message: String) {
      display("Malformed file: {}", message)
      description("malformed file")
    }
    /// The file uses a storage encoding this build does not know.
    UnsupportedEncoding(message: String) {
      display("Unsupported encoding: {}", message)
      description("unsupported encoding")
    }
    /// Encoded page bytes could not be decoded.
    Decode(message: String) {
      display("Decode error: {}", message)
      description("decode error")
    }
    /// A cross-column or cross-stream invariant does not hold.
    InvariantViolation(message: String) {
      display("Invariant violation: {}", message)
      description("invariant violation")
    }
    /// A column was looked up by a name the table does not contain.
    NotFound(message: String) {
      display("Not found: {}", message)
      description("not found")
    }
    /// An argument was out of range or of the wrong type.
    Argument(message: String) {
      display("Invalid argument: {}", message)
      description("invalid argument")
    }
  }
}

/// A specialized `Result` for all fallible operations in this crate.
pub type Result<T> = result::Result<T, CSTableError>;

// ----------------------------------------------------------------------
// Conversion macros, one per error kind

macro_rules! io_err {
  ($fmt:expr) => (::errors::CSTableError::Io($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::Io(format!($fmt, $($args),*)));
}

macro_rules! format_err {
  ($fmt:expr) => (::errors::CSTableError::Format($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::Format(format!($fmt, $($args),*)));
}

macro_rules! unsupported_err {
  ($fmt:expr) => (::errors::CSTableError::UnsupportedEncoding($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::UnsupportedEncoding(format!($fmt, $($args),*)));
}

macro_rules! decode_err {
  ($fmt:expr) => (::errors::CSTableError::Decode($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::Decode(format!($fmt, $($args),*)));
}

macro_rules! invariant_err {
  ($fmt:expr) => (::errors::CSTableError::InvariantViolation($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::InvariantViolation(format!($fmt, $($args),*)));
}

macro_rules! not_found_err {
  ($fmt:expr) => (::errors::CSTableError::NotFound($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::NotFound(format!($fmt, $($args),*)));
}

macro_rules! argument_err {
  ($fmt:expr) => (::errors::CSTableError::Argument($fmt.to_owned()));
  ($fmt:expr, $($args:expr),*) => (::errors::CSTableError::Argument(format!($fmt, $($args),*)));
}
