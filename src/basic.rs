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

//! Contains the basic enums shared across the file format: logical
//! column types, storage encodings, page index entry types and the
//! binary format versions, together with their on-disk ids.

use std::fmt;

use errors::Result;

// ----------------------------------------------------------------------
// Logical column types

/// The logical type of a leaf column, i.e. the type callers read and
/// write through column readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ColumnType {
  BOOLEAN,
  UNSIGNED_INT,
  SIGNED_INT,
  FLOAT,
  STRING,
  DATETIME
}

impl ColumnType {
  /// On-disk id of this logical type.
  pub fn id(&self) -> u8 {
    match *self {
      ColumnType::BOOLEAN => 1,
      ColumnType::UNSIGNED_INT => 2,
      ColumnType::SIGNED_INT => 3,
      ColumnType::FLOAT => 4,
      ColumnType::STRING => 5,
      ColumnType::DATETIME => 6
    }
  }

  pub fn from_id(id: u8) -> Result<ColumnType> {
    match id {
      1 => Ok(ColumnType::BOOLEAN),
      2 => Ok(ColumnType::UNSIGNED_INT),
      3 => Ok(ColumnType::SIGNED_INT),
      4 => Ok(ColumnType::FLOAT),
      5 => Ok(ColumnType::STRING),
      6 => Ok(ColumnType::DATETIME),
      _ => Err(format_err!("unknown logical column type: {}", id))
    }
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

// ----------------------------------------------------------------------
// Storage encodings

/// The storage encoding of one column value stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ColumnEncoding {
  BOOLEAN_BITPACKED,
  UINT32_BITPACKED,
  UINT32_PLAIN,
  UINT64_PLAIN,
  UINT64_LEB128,
  FLOAT_IEEE754,
  STRING_PLAIN
}

impl ColumnEncoding {
  /// On-disk id of this encoding.
  pub fn id(&self) -> u8 {
    match *self {
      ColumnEncoding::BOOLEAN_BITPACKED => 1,
      ColumnEncoding::UINT32_BITPACKED => 2,
      ColumnEncoding::UINT32_PLAIN => 3,
      ColumnEncoding::UINT64_PLAIN => 4,
      ColumnEncoding::UINT64_LEB128 => 5,
      ColumnEncoding::FLOAT_IEEE754 => 6,
      ColumnEncoding::STRING_PLAIN => 7
    }
  }

  pub fn from_id(id: u8) -> Result<ColumnEncoding> {
    match id {
      1 => Ok(ColumnEncoding::BOOLEAN_BITPACKED),
      2 => Ok(ColumnEncoding::UINT32_BITPACKED),
      3 => Ok(ColumnEncoding::UINT32_PLAIN),
      4 => Ok(ColumnEncoding::UINT64_PLAIN),
      5 => Ok(ColumnEncoding::UINT64_LEB128),
      6 => Ok(ColumnEncoding::FLOAT_IEEE754),
      7 => Ok(ColumnEncoding::STRING_PLAIN),
      _ => Err(unsupported_err!("unknown storage encoding: {}", id))
    }
  }
}

impl fmt::Display for ColumnEncoding {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}

// ----------------------------------------------------------------------
// Page index entry types

/// Which of a column's three logical streams a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageIndexEntryType {
  VALUES,
  RLEVEL,
  DLEVEL
}

impl PageIndexEntryType {
  pub fn id(&self) -> u8 {
    match *self {
      PageIndexEntryType::VALUES => 1,
      PageIndexEntryType::RLEVEL => 2,
      PageIndexEntryType::DLEVEL => 3
    }
  }

  pub fn from_id(id: u8) -> Result<PageIndexEntryType> {
    match id {
      1 => Ok(PageIndexEntryType::VALUES),
      2 => Ok(PageIndexEntryType::RLEVEL),
      3 => Ok(PageIndexEntryType::DLEVEL),
      _ => Err(format_err!("unknown page index entry type: {}", id))
    }
  }
}

// ----------------------------------------------------------------------
// Binary format versions

/// On-disk format version of a table file.
///
/// `v0_1_0` files store each column as one contiguous body slice and are
/// read-only in this implementation. `v0_2_0` files reach their pages
/// through a page index and alternate between two checksummed metablock
/// slots on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BinaryFormatVersion {
  v0_1_0,
  v0_2_0
}

impl BinaryFormatVersion {
  /// `(version_major, version_minor)` as stored in the file header.
  pub fn version_numbers(&self) -> (u16, u16) {
    match *self {
      BinaryFormatVersion::v0_1_0 => (0, 1),
      BinaryFormatVersion::v0_2_0 => (0, 2)
    }
  }

  pub fn from_version_numbers(major: u16, minor: u16) -> Result<BinaryFormatVersion> {
    match (major, minor) {
      (0, 1) => Ok(BinaryFormatVersion::v0_1_0),
      (0, 2) => Ok(BinaryFormatVersion::v0_2_0),
      _ => Err(format_err!("unknown binary format version: {}.{}", major, minor))
    }
  }
}

impl fmt::Display for BinaryFormatVersion {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let (major, minor) = self.version_numbers();
    write!(f, "v{}.{}.0", major, minor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_column_type_ids() {
    let all = [
      ColumnType::BOOLEAN,
      ColumnType::UNSIGNED_INT,
      ColumnType::SIGNED_INT,
      ColumnType::FLOAT,
      ColumnType::STRING,
      ColumnType::DATETIME
    ];
    for (i, t) in all.iter().enumerate() {
      assert_eq!(t.id() as usize, i + 1);
      assert_eq!(ColumnType::from_id(t.id()).unwrap(), *t);
    }
    assert!(ColumnType::from_id(0).is_err());
    assert!(ColumnType::from_id(7).is_err());
  }

  #[test]
  fn test_column_encoding_ids() {
    let all = [
      ColumnEncoding::BOOLEAN_BITPACKED,
      ColumnEncoding::UINT32_BITPACKED,
      ColumnEncoding::UINT32_PLAIN,
      ColumnEncoding::UINT64_PLAIN,
      ColumnEncoding::UINT64_LEB128,
      ColumnEncoding::FLOAT_IEEE754,
      ColumnEncoding::STRING_PLAIN
    ];
    for (i, e) in all.iter().enumerate() {
      assert_eq!(e.id() as usize, i + 1);
      assert_eq!(ColumnEncoding::from_id(e.id()).unwrap(), *e);
    }
    match ColumnEncoding::from_id(42) {
      Err(::errors::CSTableError::UnsupportedEncoding(_)) => {},
      other => panic!("expected UnsupportedEncoding, got {:?}", other)
    }
  }

  #[test]
  fn test_format_versions() {
    assert_eq!(
      BinaryFormatVersion::from_version_numbers(0, 1).unwrap(),
      BinaryFormatVersion::v0_1_0);
    assert_eq!(
      BinaryFormatVersion::from_version_numbers(0, 2).unwrap(),
      BinaryFormatVersion::v0_2_0);
    assert!(BinaryFormatVersion::from_version_numbers(1, 0).is_err());
    assert_eq!(format!("{}", BinaryFormatVersion::v0_2_0), "v0.2.0");
  }
}
