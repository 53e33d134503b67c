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

//! Contains the per-column schema configuration.

use basic::{ColumnEncoding, ColumnType};
use errors::Result;

/// Configuration of one leaf column.
///
/// `column_id` is a stable numeric id, greater than zero for columns of
/// page-indexed (v0.2) files; `column_name` is the dotted path of the
/// leaf field. `rlevel_max`/`dlevel_max` bound the repetition and
/// definition levels of every triple written to the column. The
/// `body_offset`/`body_size` pair locates the column body in legacy
/// v0.1 files and is zero otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
  pub column_id: u32,
  pub column_name: String,
  pub logical_type: ColumnType,
  pub storage_type: ColumnEncoding,
  pub rlevel_max: u64,
  pub dlevel_max: u64,
  pub body_offset: u64,
  pub body_size: u64
}

impl ColumnConfig {
  /// Creates a column config and validates the logical/storage type
  /// combination.
  pub fn new(
    column_id: u32,
    column_name: &str,
    logical_type: ColumnType,
    storage_type: ColumnEncoding,
    rlevel_max: u64,
    dlevel_max: u64
  ) -> Result<ColumnConfig> {
    let config = ColumnConfig {
      column_id: column_id,
      column_name: column_name.to_owned(),
      logical_type: logical_type,
      storage_type: storage_type,
      rlevel_max: rlevel_max,
      dlevel_max: dlevel_max,
      body_offset: 0,
      body_size: 0
    };
    config.validate()?;
    Ok(config)
  }

  /// Checks that the storage encoding can hold values of the logical
  /// type.
  pub fn validate(&self) -> Result<()> {
    if storage_matches(self.logical_type, self.storage_type) {
      Ok(())
    } else {
      Err(argument_err!(
        "column '{}': storage encoding {} cannot hold {} values",
        self.column_name, self.storage_type, self.logical_type))
    }
  }
}

/// Returns true if `storage` is a valid encoding for values of type
/// `logical`. Signed integers ride the unsigned encodings (zigzag
/// mapped); datetimes are microsecond epochs in the unsigned encodings.
pub fn storage_matches(logical: ColumnType, storage: ColumnEncoding) -> bool {
  match logical {
    ColumnType::BOOLEAN => storage == ColumnEncoding::BOOLEAN_BITPACKED,
    ColumnType::FLOAT => storage == ColumnEncoding::FLOAT_IEEE754,
    ColumnType::STRING => storage == ColumnEncoding::STRING_PLAIN,
    ColumnType::UNSIGNED_INT | ColumnType::SIGNED_INT | ColumnType::DATETIME => {
      match storage {
        ColumnEncoding::UINT32_BITPACKED |
        ColumnEncoding::UINT32_PLAIN |
        ColumnEncoding::UINT64_PLAIN |
        ColumnEncoding::UINT64_LEB128 => true,
        _ => false
      }
    }
  }
}
