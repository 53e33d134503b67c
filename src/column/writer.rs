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

//! Contains the per-column triple writer.

use std::cell::RefCell;
use std::rc::Rc;

use basic::{ColumnEncoding, ColumnType};
use column::page::PageIndexKey;
use encodings::encoding::{
  make_unsigned_int_page_writer, BitPackedIntPageWriter, BooleanPageWriter,
  DoublePageWriter, StringPageWriter, UnsignedIntPageWriter
};
use errors::Result;
use file::page_manager::PageManager;
use record::api::Value;
use schema::ColumnConfig;
use util::bit_util;

/// The value sub-stream of a column writer, chosen by storage encoding
/// when the writer is built.
enum ValuePageWriter {
  UnsignedInt(Box<UnsignedIntPageWriter>),
  Double(DoublePageWriter),
  Boolean(BooleanPageWriter),
  String(StringPageWriter)
}

/// Writes the `(rlvl, dlvl, value)` triples of one leaf column into up
/// to three page streams: repetition levels (present iff
/// `rlevel_max > 0`), definition levels (present iff `dlevel_max > 0`)
/// and values.
///
/// A value is written iff `dlvl == dlevel_max`; `write_null` writes
/// levels only and requires `dlvl < dlevel_max`. The writer counts
/// triples and record boundaries (`rlvl == 0`) so the table writer can
/// validate the row count at commit.
pub struct ColumnWriter {
  config: ColumnConfig,
  rlevel_writer: Option<BitPackedIntPageWriter>,
  dlevel_writer: Option<BitPackedIntPageWriter>,
  value_writer: ValuePageWriter,
  num_values: u64,
  num_boundaries: u64
}

impl ColumnWriter {
  pub fn new(
    config: ColumnConfig,
    page_mgr: &Rc<RefCell<PageManager>>
  ) -> Result<ColumnWriter> {
    config.validate()?;

    let rlevel_writer = if config.rlevel_max > 0 {
      Some(BitPackedIntPageWriter::new(
        page_mgr.clone(), PageIndexKey::rlevel(config.column_id)))
    } else {
      None
    };

    let dlevel_writer = if config.dlevel_max > 0 {
      Some(BitPackedIntPageWriter::new(
        page_mgr.clone(), PageIndexKey::dlevel(config.column_id)))
    } else {
      None
    };

    let values_key = PageIndexKey::values(config.column_id);
    let value_writer = match config.storage_type {
      ColumnEncoding::BOOLEAN_BITPACKED => {
        ValuePageWriter::Boolean(BooleanPageWriter::new(page_mgr.clone(), values_key))
      },
      ColumnEncoding::FLOAT_IEEE754 => {
        ValuePageWriter::Double(DoublePageWriter::new(page_mgr.clone(), values_key))
      },
      ColumnEncoding::STRING_PLAIN => {
        ValuePageWriter::String(StringPageWriter::new(page_mgr.clone(), values_key))
      },
      storage => {
        ValuePageWriter::UnsignedInt(
          make_unsigned_int_page_writer(storage, page_mgr.clone(), values_key)?)
      }
    };

    Ok(ColumnWriter {
      config: config,
      rlevel_writer: rlevel_writer,
      dlevel_writer: dlevel_writer,
      value_writer: value_writer,
      num_values: 0,
      num_boundaries: 0
    })
  }

  /// Writes a triple without a value. Requires `dlvl < dlevel_max`; on
  /// a required column (`dlevel_max == 0`) there is no way to express
  /// an absent value.
  pub fn write_null(&mut self, rlvl: u64, dlvl: u64) -> Result<()> {
    if dlvl >= self.config.dlevel_max {
      return Err(argument_err!(
        "column '{}': writing null requires a definition level below {}",
        self.config.column_name, self.config.dlevel_max));
    }
    self.write_levels(rlvl, dlvl)
  }

  pub fn write_boolean(&mut self, rlvl: u64, dlvl: u64, value: bool) -> Result<()> {
    self.check_logical_type(ColumnType::BOOLEAN)?;
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      match self.value_writer {
        ValuePageWriter::Boolean(ref mut w) => w.append_value(value)?,
        _ => return Err(argument_err!("column value writer is not boolean"))
      }
    }
    Ok(())
  }

  pub fn write_unsigned_int(&mut self, rlvl: u64, dlvl: u64, value: u64) -> Result<()> {
    if self.config.logical_type != ColumnType::UNSIGNED_INT &&
       self.config.logical_type != ColumnType::DATETIME {
      return Err(argument_err!(
        "column '{}' of type {} does not take unsigned int values",
        self.config.column_name, self.config.logical_type));
    }
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      self.append_unsigned(value)?;
    }
    Ok(())
  }

  /// Signed values are zigzag-mapped onto the unsigned storage
  /// encoding so that small magnitudes stay small.
  pub fn write_signed_int(&mut self, rlvl: u64, dlvl: u64, value: i64) -> Result<()> {
    self.check_logical_type(ColumnType::SIGNED_INT)?;
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      let encoded = bit_util::zigzag_encode(value);
      self.append_unsigned(encoded)?;
    }
    Ok(())
  }

  pub fn write_float(&mut self, rlvl: u64, dlvl: u64, value: f64) -> Result<()> {
    self.check_logical_type(ColumnType::FLOAT)?;
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      match self.value_writer {
        ValuePageWriter::Double(ref mut w) => w.append_value(value)?,
        _ => return Err(argument_err!("column value writer is not float"))
      }
    }
    Ok(())
  }

  pub fn write_string(&mut self, rlvl: u64, dlvl: u64, value: &str) -> Result<()> {
    self.check_logical_type(ColumnType::STRING)?;
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      match self.value_writer {
        ValuePageWriter::String(ref mut w) => w.append_value(value)?,
        _ => return Err(argument_err!("column value writer is not string"))
      }
    }
    Ok(())
  }

  /// Writes a datetime as microseconds since the UNIX epoch.
  pub fn write_datetime(&mut self, rlvl: u64, dlvl: u64, value: u64) -> Result<()> {
    self.check_logical_type(ColumnType::DATETIME)?;
    self.write_levels(rlvl, dlvl)?;
    if dlvl == self.config.dlevel_max {
      self.append_unsigned(value)?;
    }
    Ok(())
  }

  /// Generic entry point for record shredders: dispatches on the value
  /// variant.
  pub fn write_value(&mut self, rlvl: u64, dlvl: u64, value: &Value) -> Result<()> {
    match *value {
      Value::Null => self.write_null(rlvl, dlvl),
      Value::Boolean(v) => self.write_boolean(rlvl, dlvl, v),
      Value::UnsignedInt(v) => self.write_unsigned_int(rlvl, dlvl, v),
      Value::SignedInt(v) => self.write_signed_int(rlvl, dlvl, v),
      Value::Float(v) => self.write_float(rlvl, dlvl, v),
      Value::String(ref v) => self.write_string(rlvl, dlvl, v),
      Value::DateTime(v) => self.write_datetime(rlvl, dlvl, v)
    }
  }

  /// Flushes the final partial page of every sub-stream.
  pub fn flush(&mut self) -> Result<()> {
    if let Some(ref mut w) = self.rlevel_writer {
      w.flush()?;
    }
    if let Some(ref mut w) = self.dlevel_writer {
      w.flush()?;
    }
    match self.value_writer {
      ValuePageWriter::UnsignedInt(ref mut w) => w.flush(),
      ValuePageWriter::Double(ref mut w) => w.flush(),
      ValuePageWriter::Boolean(ref mut w) => w.flush(),
      ValuePageWriter::String(ref mut w) => w.flush()
    }
  }

  pub fn column_type(&self) -> ColumnType {
    self.config.logical_type
  }

  pub fn encoding(&self) -> ColumnEncoding {
    self.config.storage_type
  }

  pub fn max_repetition_level(&self) -> u64 {
    self.config.rlevel_max
  }

  pub fn max_definition_level(&self) -> u64 {
    self.config.dlevel_max
  }

  pub fn config(&self) -> &ColumnConfig {
    &self.config
  }

  /// Total triples written so far.
  pub fn num_values(&self) -> u64 {
    self.num_values
  }

  /// Record boundaries written so far, i.e. triples with `rlvl == 0`.
  pub fn num_record_boundaries(&self) -> u64 {
    self.num_boundaries
  }

  fn write_levels(&mut self, rlvl: u64, dlvl: u64) -> Result<()> {
    if rlvl > self.config.rlevel_max {
      return Err(argument_err!(
        "column '{}': repetition level {} exceeds maximum {}",
        self.config.column_name, rlvl, self.config.rlevel_max));
    }
    if dlvl > self.config.dlevel_max {
      return Err(argument_err!(
        "column '{}': definition level {} exceeds maximum {}",
        self.config.column_name, dlvl, self.config.dlevel_max));
    }
    if let Some(ref mut w) = self.rlevel_writer {
      w.append_value(rlvl)?;
    }
    if let Some(ref mut w) = self.dlevel_writer {
      w.append_value(dlvl)?;
    }
    self.num_values += 1;
    if rlvl == 0 {
      self.num_boundaries += 1;
    }
    Ok(())
  }

  fn check_logical_type(&self, expected: ColumnType) -> Result<()> {
    if self.config.logical_type != expected {
      return Err(argument_err!(
        "column '{}' is of type {}, not {}",
        self.config.column_name, self.config.logical_type, expected));
    }
    Ok(())
  }

  fn append_unsigned(&mut self, value: u64) -> Result<()> {
    match self.value_writer {
      ValuePageWriter::UnsignedInt(ref mut w) => w.append_value(value),
      _ => Err(argument_err!("column value writer is not an unsigned int"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use basic::PageIndexEntryType;
  use errors::CSTableError;
  use file::page_manager::Device;

  fn memory_page_manager() -> Rc<RefCell<PageManager>> {
    Rc::new(RefCell::new(PageManager::new(Device::Memory(Vec::new()), 0)))
  }

  fn writer_for(
    logical: ColumnType,
    storage: ColumnEncoding,
    rmax: u64,
    dmax: u64
  ) -> (ColumnWriter, Rc<RefCell<PageManager>>) {
    let page_mgr = memory_page_manager();
    let config = ColumnConfig::new(1, "col", logical, storage, rmax, dmax).unwrap();
    let writer = ColumnWriter::new(config, &page_mgr).unwrap();
    (writer, page_mgr)
  }

  #[test]
  fn test_level_streams_follow_level_maxima() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 1, 2);
    writer.write_string(0, 2, "x").unwrap();
    writer.write_string(1, 2, "y").unwrap();
    writer.write_null(0, 0).unwrap();
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    assert_eq!(mgr.pages(PageIndexKey::rlevel(1)).len(), 1);
    assert_eq!(mgr.pages(PageIndexKey::dlevel(1)).len(), 1);
    assert_eq!(mgr.pages(PageIndexKey::values(1)).len(), 1);
    assert_eq!(mgr.pages(PageIndexKey::values(1))[0].logical_length, 2);
  }

  #[test]
  fn test_required_flat_column_has_no_level_streams() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT32_BITPACKED, 0, 0);
    for &v in [3u64, 1, 4, 1, 5, 9, 2, 6].iter() {
      writer.write_unsigned_int(0, 0, v).unwrap();
    }
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    assert_eq!(mgr.pages(PageIndexKey::rlevel(1)).len(), 0);
    assert_eq!(mgr.pages(PageIndexKey::dlevel(1)).len(), 0);
    assert_eq!(mgr.pages(PageIndexKey::values(1)).len(), 1);
    assert_eq!(writer.num_record_boundaries(), 8);
    assert_eq!(writer.num_values(), 8);
  }

  #[test]
  fn test_null_only_column_has_empty_value_stream() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_LEB128, 0, 1);
    writer.write_null(0, 0).unwrap();
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    assert_eq!(mgr.pages(PageIndexKey::values(1)).len(), 0);
    assert_eq!(mgr.pages(PageIndexKey::dlevel(1)).len(), 1);
    assert_eq!(writer.num_values(), 1);
  }

  #[test]
  fn test_level_bounds_are_validated() {
    let (mut writer, _page_mgr) = writer_for(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_PLAIN, 1, 2);
    match writer.write_unsigned_int(2, 0, 1) {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other)
    }
    match writer.write_unsigned_int(0, 3, 1) {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other)
    }
    // nothing was recorded by the failed writes
    assert_eq!(writer.num_values(), 0);
  }

  #[test]
  fn test_null_on_required_column_is_rejected() {
    let (mut writer, _page_mgr) = writer_for(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_PLAIN, 0, 0);
    match writer.write_null(0, 0) {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other)
    }
  }

  #[test]
  fn test_type_mismatch_is_rejected() {
    let (mut writer, _page_mgr) = writer_for(
      ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 0, 0);
    match writer.write_unsigned_int(0, 0, 1) {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other)
    }
  }

  #[test]
  fn test_datetime_is_unsigned_sugar() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::DATETIME, ColumnEncoding::UINT64_LEB128, 0, 0);
    writer.write_datetime(0, 0, 1467331200000000).unwrap();
    writer.write_unsigned_int(0, 0, 1467331200000001).unwrap();
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    assert_eq!(mgr.pages(PageIndexKey::values(1))[0].logical_length, 2);
  }

  #[test]
  fn test_write_value_dispatch() {
    let (mut writer, _page_mgr) = writer_for(
      ColumnType::SIGNED_INT, ColumnEncoding::UINT64_LEB128, 0, 1);
    writer.write_value(0, 1, &Value::SignedInt(-17)).unwrap();
    writer.write_value(0, 0, &Value::Null).unwrap();
    match writer.write_value(0, 1, &Value::Boolean(true)) {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other)
    }
    assert_eq!(writer.num_values(), 2);
    assert_eq!(writer.num_record_boundaries(), 2);
  }

  #[test]
  fn test_value_only_written_at_max_definition_level() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::FLOAT, ColumnEncoding::FLOAT_IEEE754, 0, 2);
    writer.write_float(0, 2, 1.5).unwrap();
    writer.write_float(0, 1, 2.5).unwrap();
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    // the second write is below dlevel_max, so only one value is stored
    assert_eq!(mgr.pages(PageIndexKey::values(1))[0].logical_length, 1);
    assert_eq!(mgr.pages(PageIndexKey::dlevel(1))[0].logical_length, 2);
  }

  #[test]
  fn test_entry_types_of_streams() {
    let (mut writer, page_mgr) = writer_for(
      ColumnType::BOOLEAN, ColumnEncoding::BOOLEAN_BITPACKED, 1, 1);
    writer.write_boolean(0, 1, true).unwrap();
    writer.flush().unwrap();

    let mgr = page_mgr.borrow();
    let types: Vec<PageIndexEntryType> =
      mgr.entries().iter().map(|e| e.key.entry_type).collect();
    assert!(types.contains(&PageIndexEntryType::VALUES));
    assert!(types.contains(&PageIndexEntryType::RLEVEL));
    assert!(types.contains(&PageIndexEntryType::DLEVEL));
  }
}
