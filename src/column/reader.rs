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

//! Contains the per-column triple reader.

use basic::{ColumnEncoding, ColumnType};
use column::page::PageSource;
use encodings::decoding::{
  make_unsigned_int_page_reader, BitPackedIntPageReader, BooleanPageReader,
  DoublePageReader, StringPageReader, UnsignedIntPageReader
};
use errors::Result;
use record::api::Value;
use schema::ColumnConfig;
use util::bit_util;

/// The value sub-stream of a column reader: one typed decoder per
/// logical type, chosen when the column is opened.
pub trait ValueReader {
  type T;

  fn read_value(&mut self) -> Result<Self::T>;
  fn eof_reached(&self) -> bool;
  fn rewind(&mut self) -> Result<()>;
}

impl ValueReader for Box<UnsignedIntPageReader> {
  type T = u64;

  fn read_value(&mut self) -> Result<u64> {
    (**self).read_unsigned_int()
  }

  fn eof_reached(&self) -> bool {
    (**self).eof_reached()
  }

  fn rewind(&mut self) -> Result<()> {
    (**self).rewind()
  }
}

impl ValueReader for DoublePageReader {
  type T = f64;

  fn read_value(&mut self) -> Result<f64> {
    self.read_double()
  }

  fn eof_reached(&self) -> bool {
    DoublePageReader::eof_reached(self)
  }

  fn rewind(&mut self) -> Result<()> {
    DoublePageReader::rewind(self)
  }
}

impl ValueReader for BooleanPageReader {
  type T = bool;

  fn read_value(&mut self) -> Result<bool> {
    self.read_boolean()
  }

  fn eof_reached(&self) -> bool {
    BooleanPageReader::eof_reached(self)
  }

  fn rewind(&mut self) -> Result<()> {
    BooleanPageReader::rewind(self)
  }
}

impl ValueReader for StringPageReader {
  type T = String;

  fn read_value(&mut self) -> Result<String> {
    self.read_string()
  }

  fn eof_reached(&self) -> bool {
    StringPageReader::eof_reached(self)
  }

  fn rewind(&mut self) -> Result<()> {
    StringPageReader::rewind(self)
  }
}

/// Unsigned storage decoded back into signed values via the zigzag
/// mapping.
pub struct SignedIntValueReader {
  inner: Box<UnsignedIntPageReader>
}

impl ValueReader for SignedIntValueReader {
  type T = i64;

  fn read_value(&mut self) -> Result<i64> {
    let encoded = self.inner.read_unsigned_int()?;
    Ok(bit_util::zigzag_decode(encoded))
  }

  fn eof_reached(&self) -> bool {
    self.inner.eof_reached()
  }

  fn rewind(&mut self) -> Result<()> {
    self.inner.rewind()
  }
}

// ----------------------------------------------------------------------
// Generic column reader

/// Reads the `(rlvl, dlvl, value)` triples of one leaf column back out
/// of its page streams. Sub-streams that were never written (level
/// maxima of zero) read as constant zero; a value is consumed iff
/// `dlvl == dlevel_max`.
pub struct ColumnReaderImpl<V: ValueReader> {
  config: ColumnConfig,
  rlevel_reader: Option<BitPackedIntPageReader>,
  dlevel_reader: Option<BitPackedIntPageReader>,
  value_reader: V
}

impl<V: ValueReader> ColumnReaderImpl<V> {
  pub fn new(
    config: ColumnConfig,
    rlevel_reader: Option<BitPackedIntPageReader>,
    dlevel_reader: Option<BitPackedIntPageReader>,
    value_reader: V
  ) -> ColumnReaderImpl<V> {
    ColumnReaderImpl {
      config: config,
      rlevel_reader: rlevel_reader,
      dlevel_reader: dlevel_reader,
      value_reader: value_reader
    }
  }

  /// Reads the next triple and advances one position.
  pub fn next(&mut self) -> Result<(u64, u64, Option<V::T>)> {
    let rlvl = match self.rlevel_reader {
      Some(ref mut r) => r.read_unsigned_int()?,
      None => 0
    };
    let dlvl = match self.dlevel_reader {
      Some(ref mut r) => r.read_unsigned_int()?,
      None => 0
    };
    let value = if dlvl == self.config.dlevel_max {
      Some(self.value_reader.read_value()?)
    } else {
      None
    };
    Ok((rlvl, dlvl, value))
  }

  /// The next repetition and definition levels, without consuming.
  pub fn peek(&self) -> Result<(u64, u64)> {
    let rlvl = match self.rlevel_reader {
      Some(ref r) => r.peek()?,
      None => 0
    };
    let dlvl = match self.dlevel_reader {
      Some(ref r) => r.peek()?,
      None => 0
    };
    Ok((rlvl, dlvl))
  }

  pub fn eof(&self) -> bool {
    if let Some(ref r) = self.rlevel_reader {
      return r.eof_reached();
    }
    if let Some(ref r) = self.dlevel_reader {
      return r.eof_reached();
    }
    self.value_reader.eof_reached()
  }

  pub fn rewind(&mut self) -> Result<()> {
    if let Some(ref mut r) = self.rlevel_reader {
      r.rewind()?;
    }
    if let Some(ref mut r) = self.dlevel_reader {
      r.rewind()?;
    }
    self.value_reader.rewind()
  }

  pub fn config(&self) -> &ColumnConfig {
    &self.config
  }
}

// ----------------------------------------------------------------------
// Dispatch

/// A column reader for any logical type. The variant is fixed when the
/// column is opened, so per-column scan loops stay monomorphic.
pub enum ColumnReader {
  BooleanColumnReader(ColumnReaderImpl<BooleanPageReader>),
  UnsignedIntColumnReader(ColumnReaderImpl<Box<UnsignedIntPageReader>>),
  SignedIntColumnReader(ColumnReaderImpl<SignedIntValueReader>),
  FloatColumnReader(ColumnReaderImpl<DoublePageReader>),
  StringColumnReader(ColumnReaderImpl<StringPageReader>)
}

/// Builds the column reader for `config` over the given page sources,
/// dispatching on the logical type. Level readers exist iff the
/// corresponding source is given.
pub fn get_column_reader(
  config: ColumnConfig,
  rlevel_source: Option<PageSource>,
  dlevel_source: Option<PageSource>,
  value_source: PageSource
) -> Result<ColumnReader> {
  let rlevel_reader = match rlevel_source {
    Some(source) => Some(BitPackedIntPageReader::new(source)?),
    None => None
  };
  let dlevel_reader = match dlevel_source {
    Some(source) => Some(BitPackedIntPageReader::new(source)?),
    None => None
  };

  let reader = match config.logical_type {
    ColumnType::BOOLEAN => {
      ColumnReader::BooleanColumnReader(ColumnReaderImpl::new(
        config, rlevel_reader, dlevel_reader, BooleanPageReader::new(value_source)?))
    },
    ColumnType::UNSIGNED_INT | ColumnType::DATETIME => {
      let values = make_unsigned_int_page_reader(config.storage_type, value_source)?;
      ColumnReader::UnsignedIntColumnReader(ColumnReaderImpl::new(
        config, rlevel_reader, dlevel_reader, values))
    },
    ColumnType::SIGNED_INT => {
      let inner = make_unsigned_int_page_reader(config.storage_type, value_source)?;
      ColumnReader::SignedIntColumnReader(ColumnReaderImpl::new(
        config, rlevel_reader, dlevel_reader, SignedIntValueReader { inner: inner }))
    },
    ColumnType::FLOAT => {
      ColumnReader::FloatColumnReader(ColumnReaderImpl::new(
        config, rlevel_reader, dlevel_reader, DoublePageReader::new(value_source)?))
    },
    ColumnType::STRING => {
      ColumnReader::StringColumnReader(ColumnReaderImpl::new(
        config, rlevel_reader, dlevel_reader, StringPageReader::new(value_source)?))
    }
  };
  Ok(reader)
}

impl ColumnReader {
  /// Reads the next triple as a generic [`Value`].
  pub fn next(&mut self) -> Result<(u64, u64, Option<Value>)> {
    match *self {
      ColumnReader::BooleanColumnReader(ref mut r) => {
        let (rlvl, dlvl, v) = r.next()?;
        Ok((rlvl, dlvl, v.map(Value::Boolean)))
      },
      ColumnReader::UnsignedIntColumnReader(ref mut r) => {
        let datetime = r.config().logical_type == ColumnType::DATETIME;
        let (rlvl, dlvl, v) = r.next()?;
        let v = v.map(|x| if datetime { Value::DateTime(x) } else { Value::UnsignedInt(x) });
        Ok((rlvl, dlvl, v))
      },
      ColumnReader::SignedIntColumnReader(ref mut r) => {
        let (rlvl, dlvl, v) = r.next()?;
        Ok((rlvl, dlvl, v.map(Value::SignedInt)))
      },
      ColumnReader::FloatColumnReader(ref mut r) => {
        let (rlvl, dlvl, v) = r.next()?;
        Ok((rlvl, dlvl, v.map(Value::Float)))
      },
      ColumnReader::StringColumnReader(ref mut r) => {
        let (rlvl, dlvl, v) = r.next()?;
        Ok((rlvl, dlvl, v.map(Value::String)))
      }
    }
  }

  pub fn peek(&self) -> Result<(u64, u64)> {
    match *self {
      ColumnReader::BooleanColumnReader(ref r) => r.peek(),
      ColumnReader::UnsignedIntColumnReader(ref r) => r.peek(),
      ColumnReader::SignedIntColumnReader(ref r) => r.peek(),
      ColumnReader::FloatColumnReader(ref r) => r.peek(),
      ColumnReader::StringColumnReader(ref r) => r.peek()
    }
  }

  pub fn rewind(&mut self) -> Result<()> {
    match *self {
      ColumnReader::BooleanColumnReader(ref mut r) => r.rewind(),
      ColumnReader::UnsignedIntColumnReader(ref mut r) => r.rewind(),
      ColumnReader::SignedIntColumnReader(ref mut r) => r.rewind(),
      ColumnReader::FloatColumnReader(ref mut r) => r.rewind(),
      ColumnReader::StringColumnReader(ref mut r) => r.rewind()
    }
  }

  pub fn eof(&self) -> bool {
    match *self {
      ColumnReader::BooleanColumnReader(ref r) => r.eof(),
      ColumnReader::UnsignedIntColumnReader(ref r) => r.eof(),
      ColumnReader::SignedIntColumnReader(ref r) => r.eof(),
      ColumnReader::FloatColumnReader(ref r) => r.eof(),
      ColumnReader::StringColumnReader(ref r) => r.eof()
    }
  }

  pub fn config(&self) -> &ColumnConfig {
    match *self {
      ColumnReader::BooleanColumnReader(ref r) => r.config(),
      ColumnReader::UnsignedIntColumnReader(ref r) => r.config(),
      ColumnReader::SignedIntColumnReader(ref r) => r.config(),
      ColumnReader::FloatColumnReader(ref r) => r.config(),
      ColumnReader::StringColumnReader(ref r) => r.config()
    }
  }

  pub fn column_type(&self) -> ColumnType {
    self.config().logical_type
  }

  pub fn encoding(&self) -> ColumnEncoding {
    self.config().storage_type
  }

  // Typed accessors; hot paths match the variant once and use these.

  pub fn next_boolean(&mut self) -> Result<(u64, u64, Option<bool>)> {
    match *self {
      ColumnReader::BooleanColumnReader(ref mut r) => r.next(),
      _ => Err(argument_err!("not a boolean column"))
    }
  }

  pub fn next_unsigned_int(&mut self) -> Result<(u64, u64, Option<u64>)> {
    match *self {
      ColumnReader::UnsignedIntColumnReader(ref mut r) => r.next(),
      _ => Err(argument_err!("not an unsigned int column"))
    }
  }

  pub fn next_signed_int(&mut self) -> Result<(u64, u64, Option<i64>)> {
    match *self {
      ColumnReader::SignedIntColumnReader(ref mut r) => r.next(),
      _ => Err(argument_err!("not a signed int column"))
    }
  }

  pub fn next_float(&mut self) -> Result<(u64, u64, Option<f64>)> {
    match *self {
      ColumnReader::FloatColumnReader(ref mut r) => r.next(),
      _ => Err(argument_err!("not a float column"))
    }
  }

  pub fn next_string(&mut self) -> Result<(u64, u64, Option<String>)> {
    match *self {
      ColumnReader::StringColumnReader(ref mut r) => r.next(),
      _ => Err(argument_err!("not a string column"))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  use rand::{thread_rng, Rng};

  use column::page::{PageIndexKey, PageSource};
  use column::writer::ColumnWriter;
  use file::page_manager::{Device, PageManager};

  fn memory_page_manager() -> Rc<RefCell<PageManager>> {
    Rc::new(RefCell::new(PageManager::new(Device::Memory(Vec::new()), 0)))
  }

  /// Writes a triple sequence through a column writer and checks that a
  /// column reader yields it back unchanged.
  struct ColumnRoundTripTester {
    config: ColumnConfig,
    page_mgr: Rc<RefCell<PageManager>>
  }

  impl ColumnRoundTripTester {
    fn new(
      logical: ColumnType,
      storage: ColumnEncoding,
      rmax: u64,
      dmax: u64
    ) -> ColumnRoundTripTester {
      let config = ColumnConfig::new(1, "col", logical, storage, rmax, dmax).unwrap();
      ColumnRoundTripTester { config: config, page_mgr: memory_page_manager() }
    }

    fn run(&mut self, triples: &[(u64, u64, Value)]) {
      {
        let mut writer = ColumnWriter::new(self.config.clone(), &self.page_mgr).unwrap();
        for &(rlvl, dlvl, ref value) in triples {
          writer.write_value(rlvl, dlvl, value).unwrap();
        }
        writer.flush().unwrap();
      }

      let mut reader = self.open_reader();
      for pass in 0..2 {
        for &(rlvl, dlvl, ref value) in triples {
          assert!(!reader.eof(), "eof before triple on pass {}", pass);
          let (peek_rlvl, peek_dlvl) = reader.peek().unwrap();
          assert_eq!((peek_rlvl, peek_dlvl), (rlvl, dlvl));
          let (got_rlvl, got_dlvl, got_value) = reader.next().unwrap();
          assert_eq!((got_rlvl, got_dlvl), (rlvl, dlvl));
          match *value {
            Value::Null => assert_eq!(got_value, None),
            ref v => assert_eq!(got_value.as_ref(), Some(v))
          }
        }
        assert!(reader.eof(), "no eof after last triple on pass {}", pass);
        reader.rewind().unwrap();
      }
    }

    fn open_reader(&self) -> ColumnReader {
      let rlevel_source = if self.config.rlevel_max > 0 {
        Some(PageSource::managed(&self.page_mgr, PageIndexKey::rlevel(1)))
      } else {
        None
      };
      let dlevel_source = if self.config.dlevel_max > 0 {
        Some(PageSource::managed(&self.page_mgr, PageIndexKey::dlevel(1)))
      } else {
        None
      };
      let value_source = PageSource::managed(&self.page_mgr, PageIndexKey::values(1));
      get_column_reader(
        self.config.clone(), rlevel_source, dlevel_source, value_source).unwrap()
    }
  }

  #[test]
  fn test_roundtrip_flat_uints() {
    let triples: Vec<(u64, u64, Value)> = [3u64, 1, 4, 1, 5, 9, 2, 6]
      .iter()
      .map(|&v| (0, 0, Value::UnsignedInt(v)))
      .collect();
    ColumnRoundTripTester::new(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT32_BITPACKED, 0, 0)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_optional_string() {
    let triples = vec![
      (0, 1, Value::String("a".to_string())),
      (0, 0, Value::Null),
      (0, 1, Value::String("bb".to_string()))
    ];
    ColumnRoundTripTester::new(
      ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 0, 1)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_repeated_nested_strings() {
    let triples = vec![
      (0, 2, Value::String("x".to_string())),
      (1, 2, Value::String("y".to_string())),
      (0, 0, Value::Null)
    ];
    ColumnRoundTripTester::new(
      ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 1, 2)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_signed_ints() {
    let triples = vec![
      (0, 0, Value::SignedInt(0)),
      (0, 0, Value::SignedInt(-1)),
      (0, 0, Value::SignedInt(::std::i64::MIN)),
      (0, 0, Value::SignedInt(::std::i64::MAX))
    ];
    ColumnRoundTripTester::new(
      ColumnType::SIGNED_INT, ColumnEncoding::UINT64_LEB128, 0, 0)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_booleans() {
    let triples = vec![
      (0, 1, Value::Boolean(true)),
      (0, 1, Value::Boolean(false)),
      (0, 0, Value::Null),
      (0, 1, Value::Boolean(true))
    ];
    ColumnRoundTripTester::new(
      ColumnType::BOOLEAN, ColumnEncoding::BOOLEAN_BITPACKED, 0, 1)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_floats() {
    let triples = vec![
      (0, 0, Value::Float(3.25)),
      (0, 0, Value::Float(-0.5)),
      (0, 0, Value::Float(1e300))
    ];
    ColumnRoundTripTester::new(
      ColumnType::FLOAT, ColumnEncoding::FLOAT_IEEE754, 0, 0)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_datetimes() {
    let triples = vec![
      (0, 0, Value::DateTime(0)),
      (0, 0, Value::DateTime(1467331200000000))
    ];
    ColumnRoundTripTester::new(
      ColumnType::DATETIME, ColumnEncoding::UINT64_PLAIN, 0, 0)
      .run(&triples);
  }

  #[test]
  fn test_roundtrip_random_levels() {
    let mut rng = thread_rng();
    let rmax = 3u64;
    let dmax = 4u64;
    let mut triples: Vec<(u64, u64, Value)> = Vec::new();
    for i in 0..2000 {
      // each record starts at rlvl 0; later triples repeat at a random level
      let rlvl = if i % 5 == 0 { 0 } else { rng.gen_range(0, rmax + 1) };
      let dlvl = rng.gen_range(0, dmax + 1);
      let value = if dlvl == dmax {
        Value::UnsignedInt(rng.gen_range(0, 1 << 20))
      } else {
        Value::Null
      };
      triples.push((rlvl, dlvl, value));
    }
    ColumnRoundTripTester::new(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT32_BITPACKED, rmax, dmax)
      .run(&triples);
  }

  #[test]
  fn test_null_only_record() {
    let triples = vec![(0, 0, Value::Null)];
    ColumnRoundTripTester::new(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT32_BITPACKED, 0, 1)
      .run(&triples);
  }

  #[test]
  fn test_typed_accessor_mismatch() {
    let mut tester = ColumnRoundTripTester::new(
      ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_PLAIN, 0, 0);
    tester.run(&[(0, 0, Value::UnsignedInt(7))]);
    let mut reader = tester.open_reader();
    assert!(reader.next_string().is_err());
    assert_eq!(reader.next_unsigned_int().unwrap(), (0, 0, Some(7)));
  }

  #[test]
  fn test_reader_reports_config() {
    let mut tester = ColumnRoundTripTester::new(
      ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 0, 1);
    tester.run(&[(0, 1, Value::String("v".to_string()))]);
    let reader = tester.open_reader();
    assert_eq!(reader.column_type(), ColumnType::STRING);
    assert_eq!(reader.encoding(), ColumnEncoding::STRING_PLAIN);
  }
}
