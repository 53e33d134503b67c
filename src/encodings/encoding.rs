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

//! Contains all supported page encoders.
//!
//! A page writer accumulates encoded values in an in-memory buffer;
//! once the buffer reaches the target page size it asks the page
//! manager for a page, flushes the buffer into it and starts over.
//! `flush()` forces out the final partial page. An encoder that never
//! received a value flushes nothing, so empty streams occupy no pages.

use std::cell::RefCell;
use std::rc::Rc;

use byteorder::{LittleEndian, WriteBytesExt};

use basic::ColumnEncoding;
use column::page::PageIndexKey;
use errors::Result;
use file::page_manager::PageManager;
use util::bit_util;

/// Target size of a full page buffer. The final page of a stream may be
/// smaller.
pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024;

/// Push-style encoder for a stream of unsigned integers. Repetition
/// and definition levels as well as all integer-typed value streams go
/// through this trait; the concrete encoding is chosen at writer
/// construction time.
pub trait UnsignedIntPageWriter {
  /// Appends one value to the stream.
  fn append_value(&mut self, value: u64) -> Result<()>;

  /// Flushes the final partial page.
  fn flush(&mut self) -> Result<()>;

  fn encoding(&self) -> ColumnEncoding;
}

/// Builds the value page writer for an integer-typed column.
pub fn make_unsigned_int_page_writer(
  storage_type: ColumnEncoding,
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey
) -> Result<Box<UnsignedIntPageWriter>> {
  let writer: Box<UnsignedIntPageWriter> = match storage_type {
    ColumnEncoding::UINT32_BITPACKED => {
      Box::new(BitPackedIntPageWriter::new(page_mgr, key))
    },
    ColumnEncoding::UINT32_PLAIN => {
      Box::new(UInt32PageWriter::new(page_mgr, key))
    },
    ColumnEncoding::UINT64_PLAIN => {
      Box::new(UInt64PageWriter::new(page_mgr, key))
    },
    ColumnEncoding::UINT64_LEB128 => {
      Box::new(LEB128PageWriter::new(page_mgr, key))
    },
    e => {
      return Err(unsupported_err!("{} is not an unsigned int encoding", e));
    }
  };
  Ok(writer)
}

/// Allocates a page for `buf` and writes it. No-op for an empty buffer.
fn write_page(
  page_mgr: &Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: &[u8],
  num_values: u32
) -> Result<()> {
  if buf.is_empty() {
    return Ok(());
  }
  let mut mgr = page_mgr.borrow_mut();
  let page = mgr.allocate(key, buf.len() as u32)?;
  mgr.write(&page, buf, num_values)
}

// ----------------------------------------------------------------------
// UINT32_BITPACKED

/// Packs unsigned 32-bit values in groups of 128 at a fixed bit width.
/// The raw values of the current page are buffered so that the width
/// can be derived from the page's true maximum when the page is
/// flushed; the final partial group is zero-padded. Each page starts
/// with its bit width as a `u32`.
pub struct BitPackedIntPageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  values: Vec<u32>
}

impl BitPackedIntPageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    BitPackedIntPageWriter { page_mgr: page_mgr, key: key, values: Vec::new() }
  }

  fn flush_page(&mut self) -> Result<()> {
    if self.values.is_empty() {
      return Ok(());
    }
    let max_value = self.values.iter().cloned().max().unwrap_or(0) as u64;
    let maxbits = bit_util::num_required_bits(max_value);

    let mut buf = Vec::with_capacity(4 + self.values.len() * maxbits as usize / 8);
    buf.write_u32::<LittleEndian>(maxbits)?;
    for chunk in self.values.chunks(bit_util::BITPACK_GROUP_SIZE) {
      bit_util::pack_group(chunk, maxbits, &mut buf);
    }

    write_page(&self.page_mgr, self.key, &buf, self.values.len() as u32)?;
    self.values.clear();
    Ok(())
  }
}

impl UnsignedIntPageWriter for BitPackedIntPageWriter {
  fn append_value(&mut self, value: u64) -> Result<()> {
    if value > ::std::u32::MAX as u64 {
      return Err(argument_err!("value {} does not fit UINT32_BITPACKED", value));
    }
    self.values.push(value as u32);
    if self.values.len() * 4 >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn encoding(&self) -> ColumnEncoding {
    ColumnEncoding::UINT32_BITPACKED
  }
}

// ----------------------------------------------------------------------
// UINT32_PLAIN

pub struct UInt32PageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl UInt32PageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    UInt32PageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

impl UnsignedIntPageWriter for UInt32PageWriter {
  fn append_value(&mut self, value: u64) -> Result<()> {
    if value > ::std::u32::MAX as u64 {
      return Err(argument_err!("value {} does not fit UINT32_PLAIN", value));
    }
    self.buf.write_u32::<LittleEndian>(value as u32)?;
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn encoding(&self) -> ColumnEncoding {
    ColumnEncoding::UINT32_PLAIN
  }
}

// ----------------------------------------------------------------------
// UINT64_PLAIN

pub struct UInt64PageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl UInt64PageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    UInt64PageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

impl UnsignedIntPageWriter for UInt64PageWriter {
  fn append_value(&mut self, value: u64) -> Result<()> {
    self.buf.write_u64::<LittleEndian>(value)?;
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn encoding(&self) -> ColumnEncoding {
    ColumnEncoding::UINT64_PLAIN
  }
}

// ----------------------------------------------------------------------
// UINT64_LEB128

pub struct LEB128PageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl LEB128PageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    LEB128PageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

impl UnsignedIntPageWriter for LEB128PageWriter {
  fn append_value(&mut self, value: u64) -> Result<()> {
    bit_util::write_leb128(&mut self.buf, value);
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn encoding(&self) -> ColumnEncoding {
    ColumnEncoding::UINT64_LEB128
  }
}

// ----------------------------------------------------------------------
// FLOAT_IEEE754

/// Encodes 64-bit IEEE 754 floats back to back, little-endian.
pub struct DoublePageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl DoublePageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    DoublePageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  pub fn append_value(&mut self, value: f64) -> Result<()> {
    self.buf.write_f64::<LittleEndian>(value)?;
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

// ----------------------------------------------------------------------
// BOOLEAN_BITPACKED

/// Encodes booleans one bit per value, LSB first within each byte. The
/// final byte of a page is zero-padded.
pub struct BooleanPageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl BooleanPageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    BooleanPageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  pub fn append_value(&mut self, value: bool) -> Result<()> {
    let bit = self.num_values % 8;
    if bit == 0 {
      self.buf.push(0);
    }
    if value {
      let last = self.buf.len() - 1;
      self.buf[last] |= 1 << bit;
    }
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

// ----------------------------------------------------------------------
// STRING_PLAIN

/// Encodes strings as a LEB128 byte length followed by the raw bytes.
pub struct StringPageWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  key: PageIndexKey,
  buf: Vec<u8>,
  num_values: u32
}

impl StringPageWriter {
  pub fn new(page_mgr: Rc<RefCell<PageManager>>, key: PageIndexKey) -> Self {
    StringPageWriter { page_mgr: page_mgr, key: key, buf: Vec::new(), num_values: 0 }
  }

  pub fn append_value(&mut self, value: &str) -> Result<()> {
    bit_util::write_leb128(&mut self.buf, value.len() as u64);
    self.buf.extend_from_slice(value.as_bytes());
    self.num_values += 1;
    if self.buf.len() >= DEFAULT_PAGE_SIZE {
      self.flush_page()?;
    }
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.flush_page()
  }

  fn flush_page(&mut self) -> Result<()> {
    write_page(&self.page_mgr, self.key, &self.buf, self.num_values)?;
    self.buf.clear();
    self.num_values = 0;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use byteorder::ByteOrder;
  use file::page_manager::Device;

  fn memory_page_manager() -> Rc<RefCell<PageManager>> {
    Rc::new(RefCell::new(PageManager::new(Device::Memory(Vec::new()), 0)))
  }

  fn read_single_page(
    page_mgr: &Rc<RefCell<PageManager>>,
    key: PageIndexKey
  ) -> (Vec<u8>, u32) {
    let mgr = page_mgr.borrow();
    let pages = mgr.pages(key);
    assert_eq!(pages.len(), 1);
    let data = mgr.read(&pages[0].page).unwrap();
    (data, pages[0].logical_length)
  }

  #[test]
  fn test_bitpacked_page_layout() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(1);
    let mut writer = BitPackedIntPageWriter::new(page_mgr.clone(), key);
    for &v in [3u64, 1, 4, 1, 5, 9, 2, 6].iter() {
      writer.append_value(v).unwrap();
    }
    writer.flush().unwrap();

    let (data, values) = read_single_page(&page_mgr, key);
    assert_eq!(values, 8);
    // max value 9 needs 4 bits; one full zero-padded group of 128
    assert_eq!(LittleEndian::read_u32(&data[0..4]), 4);
    let group_end = 4 + ::util::bit_util::group_byte_len(4);
    let mut decoded = [0u32; ::util::bit_util::BITPACK_GROUP_SIZE];
    assert!(::util::bit_util::unpack_group(&data[4..group_end], 4, &mut decoded));
    assert_eq!(&decoded[..8], &[3, 1, 4, 1, 5, 9, 2, 6]);
    assert!(data[group_end..].iter().all(|&b| b == 0));
  }

  #[test]
  fn test_bitpacked_rejects_oversized_values() {
    let page_mgr = memory_page_manager();
    let mut writer =
      BitPackedIntPageWriter::new(page_mgr.clone(), PageIndexKey::values(1));
    assert!(writer.append_value(::std::u32::MAX as u64).is_ok());
    assert!(writer.append_value(::std::u32::MAX as u64 + 1).is_err());
  }

  #[test]
  fn test_empty_stream_writes_no_pages() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(1);
    let mut writer = LEB128PageWriter::new(page_mgr.clone(), key);
    writer.flush().unwrap();
    assert_eq!(page_mgr.borrow().pages(key).len(), 0);
  }

  #[test]
  fn test_uint64_plain_layout() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(2);
    let mut writer = UInt64PageWriter::new(page_mgr.clone(), key);
    writer.append_value(1).unwrap();
    writer.append_value(::std::u64::MAX).unwrap();
    writer.flush().unwrap();

    let (data, values) = read_single_page(&page_mgr, key);
    assert_eq!(values, 2);
    assert_eq!(LittleEndian::read_u64(&data[0..8]), 1);
    assert_eq!(LittleEndian::read_u64(&data[8..16]), ::std::u64::MAX);
  }

  #[test]
  fn test_string_length_prefixes() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(3);
    let mut writer = StringPageWriter::new(page_mgr.clone(), key);
    writer.append_value("a").unwrap();
    writer.append_value("bb").unwrap();
    writer.flush().unwrap();

    let (data, values) = read_single_page(&page_mgr, key);
    assert_eq!(values, 2);
    assert_eq!(&data[..5], &[1, b'a', 2, b'b', b'b']);
  }

  #[test]
  fn test_boolean_bitmap_layout() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(4);
    let mut writer = BooleanPageWriter::new(page_mgr.clone(), key);
    for &b in [true, false, false, true, true, false, false, false, true].iter() {
      writer.append_value(b).unwrap();
    }
    writer.flush().unwrap();

    let (data, values) = read_single_page(&page_mgr, key);
    assert_eq!(values, 9);
    assert_eq!(data[0], 0b0001_1001);
    assert_eq!(data[1], 0b0000_0001);
  }

  #[test]
  fn test_make_unsigned_int_page_writer_dispatch() {
    let page_mgr = memory_page_manager();
    let key = PageIndexKey::values(1);
    for &encoding in [
      ColumnEncoding::UINT32_BITPACKED,
      ColumnEncoding::UINT32_PLAIN,
      ColumnEncoding::UINT64_PLAIN,
      ColumnEncoding::UINT64_LEB128
    ].iter() {
      let writer =
        make_unsigned_int_page_writer(encoding, page_mgr.clone(), key).unwrap();
      assert_eq!(writer.encoding(), encoding);
    }
    assert!(
      make_unsigned_int_page_writer(
        ColumnEncoding::STRING_PLAIN, page_mgr.clone(), key).is_err());
  }
}
