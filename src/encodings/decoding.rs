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

//! Contains all supported page decoders.
//!
//! Every decoder walks the ordered pages of one sub-stream through a
//! [`PageSource`] and keeps a one-value lookahead, so `peek()` never
//! consumes and `eof_reached()` is exact. Page boundaries are crossed
//! transparently; a page whose bytes run out before its logical value
//! count is served is a decode error. A decoder never reads past the
//! span of the current page.

use byteorder::{ByteOrder, LittleEndian};

use basic::ColumnEncoding;
use column::page::PageSource;
use errors::Result;
use util::bit_util;

/// Pull-style decoder for a stream of unsigned integers; the inverse of
/// `encoding::UnsignedIntPageWriter`. Repetition and definition levels
/// and all integer-typed value streams are read through this trait.
pub trait UnsignedIntPageReader {
  /// Returns the next value and advances the stream.
  fn read_unsigned_int(&mut self) -> Result<u64>;

  /// Returns the next value without advancing.
  fn peek(&self) -> Result<u64>;

  fn eof_reached(&self) -> bool;

  /// Returns the stream to its first value.
  fn rewind(&mut self) -> Result<()>;
}

/// Builds the value page reader for an integer-typed column.
pub fn make_unsigned_int_page_reader(
  storage_type: ColumnEncoding,
  source: PageSource
) -> Result<Box<UnsignedIntPageReader>> {
  let reader: Box<UnsignedIntPageReader> = match storage_type {
    ColumnEncoding::UINT32_BITPACKED => Box::new(BitPackedIntPageReader::new(source)?),
    ColumnEncoding::UINT32_PLAIN => Box::new(UInt32PageReader::new(source)?),
    ColumnEncoding::UINT64_PLAIN => Box::new(UInt64PageReader::new(source)?),
    ColumnEncoding::UINT64_LEB128 => Box::new(LEB128PageReader::new(source)?),
    e => {
      return Err(unsupported_err!("{} is not an unsigned int encoding", e));
    }
  };
  Ok(reader)
}

// ----------------------------------------------------------------------
// UINT32_BITPACKED

/// Decodes bitpacked pages: a `u32` bit width followed by zero-padded
/// groups of 128 values. Groups are unpacked into a 128-entry buffer
/// and served from there; padding values beyond the page's logical
/// length are never returned.
pub struct BitPackedIntPageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  maxbits: u32,
  outbuf: [u32; bit_util::BITPACK_GROUP_SIZE],
  outbuf_pos: usize,
  outbuf_len: usize,
  cur_val: Option<u64>
}

impl BitPackedIntPageReader {
  pub fn new(source: PageSource) -> Result<BitPackedIntPageReader> {
    let mut reader = BitPackedIntPageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      maxbits: 0,
      outbuf: [0; bit_util::BITPACK_GROUP_SIZE],
      outbuf_pos: 0,
      outbuf_len: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  /// Loads the next value into the lookahead slot, or clears it at the
  /// end of the stream.
  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        if self.outbuf_pos >= self.outbuf_len {
          self.fetch_next_batch()?;
        }
        let v = self.outbuf[self.outbuf_pos];
        self.outbuf_pos += 1;
        self.values_read += 1;
        self.cur_val = Some(v as u64);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      self.fetch_next_page()?;
    }
  }

  fn fetch_next_page(&mut self) -> Result<()> {
    let (data, values) = self.source.read_page(self.page_idx)?;
    self.page_idx += 1;
    if data.len() < 4 {
      return Err(decode_err!("bitpacked page shorter than its header"));
    }
    let maxbits = LittleEndian::read_u32(&data[0..4]);
    if maxbits > 32 {
      return Err(decode_err!("bitpacked page with invalid bit width {}", maxbits));
    }
    self.maxbits = maxbits;
    self.page_data = data;
    self.page_pos = 4;
    self.page_values = values;
    self.values_read = 0;
    self.outbuf_pos = 0;
    self.outbuf_len = 0;
    Ok(())
  }

  fn fetch_next_batch(&mut self) -> Result<()> {
    if self.maxbits == 0 {
      // all values of this page are zero, no group bytes on disk
      for slot in self.outbuf.iter_mut() {
        *slot = 0;
      }
    } else {
      let nbytes = bit_util::group_byte_len(self.maxbits);
      if self.page_pos + nbytes > self.page_data.len() {
        return Err(decode_err!(
          "bitpacked page truncated: group at {} needs {} bytes, {} left",
          self.page_pos, nbytes, self.page_data.len() - self.page_pos));
      }
      bit_util::unpack_group(
        &self.page_data[self.page_pos..self.page_pos + nbytes],
        self.maxbits,
        &mut self.outbuf);
      self.page_pos += nbytes;
    }
    self.outbuf_pos = 0;
    self.outbuf_len = bit_util::BITPACK_GROUP_SIZE;
    Ok(())
  }
}

impl UnsignedIntPageReader for BitPackedIntPageReader {
  fn read_unsigned_int(&mut self) -> Result<u64> {
    match self.cur_val {
      Some(v) => {
        // a decode failure ends the stream
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of bitpacked stream"))
    }
  }

  fn peek(&self) -> Result<u64> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of bitpacked stream"))
    }
  }

  fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.maxbits = 0;
    self.outbuf_pos = 0;
    self.outbuf_len = 0;
    self.cur_val = None;
    self.fetch_next()
  }
}

// ----------------------------------------------------------------------
// UINT32_PLAIN

pub struct UInt32PageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  cur_val: Option<u64>
}

impl UInt32PageReader {
  pub fn new(source: PageSource) -> Result<UInt32PageReader> {
    let mut reader = UInt32PageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        if self.page_pos + 4 > self.page_data.len() {
          return Err(decode_err!("uint32 page truncated at byte {}", self.page_pos));
        }
        let v = LittleEndian::read_u32(&self.page_data[self.page_pos..self.page_pos + 4]);
        self.page_pos += 4;
        self.values_read += 1;
        self.cur_val = Some(v as u64);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_pos = 0;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}

impl UnsignedIntPageReader for UInt32PageReader {
  fn read_unsigned_int(&mut self) -> Result<u64> {
    match self.cur_val {
      Some(v) => {
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of uint32 stream"))
    }
  }

  fn peek(&self) -> Result<u64> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of uint32 stream"))
    }
  }

  fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }
}

// ----------------------------------------------------------------------
// UINT64_PLAIN

pub struct UInt64PageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  cur_val: Option<u64>
}

impl UInt64PageReader {
  pub fn new(source: PageSource) -> Result<UInt64PageReader> {
    let mut reader = UInt64PageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        if self.page_pos + 8 > self.page_data.len() {
          return Err(decode_err!("uint64 page truncated at byte {}", self.page_pos));
        }
        let v = LittleEndian::read_u64(&self.page_data[self.page_pos..self.page_pos + 8]);
        self.page_pos += 8;
        self.values_read += 1;
        self.cur_val = Some(v);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_pos = 0;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}

impl UnsignedIntPageReader for UInt64PageReader {
  fn read_unsigned_int(&mut self) -> Result<u64> {
    match self.cur_val {
      Some(v) => {
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of uint64 stream"))
    }
  }

  fn peek(&self) -> Result<u64> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of uint64 stream"))
    }
  }

  fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }
}

// ----------------------------------------------------------------------
// UINT64_LEB128

pub struct LEB128PageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  cur_val: Option<u64>
}

impl LEB128PageReader {
  pub fn new(source: PageSource) -> Result<LEB128PageReader> {
    let mut reader = LEB128PageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        let v = match bit_util::read_leb128(&self.page_data, &mut self.page_pos) {
          Some(v) => v,
          None => {
            return Err(decode_err!("leb128 page truncated at byte {}", self.page_pos));
          }
        };
        self.values_read += 1;
        self.cur_val = Some(v);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_pos = 0;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}

impl UnsignedIntPageReader for LEB128PageReader {
  fn read_unsigned_int(&mut self) -> Result<u64> {
    match self.cur_val {
      Some(v) => {
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of leb128 stream"))
    }
  }

  fn peek(&self) -> Result<u64> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of leb128 stream"))
    }
  }

  fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }
}

// ----------------------------------------------------------------------
// FLOAT_IEEE754

pub struct DoublePageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  cur_val: Option<f64>
}

impl DoublePageReader {
  pub fn new(source: PageSource) -> Result<DoublePageReader> {
    let mut reader = DoublePageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  pub fn read_double(&mut self) -> Result<f64> {
    match self.cur_val {
      Some(v) => {
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of float stream"))
    }
  }

  pub fn peek(&self) -> Result<f64> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of float stream"))
    }
  }

  pub fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  pub fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        if self.page_pos + 8 > self.page_data.len() {
          return Err(decode_err!("float page truncated at byte {}", self.page_pos));
        }
        let v = LittleEndian::read_f64(&self.page_data[self.page_pos..self.page_pos + 8]);
        self.page_pos += 8;
        self.values_read += 1;
        self.cur_val = Some(v);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_pos = 0;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}

// ----------------------------------------------------------------------
// BOOLEAN_BITPACKED

pub struct BooleanPageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_values: u32,
  values_read: u32,
  cur_val: Option<bool>
}

impl BooleanPageReader {
  pub fn new(source: PageSource) -> Result<BooleanPageReader> {
    let mut reader = BooleanPageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  pub fn read_boolean(&mut self) -> Result<bool> {
    match self.cur_val {
      Some(v) => {
        if let Err(e) = self.fetch_next() {
          self.cur_val = None;
          return Err(e);
        }
        Ok(v)
      },
      None => Err(decode_err!("read past end of boolean stream"))
    }
  }

  pub fn peek(&self) -> Result<bool> {
    match self.cur_val {
      Some(v) => Ok(v),
      None => Err(decode_err!("peek past end of boolean stream"))
    }
  }

  pub fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  pub fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        let bit = self.values_read as usize;
        if bit / 8 >= self.page_data.len() {
          return Err(decode_err!("boolean page truncated at bit {}", bit));
        }
        let v = (self.page_data[bit / 8] >> (bit % 8)) & 1 == 1;
        self.values_read += 1;
        self.cur_val = Some(v);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}

// ----------------------------------------------------------------------
// STRING_PLAIN

pub struct StringPageReader {
  source: PageSource,
  page_idx: usize,
  page_data: Vec<u8>,
  page_pos: usize,
  page_values: u32,
  values_read: u32,
  cur_val: Option<String>
}

impl StringPageReader {
  pub fn new(source: PageSource) -> Result<StringPageReader> {
    let mut reader = StringPageReader {
      source: source,
      page_idx: 0,
      page_data: Vec::new(),
      page_pos: 0,
      page_values: 0,
      values_read: 0,
      cur_val: None
    };
    reader.fetch_next()?;
    Ok(reader)
  }

  pub fn read_string(&mut self) -> Result<String> {
    match self.cur_val.take() {
      Some(v) => {
        self.fetch_next()?;
        Ok(v)
      },
      None => Err(decode_err!("read past end of string stream"))
    }
  }

  pub fn peek(&self) -> Result<&str> {
    match self.cur_val {
      Some(ref v) => Ok(v),
      None => Err(decode_err!("peek past end of string stream"))
    }
  }

  pub fn eof_reached(&self) -> bool {
    self.cur_val.is_none()
  }

  pub fn rewind(&mut self) -> Result<()> {
    self.page_idx = 0;
    self.page_data.clear();
    self.page_pos = 0;
    self.page_values = 0;
    self.values_read = 0;
    self.cur_val = None;
    self.fetch_next()
  }

  fn fetch_next(&mut self) -> Result<()> {
    loop {
      if self.values_read < self.page_values {
        let len = match bit_util::read_leb128(&self.page_data, &mut self.page_pos) {
          Some(len) => len as usize,
          None => {
            return Err(decode_err!("string page truncated at byte {}", self.page_pos));
          }
        };
        if self.page_pos + len > self.page_data.len() {
          return Err(decode_err!(
            "string page truncated: value of {} bytes at byte {}", len, self.page_pos));
        }
        let bytes = self.page_data[self.page_pos..self.page_pos + len].to_vec();
        let v = match String::from_utf8(bytes) {
          Ok(v) => v,
          Err(_) => {
            return Err(decode_err!("invalid utf-8 in string page at byte {}", self.page_pos));
          }
        };
        self.page_pos += len;
        self.values_read += 1;
        self.cur_val = Some(v);
        return Ok(());
      }
      if self.page_idx >= self.source.num_pages() {
        self.cur_val = None;
        return Ok(());
      }
      let (data, values) = self.source.read_page(self.page_idx)?;
      self.page_idx += 1;
      self.page_data = data;
      self.page_pos = 0;
      self.page_values = values;
      self.values_read = 0;
    }
  }
}
