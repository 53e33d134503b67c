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

//! Bit-level utilities: LSB-first bit packing, fixed-width integer
//! groups, LEB128 varints and zigzag mapping.

use std::cmp;

/// Number of values in one bitpacked group. Groups are always encoded
/// in full; the tail of the last group is zero-padded.
pub const BITPACK_GROUP_SIZE: usize = 128;

/// Returns the number of bits required to represent `v`, i.e.
/// `ceil(log2(v + 1))`. Zero requires zero bits.
pub fn num_required_bits(v: u64) -> u32 {
  64 - v.leading_zeros()
}

/// Encoded byte length of one full group at the given bit width.
pub fn group_byte_len(maxbits: u32) -> usize {
  BITPACK_GROUP_SIZE * maxbits as usize / 8
}

// ----------------------------------------------------------------------
// Bit-packed writing

/// Writes integers of arbitrary bit widths into a byte buffer, LSB
/// first within each byte.
pub struct BitWriter {
  buffer: Vec<u8>,
  buffered: u64,
  bit_count: u32
}

impl BitWriter {
  pub fn new() -> BitWriter {
    BitWriter { buffer: Vec::new(), buffered: 0, bit_count: 0 }
  }

  /// Appends the lowest `num_bits` bits of `v`.
  pub fn put_value(&mut self, v: u64, num_bits: u32) {
    debug_assert!(num_bits <= 64);
    let mut v = if num_bits < 64 { v & ((1u64 << num_bits) - 1) } else { v };
    let mut bits_left = num_bits;
    while bits_left > 0 {
      let take = cmp::min(bits_left, 8 - self.bit_count);
      self.buffered |= (v & ((1u64 << take) - 1)) << self.bit_count;
      self.bit_count += take;
      v >>= take;
      bits_left -= take;
      if self.bit_count == 8 {
        self.buffer.push(self.buffered as u8);
        self.buffered = 0;
        self.bit_count = 0;
      }
    }
  }

  /// Zero-pads the trailing partial byte and returns the buffer.
  pub fn consume(mut self) -> Vec<u8> {
    if self.bit_count > 0 {
      self.buffer.push(self.buffered as u8);
    }
    self.buffer
  }
}

// ----------------------------------------------------------------------
// Bit-packed reading

/// Reads integers of arbitrary bit widths out of a byte buffer, LSB
/// first within each byte. All reads return `None` once the buffer is
/// exhausted.
pub struct BitReader {
  data: Vec<u8>,
  byte_offset: usize,
  bit_offset: u32
}

impl BitReader {
  pub fn new(data: Vec<u8>) -> BitReader {
    BitReader { data: data, byte_offset: 0, bit_offset: 0 }
  }

  /// Reads the next `num_bits` bits as an unsigned integer.
  pub fn get_value(&mut self, num_bits: u32) -> Option<u64> {
    debug_assert!(num_bits <= 64);
    let bits_avail = (self.data.len() - self.byte_offset) as u64 * 8 - self.bit_offset as u64;
    if (num_bits as u64) > bits_avail {
      return None;
    }
    let mut v = 0u64;
    let mut got = 0u32;
    while got < num_bits {
      let take = cmp::min(num_bits - got, 8 - self.bit_offset);
      let bits = (self.data[self.byte_offset] as u64 >> self.bit_offset) & ((1u64 << take) - 1);
      v |= bits << got;
      got += take;
      self.bit_offset += take;
      if self.bit_offset == 8 {
        self.byte_offset += 1;
        self.bit_offset = 0;
      }
    }
    Some(v)
  }

  pub fn rewind(&mut self) {
    self.byte_offset = 0;
    self.bit_offset = 0;
  }
}

// ----------------------------------------------------------------------
// Fixed-width groups

/// Packs up to one group of values at `maxbits` bits each into `out`,
/// zero-padding to a full group. A width of zero encodes to nothing.
pub fn pack_group(values: &[u32], maxbits: u32, out: &mut Vec<u8>) {
  debug_assert!(values.len() <= BITPACK_GROUP_SIZE);
  debug_assert!(maxbits <= 32);
  if maxbits == 0 {
    return;
  }
  let mut writer = BitWriter::new();
  for &v in values {
    writer.put_value(v as u64, maxbits);
  }
  for _ in values.len()..BITPACK_GROUP_SIZE {
    writer.put_value(0, maxbits);
  }
  out.extend_from_slice(&writer.consume());
}

/// Unpacks one full group of values at `maxbits` bits each from the
/// front of `data`. Returns false if `data` is too short.
pub fn unpack_group(data: &[u8], maxbits: u32, out: &mut [u32; BITPACK_GROUP_SIZE]) -> bool {
  debug_assert!(maxbits <= 32);
  if maxbits == 0 {
    for slot in out.iter_mut() {
      *slot = 0;
    }
    return true;
  }
  if data.len() < group_byte_len(maxbits) {
    return false;
  }
  let mut bit_pos = 0usize;
  for i in 0..BITPACK_GROUP_SIZE {
    let mut v = 0u64;
    let mut got = 0u32;
    while got < maxbits {
      let byte = data[bit_pos / 8] as u64;
      let off = (bit_pos % 8) as u32;
      let take = cmp::min(maxbits - got, 8 - off);
      v |= ((byte >> off) & ((1u64 << take) - 1)) << got;
      got += take;
      bit_pos += take as usize;
    }
    out[i] = v as u32;
  }
  true
}

// ----------------------------------------------------------------------
// LEB128 varints

/// Appends `v` as an unsigned LEB128 varint: 7 data bits per byte,
/// little-endian, MSB continuation.
pub fn write_leb128(out: &mut Vec<u8>, mut v: u64) {
  loop {
    let byte = (v & 0x7f) as u8;
    v >>= 7;
    if v == 0 {
      out.push(byte);
      return;
    }
    out.push(byte | 0x80);
  }
}

/// Reads an unsigned LEB128 varint from `data` starting at `*pos` and
/// advances `*pos` past it. Returns `None` on truncation or a varint
/// longer than 64 bits.
pub fn read_leb128(data: &[u8], pos: &mut usize) -> Option<u64> {
  let mut v = 0u64;
  let mut shift = 0u32;
  loop {
    if *pos >= data.len() || shift >= 64 {
      return None;
    }
    let byte = data[*pos];
    *pos += 1;
    v |= ((byte & 0x7f) as u64) << shift;
    if byte & 0x80 == 0 {
      return Some(v);
    }
    shift += 7;
  }
}

// ----------------------------------------------------------------------
// Zigzag mapping for signed integers

pub fn zigzag_encode(v: i64) -> u64 {
  ((v << 1) ^ (v >> 63)) as u64
}

pub fn zigzag_decode(v: u64) -> i64 {
  ((v >> 1) as i64) ^ -((v & 1) as i64)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{thread_rng, Rng};

  #[test]
  fn test_num_required_bits() {
    assert_eq!(num_required_bits(0), 0);
    assert_eq!(num_required_bits(1), 1);
    assert_eq!(num_required_bits(2), 2);
    assert_eq!(num_required_bits(3), 2);
    assert_eq!(num_required_bits(4), 3);
    assert_eq!(num_required_bits(9), 4);
    assert_eq!(num_required_bits(255), 8);
    assert_eq!(num_required_bits(256), 9);
    assert_eq!(num_required_bits(::std::u64::MAX), 64);
  }

  #[test]
  fn test_bit_writer_reader_roundtrip() {
    let widths = [1u32, 3, 7, 8, 13, 32, 57, 64];
    let mut writer = BitWriter::new();
    for (i, &w) in widths.iter().enumerate() {
      writer.put_value(i as u64 + 1, w);
    }
    let mut reader = BitReader::new(writer.consume());
    for (i, &w) in widths.iter().enumerate() {
      assert_eq!(reader.get_value(w), Some(i as u64 + 1));
    }
    assert_eq!(reader.get_value(8), None);
  }

  #[test]
  fn test_bit_writer_masks_high_bits() {
    let mut writer = BitWriter::new();
    writer.put_value(0xff, 4);
    writer.put_value(0, 4);
    let bytes = writer.consume();
    assert_eq!(bytes, vec![0x0f]);
  }

  #[test]
  fn test_bit_reader_rewind() {
    let mut writer = BitWriter::new();
    writer.put_value(5, 3);
    writer.put_value(2, 3);
    let mut reader = BitReader::new(writer.consume());
    assert_eq!(reader.get_value(3), Some(5));
    reader.rewind();
    assert_eq!(reader.get_value(3), Some(5));
    assert_eq!(reader.get_value(3), Some(2));
  }

  #[test]
  fn test_group_roundtrip_partial() {
    let values: Vec<u32> = vec![3, 1, 4, 1, 5, 9, 2, 6];
    let maxbits = 4;
    let mut out = Vec::new();
    pack_group(&values, maxbits, &mut out);
    assert_eq!(out.len(), group_byte_len(maxbits));

    let mut decoded = [0u32; BITPACK_GROUP_SIZE];
    assert!(unpack_group(&out, maxbits, &mut decoded));
    assert_eq!(&decoded[..8], &values[..]);
    for i in 8..BITPACK_GROUP_SIZE {
      assert_eq!(decoded[i], 0);
    }
  }

  #[test]
  fn test_group_roundtrip_random() {
    let mut rng = thread_rng();
    for &maxbits in [1u32, 2, 5, 8, 11, 17, 24, 32].iter() {
      let limit = if maxbits == 32 { ::std::u32::MAX } else { (1u32 << maxbits) - 1 };
      let values: Vec<u32> = (0..BITPACK_GROUP_SIZE)
        .map(|_| rng.gen_range(0, limit as u64 + 1) as u32)
        .collect();
      let mut out = Vec::new();
      pack_group(&values, maxbits, &mut out);
      assert_eq!(out.len(), group_byte_len(maxbits));

      let mut decoded = [0u32; BITPACK_GROUP_SIZE];
      assert!(unpack_group(&out, maxbits, &mut decoded));
      assert_eq!(&decoded[..], &values[..]);
    }
  }

  #[test]
  fn test_unpack_group_short_input() {
    let data = vec![0u8; group_byte_len(4) - 1];
    let mut decoded = [0u32; BITPACK_GROUP_SIZE];
    assert!(!unpack_group(&data, 4, &mut decoded));
  }

  #[test]
  fn test_zero_width_group() {
    let mut out = Vec::new();
    pack_group(&[0, 0, 0], 0, &mut out);
    assert!(out.is_empty());
    let mut decoded = [7u32; BITPACK_GROUP_SIZE];
    assert!(unpack_group(&out, 0, &mut decoded));
    assert!(decoded.iter().all(|&v| v == 0));
  }

  #[test]
  fn test_leb128_known_values() {
    let mut out = Vec::new();
    write_leb128(&mut out, 0);
    assert_eq!(out, vec![0x00]);

    let mut out = Vec::new();
    write_leb128(&mut out, 127);
    assert_eq!(out, vec![0x7f]);

    let mut out = Vec::new();
    write_leb128(&mut out, 128);
    assert_eq!(out, vec![0x80, 0x01]);

    let mut out = Vec::new();
    write_leb128(&mut out, 624485);
    assert_eq!(out, vec![0xe5, 0x8e, 0x26]);
  }

  #[test]
  fn test_leb128_roundtrip() {
    let values = [
      0u64, 1, 127, 128, 300, 16384, ::std::u32::MAX as u64, ::std::u64::MAX
    ];
    let mut out = Vec::new();
    for &v in values.iter() {
      write_leb128(&mut out, v);
    }
    let mut pos = 0;
    for &v in values.iter() {
      assert_eq!(read_leb128(&out, &mut pos), Some(v));
    }
    assert_eq!(pos, out.len());
    assert_eq!(read_leb128(&out, &mut pos), None);
  }

  #[test]
  fn test_leb128_truncated() {
    let data = vec![0x80, 0x80];
    let mut pos = 0;
    assert_eq!(read_leb128(&data, &mut pos), None);
  }

  #[test]
  fn test_zigzag() {
    assert_eq!(zigzag_encode(0), 0);
    assert_eq!(zigzag_encode(-1), 1);
    assert_eq!(zigzag_encode(1), 2);
    assert_eq!(zigzag_encode(-2), 3);
    for &v in [0i64, 1, -1, 63, -64, ::std::i64::MIN, ::std::i64::MAX].iter() {
      assert_eq!(zigzag_decode(zigzag_encode(v)), v);
    }
  }
}
