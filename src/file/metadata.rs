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

//! Contains the on-disk footer structures: file header, metablock and
//! page index, with their (de)serialization.
//!
//! All integers are little-endian. A v0.2 file carries two metablock
//! slots right after the header; commits alternate between them and the
//! newest slot with a valid SHA-1 digest wins at open, which makes the
//! metablock the single atomic commit point.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use sha1::Sha1;

use basic::{BinaryFormatVersion, ColumnEncoding, ColumnType, PageIndexEntryType};
use column::page::{PageIndexEntry, PageIndexKey, PageRef};
use errors::Result;
use schema::ColumnConfig;

/// Magic bytes at offset zero of every table file.
pub const MAGIC: [u8; 4] = [0x23, 0x17, 0x23, 0x17];

/// Serialized size of one metablock slot.
pub const METABLOCK_SIZE: usize = 52;

/// Serialized size of one page index entry.
pub const PAGE_INDEX_ENTRY_SIZE: usize = 21;

/// Column names longer than this are taken as file corruption.
const MAX_COLUMN_NAME_LEN: u32 = 1 << 20;

// ----------------------------------------------------------------------
// File header

/// The parsed file header. `metablock_a_offset`/`metablock_b_offset`
/// and `header_size` are meaningful for v0.2 files, `num_rows` for
/// v0.1 files (which carry the row count in the header instead of a
/// metablock).
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
  pub version: BinaryFormatVersion,
  pub flags: u32,
  pub metablock_a_offset: u64,
  pub metablock_b_offset: u64,
  pub header_size: u32,
  pub num_rows: u64,
  pub columns: Vec<ColumnConfig>
}

/// Serializes a v0.2 header for `columns`. The two metablock slots are
/// placed immediately after the returned bytes.
pub fn write_header_v2(columns: &[ColumnConfig]) -> Vec<u8> {
  let mut schema = Vec::new();
  for config in columns {
    serialize_column_config_v2(config, &mut schema);
  }

  // fixed fields + column count + schema
  let header_size = (4 + 2 + 2 + 4 + 8 + 8 + 4 + 4 + schema.len()) as u32;
  let metablock_a_offset = header_size as u64;
  let metablock_b_offset = metablock_a_offset + METABLOCK_SIZE as u64;

  let mut buf = Vec::with_capacity(header_size as usize);
  buf.extend_from_slice(&MAGIC);
  let (major, minor) = BinaryFormatVersion::v0_2_0.version_numbers();
  buf.write_u16::<LittleEndian>(major).unwrap();
  buf.write_u16::<LittleEndian>(minor).unwrap();
  buf.write_u32::<LittleEndian>(0).unwrap(); // flags
  buf.write_u64::<LittleEndian>(metablock_a_offset).unwrap();
  buf.write_u64::<LittleEndian>(metablock_b_offset).unwrap();
  buf.write_u32::<LittleEndian>(header_size).unwrap();
  buf.write_u32::<LittleEndian>(columns.len() as u32).unwrap();
  buf.extend_from_slice(&schema);
  buf
}

fn serialize_column_config_v2(config: &ColumnConfig, out: &mut Vec<u8>) {
  out.write_u32::<LittleEndian>(config.column_id).unwrap();
  out.push(config.logical_type.id());
  out.push(config.storage_type.id());
  out.write_u64::<LittleEndian>(config.rlevel_max).unwrap();
  out.write_u64::<LittleEndian>(config.dlevel_max).unwrap();
  out.write_u32::<LittleEndian>(config.column_name.len() as u32).unwrap();
  out.extend_from_slice(config.column_name.as_bytes());
}

/// Parses a file header, dispatching on the version found after the
/// magic bytes.
pub fn read_header<R: Read>(reader: &mut R) -> Result<FileHeader> {
  let mut magic = [0u8; 4];
  reader.read_exact(&mut magic)?;
  if magic != MAGIC {
    return Err(format_err!("bad magic number: {:?}", magic));
  }

  let major = reader.read_u16::<LittleEndian>()?;
  let minor = reader.read_u16::<LittleEndian>()?;
  let version = BinaryFormatVersion::from_version_numbers(major, minor)?;
  let flags = reader.read_u32::<LittleEndian>()?;

  match version {
    BinaryFormatVersion::v0_1_0 => {
      let num_rows = reader.read_u64::<LittleEndian>()?;
      let column_count = reader.read_u32::<LittleEndian>()?;
      let mut columns = Vec::with_capacity(column_count as usize);
      for _ in 0..column_count {
        columns.push(parse_column_config(reader, version)?);
      }
      Ok(FileHeader {
        version: version,
        flags: flags,
        metablock_a_offset: 0,
        metablock_b_offset: 0,
        header_size: 0,
        num_rows: num_rows,
        columns: columns
      })
    },
    BinaryFormatVersion::v0_2_0 => {
      let metablock_a_offset = reader.read_u64::<LittleEndian>()?;
      let metablock_b_offset = reader.read_u64::<LittleEndian>()?;
      let header_size = reader.read_u32::<LittleEndian>()?;
      let column_count = reader.read_u32::<LittleEndian>()?;
      let mut columns = Vec::with_capacity(column_count as usize);
      for _ in 0..column_count {
        columns.push(parse_column_config(reader, version)?);
      }
      Ok(FileHeader {
        version: version,
        flags: flags,
        metablock_a_offset: metablock_a_offset,
        metablock_b_offset: metablock_b_offset,
        header_size: header_size,
        num_rows: 0,
        columns: columns
      })
    }
  }
}

fn parse_column_config<R: Read>(
  reader: &mut R,
  version: BinaryFormatVersion
) -> Result<ColumnConfig> {
  let column_id = match version {
    BinaryFormatVersion::v0_1_0 => 0,
    BinaryFormatVersion::v0_2_0 => reader.read_u32::<LittleEndian>()?
  };
  let logical_type = ColumnType::from_id(reader.read_u8()?)?;
  let storage_type = ColumnEncoding::from_id(reader.read_u8()?)?;
  let rlevel_max = reader.read_u64::<LittleEndian>()?;
  let dlevel_max = reader.read_u64::<LittleEndian>()?;

  let name_len = reader.read_u32::<LittleEndian>()?;
  if name_len > MAX_COLUMN_NAME_LEN {
    return Err(format_err!("implausible column name length: {}", name_len));
  }
  let mut name_bytes = vec![0u8; name_len as usize];
  reader.read_exact(&mut name_bytes)?;
  let column_name = match String::from_utf8(name_bytes) {
    Ok(name) => name,
    Err(_) => return Err(format_err!("column name is not valid utf-8"))
  };

  let (body_offset, body_size) = match version {
    BinaryFormatVersion::v0_1_0 => {
      let offset = reader.read_u64::<LittleEndian>()?;
      let size = reader.read_u64::<LittleEndian>()?;
      (offset, size)
    },
    BinaryFormatVersion::v0_2_0 => (0, 0)
  };

  Ok(ColumnConfig {
    column_id: column_id,
    column_name: column_name,
    logical_type: logical_type,
    storage_type: storage_type,
    rlevel_max: rlevel_max,
    dlevel_max: dlevel_max,
    body_offset: body_offset,
    body_size: body_size
  })
}

// ----------------------------------------------------------------------
// Metablock

/// The commit record of a v0.2 file: transaction id, committed row
/// count and the location of the page index. On disk it is followed by
/// a SHA-1 digest of its 32 payload bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaBlock {
  pub transaction_id: u64,
  pub num_rows: u64,
  pub index_offset: u64,
  pub index_size: u64
}

impl MetaBlock {
  pub fn serialize(&self) -> Vec<u8> {
    let mut buf = Vec::with_capacity(METABLOCK_SIZE);
    buf.write_u64::<LittleEndian>(self.transaction_id).unwrap();
    buf.write_u64::<LittleEndian>(self.num_rows).unwrap();
    buf.write_u64::<LittleEndian>(self.index_offset).unwrap();
    buf.write_u64::<LittleEndian>(self.index_size).unwrap();
    let mut digest = Sha1::new();
    digest.update(&buf);
    buf.extend_from_slice(&digest.digest().bytes());
    buf
  }

  /// Parses one slot. Returns `None` for a slot whose digest does not
  /// match, e.g. a slot that was never written or was torn mid-commit.
  pub fn parse(data: &[u8]) -> Option<MetaBlock> {
    if data.len() < METABLOCK_SIZE {
      return None;
    }
    let mut digest = Sha1::new();
    digest.update(&data[0..32]);
    if &digest.digest().bytes()[..] != &data[32..52] {
      return None;
    }
    Some(MetaBlock {
      transaction_id: LittleEndian::read_u64(&data[0..8]),
      num_rows: LittleEndian::read_u64(&data[8..16]),
      index_offset: LittleEndian::read_u64(&data[16..24]),
      index_size: LittleEndian::read_u64(&data[24..32])
    })
  }
}

// ----------------------------------------------------------------------
// Page index

pub fn serialize_index(entries: &[PageIndexEntry]) -> Vec<u8> {
  let mut buf = Vec::with_capacity(4 + entries.len() * PAGE_INDEX_ENTRY_SIZE);
  buf.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
  for entry in entries {
    buf.write_u32::<LittleEndian>(entry.key.column_id).unwrap();
    buf.push(entry.key.entry_type.id());
    buf.write_u64::<LittleEndian>(entry.page.offset).unwrap();
    buf.write_u32::<LittleEndian>(entry.page.size).unwrap();
    buf.write_u32::<LittleEndian>(entry.logical_length).unwrap();
  }
  buf
}

pub fn parse_index(data: &[u8]) -> Result<Vec<PageIndexEntry>> {
  if data.len() < 4 {
    return Err(format_err!("page index shorter than its entry count"));
  }
  let count = LittleEndian::read_u32(&data[0..4]) as usize;
  if data.len() < 4 + count * PAGE_INDEX_ENTRY_SIZE {
    return Err(format_err!(
      "page index truncated: {} entries need {} bytes, found {}",
      count, 4 + count * PAGE_INDEX_ENTRY_SIZE, data.len()));
  }

  let mut entries = Vec::with_capacity(count);
  let mut pos = 4;
  for _ in 0..count {
    let column_id = LittleEndian::read_u32(&data[pos..pos + 4]);
    let entry_type = PageIndexEntryType::from_id(data[pos + 4])?;
    let page_offset = LittleEndian::read_u64(&data[pos + 5..pos + 13]);
    let page_size = LittleEndian::read_u32(&data[pos + 13..pos + 17]);
    let values = LittleEndian::read_u32(&data[pos + 17..pos + 21]);
    entries.push(PageIndexEntry {
      key: PageIndexKey { column_id: column_id, entry_type: entry_type },
      page: PageRef { offset: page_offset, size: page_size },
      logical_length: values
    });
    pos += PAGE_INDEX_ENTRY_SIZE;
  }
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  use errors::CSTableError;

  fn test_columns() -> Vec<ColumnConfig> {
    vec![
      ColumnConfig::new(
        1, "user.id", ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_LEB128, 0, 0)
        .unwrap(),
      ColumnConfig::new(
        2, "user.tags", ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 1, 2)
        .unwrap()
    ]
  }

  #[test]
  fn test_header_v2_roundtrip() {
    let columns = test_columns();
    let bytes = write_header_v2(&columns);
    assert_eq!(bytes.len() as u32, {
      let mut cursor = Cursor::new(&bytes);
      read_header(&mut cursor).unwrap().header_size
    });

    let mut cursor = Cursor::new(&bytes);
    let header = read_header(&mut cursor).unwrap();
    assert_eq!(header.version, BinaryFormatVersion::v0_2_0);
    assert_eq!(header.columns, columns);
    assert_eq!(header.metablock_a_offset, bytes.len() as u64);
    assert_eq!(
      header.metablock_b_offset,
      bytes.len() as u64 + METABLOCK_SIZE as u64);
  }

  #[test]
  fn test_bad_magic() {
    let mut bytes = write_header_v2(&test_columns());
    bytes[0] = 0;
    bytes[1] = 0;
    bytes[2] = 0;
    bytes[3] = 0;
    let mut cursor = Cursor::new(&bytes);
    match read_header(&mut cursor) {
      Err(CSTableError::Format(_)) => {},
      other => panic!("expected Format error, got {:?}", other)
    }
  }

  #[test]
  fn test_unknown_version() {
    let mut bytes = write_header_v2(&test_columns());
    bytes[4] = 9; // version_major = 9
    let mut cursor = Cursor::new(&bytes);
    match read_header(&mut cursor) {
      Err(CSTableError::Format(_)) => {},
      other => panic!("expected Format error, got {:?}", other)
    }
  }

  #[test]
  fn test_unknown_storage_type() {
    let columns = test_columns();
    let mut bytes = write_header_v2(&columns);
    // the first column starts after the 36 fixed header bytes; its
    // storage id follows the column id and the logical type id
    let storage_pos = 36 + 4 + 1;
    bytes[storage_pos] = 99;
    let mut cursor = Cursor::new(&bytes);
    match read_header(&mut cursor) {
      Err(CSTableError::UnsupportedEncoding(_)) => {},
      other => panic!("expected UnsupportedEncoding, got {:?}", other)
    }
  }

  #[test]
  fn test_metablock_roundtrip() {
    let metablock = MetaBlock {
      transaction_id: 3,
      num_rows: 12345,
      index_offset: 4096,
      index_size: 84
    };
    let bytes = metablock.serialize();
    assert_eq!(bytes.len(), METABLOCK_SIZE);
    assert_eq!(MetaBlock::parse(&bytes), Some(metablock));
  }

  #[test]
  fn test_metablock_detects_corruption() {
    let metablock = MetaBlock {
      transaction_id: 1,
      num_rows: 1,
      index_offset: 512,
      index_size: 21
    };
    let mut bytes = metablock.serialize();
    bytes[8] ^= 0xff; // flip a num_rows byte
    assert_eq!(MetaBlock::parse(&bytes), None);
    assert_eq!(MetaBlock::parse(&[0u8; METABLOCK_SIZE]), None);
    assert_eq!(MetaBlock::parse(&bytes[..10]), None);
  }

  #[test]
  fn test_index_roundtrip() {
    let entries = vec![
      PageIndexEntry {
        key: PageIndexKey::values(1),
        page: PageRef { offset: 512, size: 512 },
        logical_length: 100
      },
      PageIndexEntry {
        key: PageIndexKey::rlevel(2),
        page: PageRef { offset: 1024, size: 1536 },
        logical_length: 7
      },
      PageIndexEntry {
        key: PageIndexKey::dlevel(2),
        page: PageRef { offset: 2560, size: 512 },
        logical_length: 7
      }
    ];
    let bytes = serialize_index(&entries);
    assert_eq!(bytes.len(), 4 + entries.len() * PAGE_INDEX_ENTRY_SIZE);
    assert_eq!(parse_index(&bytes).unwrap(), entries);
  }

  #[test]
  fn test_index_truncated() {
    let entries = vec![
      PageIndexEntry {
        key: PageIndexKey::values(1),
        page: PageRef { offset: 512, size: 512 },
        logical_length: 1
      }
    ];
    let bytes = serialize_index(&entries);
    match parse_index(&bytes[..bytes.len() - 1]) {
      Err(CSTableError::Format(_)) => {},
      other => panic!("expected Format error, got {:?}", other)
    }
  }

  #[test]
  fn test_index_unknown_entry_type() {
    let entries = vec![
      PageIndexEntry {
        key: PageIndexKey::values(1),
        page: PageRef { offset: 512, size: 512 },
        logical_length: 1
      }
    ];
    let mut bytes = serialize_index(&entries);
    bytes[8] = 200; // entry_type of the first entry
    assert!(parse_index(&bytes).is_err());
  }
}
