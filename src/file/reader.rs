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

//! Contains the table reader.

use std::cell::RefCell;
use std::cmp;
use std::collections::HashMap;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use memmap::Mmap;

use basic::{BinaryFormatVersion, ColumnEncoding, ColumnType};
use column::page::{PageIndexKey, PageSource};
use column::reader::{get_column_reader, ColumnReader};
use column::writer::ColumnWriter;
use errors::Result;
use file::arena::CSTableFile;
use file::metadata::{self, FileHeader, MetaBlock, METABLOCK_SIZE};
use file::page_manager::{Device, PageManager};
use file::writer::CSTableWriter;
use record::api::Value;
use schema::ColumnConfig;

/// Where a reader's column readers get their bytes from: the shared
/// memory map of a v0.1 file, or the page manager of a v0.2 file or
/// arena.
enum ReaderSource {
  V1 { mmap: Rc<Mmap> },
  V2 { page_mgr: Rc<RefCell<PageManager>> }
}

/// Reads one committed table: parses the footer, rebuilds the page
/// index and hands out per-column readers.
///
/// `get_column_reader` returns the shared reader for a column (one scan
/// position per file and column, callers must agree on ordering);
/// `get_private_column_reader` builds a fresh reader with its own scan
/// position over the same immutable pages.
pub struct CSTableReader {
  version: BinaryFormatVersion,
  columns: Vec<ColumnConfig>,
  columns_by_name: HashMap<String, usize>,
  shared_readers: Vec<Rc<RefCell<ColumnReader>>>,
  source: ReaderSource,
  num_rows: u64
}

impl CSTableReader {
  /// Opens a committed table file, dispatching on the format version
  /// in its header.
  pub fn open_file<P: AsRef<Path>>(path: P) -> Result<CSTableReader> {
    let mut file = File::open(path)?;
    let header = metadata::read_header(&mut file)?;

    match header.version {
      BinaryFormatVersion::v0_1_0 => {
        let mmap = Rc::new(unsafe { Mmap::map(&file)? });
        let source = ReaderSource::V1 { mmap: mmap };
        CSTableReader::new(header.version, header.columns, source, header.num_rows)
      },
      BinaryFormatVersion::v0_2_0 => {
        let file_len = file.metadata()?.len();
        let metablock = read_best_metablock(&file, &header, file_len)?;
        if metablock.index_offset + metablock.index_size > file_len {
          return Err(format_err!(
            "page index [{}, {}) lies past the end of the file ({})",
            metablock.index_offset,
            metablock.index_offset + metablock.index_size,
            file_len));
        }
        let mut index_bytes = vec![0u8; metablock.index_size as usize];
        file.read_exact_at(&mut index_bytes, metablock.index_offset)?;
        let entries = metadata::parse_index(&index_bytes)?;

        let page_mgr = Rc::new(RefCell::new(
          PageManager::open(Device::File(file), entries)));
        let source = ReaderSource::V2 { page_mgr: page_mgr };
        CSTableReader::new(header.version, header.columns, source, metablock.num_rows)
      }
    }
  }

  /// Opens an in-memory arena at its last committed transaction,
  /// reading at most `limit` records.
  pub fn open_arena(file: &CSTableFile, limit: u64) -> Result<CSTableReader> {
    let (_, num_rows) = file.get_transaction();
    let source = ReaderSource::V2 { page_mgr: file.page_manager().clone() };
    CSTableReader::new(
      BinaryFormatVersion::v0_2_0,
      file.columns().to_vec(),
      source,
      cmp::min(num_rows, limit))
  }

  fn new(
    version: BinaryFormatVersion,
    columns: Vec<ColumnConfig>,
    source: ReaderSource,
    num_rows: u64
  ) -> Result<CSTableReader> {
    let mut columns_by_name = HashMap::new();
    let mut shared_readers = Vec::with_capacity(columns.len());
    for (i, config) in columns.iter().enumerate() {
      let reader = open_column(config, &source)?;
      shared_readers.push(Rc::new(RefCell::new(reader)));
      columns_by_name.insert(config.column_name.clone(), i);
    }
    Ok(CSTableReader {
      version: version,
      columns: columns,
      columns_by_name: columns_by_name,
      shared_readers: shared_readers,
      source: source,
      num_rows: num_rows
    })
  }

  pub fn version(&self) -> BinaryFormatVersion {
    self.version
  }

  pub fn columns(&self) -> &[ColumnConfig] {
    &self.columns
  }

  pub fn num_records(&self) -> u64 {
    self.num_rows
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.columns_by_name.contains_key(name)
  }

  /// The shared reader for `name`; all callers of this method see one
  /// scan position.
  pub fn get_column_reader(&self, name: &str) -> Result<Rc<RefCell<ColumnReader>>> {
    let idx = self.column_index(name)?;
    Ok(self.shared_readers[idx].clone())
  }

  /// A fresh reader for `name` with an independent scan position.
  pub fn get_private_column_reader(&self, name: &str) -> Result<ColumnReader> {
    let idx = self.column_index(name)?;
    open_column(&self.columns[idx], &self.source)
  }

  pub fn get_column_type(&self, name: &str) -> Result<ColumnType> {
    let idx = self.column_index(name)?;
    Ok(self.columns[idx].logical_type)
  }

  pub fn get_column_encoding(&self, name: &str) -> Result<ColumnEncoding> {
    let idx = self.column_index(name)?;
    Ok(self.columns[idx].storage_type)
  }

  /// Streams records into `target`. Records whose `copy_record` entry
  /// is false are dropped wholesale (every triple of every column);
  /// retained records are copied triple for triple, so the rewritten
  /// records keep their exact shape. The mask length must equal
  /// `num_records()`.
  pub fn copy_to(
    &self,
    target: &mut CSTableWriter,
    columns: &[&str],
    copy_record: Option<&[bool]>
  ) -> Result<()> {
    if let Some(mask) = copy_record {
      if mask.len() as u64 != self.num_rows {
        return Err(argument_err!(
          "copy mask has {} entries for {} records", mask.len(), self.num_rows));
      }
    }

    for name in columns {
      let mut reader = self.get_private_column_reader(name)?;
      let writer = target.get_column_writer(name)?;
      let mut writer = writer.borrow_mut();

      for record in 0..self.num_rows {
        let keep = match copy_record {
          Some(mask) => mask[record as usize],
          None => true
        };
        if reader.eof() {
          return Err(invariant_err!(
            "column '{}' ran out after {} of {} records", name, record, self.num_rows));
        }
        let (rlvl, dlvl, value) = reader.next()?;
        if keep {
          copy_triple(&mut writer, rlvl, dlvl, value)?;
        }
        while !reader.eof() {
          let (next_rlvl, _) = reader.peek()?;
          if next_rlvl == 0 {
            break;
          }
          let (rlvl, dlvl, value) = reader.next()?;
          if keep {
            copy_triple(&mut writer, rlvl, dlvl, value)?;
          }
        }
      }
    }

    let kept = match copy_record {
      Some(mask) => mask.iter().filter(|&&keep| keep).count() as u64,
      None => self.num_rows
    };
    target.add_rows(kept);
    Ok(())
  }

  fn column_index(&self, name: &str) -> Result<usize> {
    match self.columns_by_name.get(name) {
      Some(&idx) => Ok(idx),
      None => Err(not_found_err!("column not found: {}", name))
    }
  }
}

fn copy_triple(
  writer: &mut ColumnWriter,
  rlvl: u64,
  dlvl: u64,
  value: Option<Value>
) -> Result<()> {
  match value {
    Some(ref value) => writer.write_value(rlvl, dlvl, value),
    None => writer.write_null(rlvl, dlvl)
  }
}

// ----------------------------------------------------------------------
// Column opening

fn open_column(config: &ColumnConfig, source: &ReaderSource) -> Result<ColumnReader> {
  match *source {
    ReaderSource::V1 { ref mmap } => open_column_v1(config, mmap),
    ReaderSource::V2 { ref page_mgr } => open_column_v2(config, page_mgr)
  }
}

/// v0.2 columns reach their three streams through the page index.
fn open_column_v2(
  config: &ColumnConfig,
  page_mgr: &Rc<RefCell<PageManager>>
) -> Result<ColumnReader> {
  let rlevel_source = if config.rlevel_max > 0 {
    Some(PageSource::managed(page_mgr, PageIndexKey::rlevel(config.column_id)))
  } else {
    None
  };
  let dlevel_source = if config.dlevel_max > 0 {
    Some(PageSource::managed(page_mgr, PageIndexKey::dlevel(config.column_id)))
  } else {
    None
  };
  let value_source = PageSource::managed(
    page_mgr, PageIndexKey::values(config.column_id));
  get_column_reader(config.clone(), rlevel_source, dlevel_source, value_source)
}

/// v0.1 columns store their streams as consecutive sections of one
/// body slice: repetition levels (iff `rlevel_max > 0`), definition
/// levels (iff `dlevel_max > 0`), then values. Every section is
/// `value_count:u32 | byte_size:u32 | bytes`.
fn open_column_v1(config: &ColumnConfig, mmap: &Rc<Mmap>) -> Result<ColumnReader> {
  let body_end = config.body_offset + config.body_size;
  if body_end > mmap.len() as u64 {
    return Err(format_err!(
      "column '{}' body [{}, {}) lies past the end of the file ({})",
      config.column_name, config.body_offset, body_end, mmap.len()));
  }

  let mut pos = config.body_offset;
  let rlevel_source = if config.rlevel_max > 0 {
    Some(read_v1_section(config, mmap, &mut pos, body_end)?)
  } else {
    None
  };
  let dlevel_source = if config.dlevel_max > 0 {
    Some(read_v1_section(config, mmap, &mut pos, body_end)?)
  } else {
    None
  };
  let value_source = read_v1_section(config, mmap, &mut pos, body_end)?;

  get_column_reader(config.clone(), rlevel_source, dlevel_source, value_source)
}

fn read_v1_section(
  config: &ColumnConfig,
  mmap: &Rc<Mmap>,
  pos: &mut u64,
  body_end: u64
) -> Result<PageSource> {
  if *pos + 8 > body_end {
    return Err(format_err!(
      "column '{}' body is too short for its section headers", config.column_name));
  }
  let header_pos = *pos as usize;
  let count = LittleEndian::read_u32(&mmap[header_pos..header_pos + 4]);
  let size = LittleEndian::read_u32(&mmap[header_pos + 4..header_pos + 8]);
  let data_offset = *pos + 8;
  if data_offset + size as u64 > body_end {
    return Err(format_err!(
      "column '{}' section of {} bytes overruns its body", config.column_name, size));
  }
  *pos = data_offset + size as u64;
  Ok(PageSource::slice(mmap.clone(), data_offset, size, count))
}

/// Reads both metablock slots and picks the valid one with the highest
/// transaction id. A slot that was never written, lies past EOF or was
/// torn mid-commit fails its digest check and is skipped.
fn read_best_metablock(
  file: &File,
  header: &FileHeader,
  file_len: u64
) -> Result<MetaBlock> {
  let mut best: Option<MetaBlock> = None;
  for &offset in [header.metablock_a_offset, header.metablock_b_offset].iter() {
    if offset + METABLOCK_SIZE as u64 > file_len {
      continue;
    }
    let mut buf = [0u8; METABLOCK_SIZE];
    file.read_exact_at(&mut buf, offset)?;
    if let Some(metablock) = MetaBlock::parse(&buf) {
      best = match best {
        Some(current) if current.transaction_id >= metablock.transaction_id => {
          Some(current)
        },
        _ => Some(metablock)
      };
    }
  }
  match best {
    Some(metablock) => Ok(metablock),
    None => Err(format_err!("no valid metablock, file was never committed"))
  }
}
