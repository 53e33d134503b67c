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

//! Contains the table writer.

use std::collections::HashMap;
use std::cell::RefCell;
use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::rc::Rc;

use column::writer::ColumnWriter;
use errors::Result;
use file::arena::CSTableFile;
use file::metadata::{self, MetaBlock, METABLOCK_SIZE};
use file::page_manager::{Device, PageManager, PAGE_GRANULE};
use schema::ColumnConfig;

enum CommitTarget {
  /// A real v0.2 file; commit appends the index and a metablock slot.
  Disk {
    metablock_a_offset: u64,
    metablock_b_offset: u64
  },
  /// An in-memory arena; commit records the transaction there.
  Arena(CSTableFile)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WriterState {
  Open,
  Committed
}

/// Writes one table: owns the page manager, hands out one column
/// writer per configured column and commits the file atomically.
///
/// The caller declares the row count by calling `add_row` once per
/// outer record; at commit every column must have seen exactly that
/// many record boundaries. A writer that is dropped before `commit`
/// leaves no readable data behind.
pub struct CSTableWriter {
  page_mgr: Rc<RefCell<PageManager>>,
  columns: Vec<ColumnConfig>,
  column_writers: Vec<Rc<RefCell<ColumnWriter>>>,
  columns_by_name: HashMap<String, usize>,
  num_rows: u64,
  base_rows: u64,
  transaction_id: u64,
  target: CommitTarget,
  state: WriterState
}

impl CSTableWriter {
  /// Creates a new v0.2 file at `path`, truncating anything there.
  pub fn create_file<P: AsRef<Path>>(
    path: P,
    columns: Vec<ColumnConfig>
  ) -> Result<CSTableWriter> {
    validate_columns(&columns)?;

    let header = metadata::write_header_v2(&columns);
    let metablock_a_offset = header.len() as u64;
    let metablock_b_offset = metablock_a_offset + METABLOCK_SIZE as u64;
    let page_start = round_up(
      metablock_b_offset + METABLOCK_SIZE as u64, PAGE_GRANULE as u64);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(true)
      .open(path)?;
    file.write_all_at(&header, 0)?;
    // both slots start invalid; the first commit fills slot a
    file.write_all_at(&[0u8; METABLOCK_SIZE], metablock_a_offset)?;
    file.write_all_at(&[0u8; METABLOCK_SIZE], metablock_b_offset)?;

    let page_mgr = Rc::new(RefCell::new(
      PageManager::new(Device::File(file), page_start)));

    let target = CommitTarget::Disk {
      metablock_a_offset: metablock_a_offset,
      metablock_b_offset: metablock_b_offset
    };
    CSTableWriter::new(page_mgr, columns, 0, 0, target)
  }

  /// Attaches a writer to an in-memory arena, continuing after its
  /// last committed transaction.
  pub fn open_arena(file: &CSTableFile) -> Result<CSTableWriter> {
    let (transaction_id, num_rows) = file.get_transaction();
    CSTableWriter::new(
      file.page_manager().clone(),
      file.columns().to_vec(),
      num_rows,
      transaction_id,
      CommitTarget::Arena(file.clone()))
  }

  fn new(
    page_mgr: Rc<RefCell<PageManager>>,
    columns: Vec<ColumnConfig>,
    num_rows: u64,
    transaction_id: u64,
    target: CommitTarget
  ) -> Result<CSTableWriter> {
    let mut column_writers = Vec::with_capacity(columns.len());
    let mut columns_by_name = HashMap::new();
    for (i, config) in columns.iter().enumerate() {
      let writer = ColumnWriter::new(config.clone(), &page_mgr)?;
      column_writers.push(Rc::new(RefCell::new(writer)));
      columns_by_name.insert(config.column_name.clone(), i);
    }
    Ok(CSTableWriter {
      page_mgr: page_mgr,
      columns: columns,
      column_writers: column_writers,
      columns_by_name: columns_by_name,
      num_rows: num_rows,
      base_rows: num_rows,
      transaction_id: transaction_id,
      target: target,
      state: WriterState::Open
    })
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.columns_by_name.contains_key(name)
  }

  /// The shared column writer for `name`.
  pub fn get_column_writer(&self, name: &str) -> Result<Rc<RefCell<ColumnWriter>>> {
    match self.columns_by_name.get(name) {
      Some(&idx) => Ok(self.column_writers[idx].clone()),
      None => Err(not_found_err!("column not found: {}", name))
    }
  }

  pub fn columns(&self) -> &[ColumnConfig] {
    &self.columns
  }

  /// Declares one more outer record. Shredders call this once per
  /// record, after emitting the record's triples to the columns.
  pub fn add_row(&mut self) {
    self.num_rows += 1;
  }

  pub fn add_rows(&mut self, count: u64) {
    self.num_rows += count;
  }

  pub fn num_rows(&self) -> u64 {
    self.num_rows
  }

  /// Commits the table: flushes every column, validates the row-count
  /// invariant, then writes the page index and a metablock (disk) or
  /// records the transaction (arena).
  ///
  /// A failed row-count check aborts the commit without touching the
  /// previously committed state; the writer stays open so the caller
  /// can complete the short columns and commit again.
  pub fn commit(&mut self) -> Result<()> {
    if self.state != WriterState::Open {
      return Err(invariant_err!("writer has already committed"));
    }
    if self.page_mgr.borrow().is_poisoned() {
      return Err(io_err!("writer is poisoned by a previous I/O error"));
    }

    for column_writer in &self.column_writers {
      column_writer.borrow_mut().flush()?;
    }

    // this writer generation only saw the rows added on top of what
    // was already committed when it was opened
    let expected = self.num_rows - self.base_rows;
    for (i, column_writer) in self.column_writers.iter().enumerate() {
      let boundaries = column_writer.borrow().num_record_boundaries();
      if boundaries != expected {
        return Err(invariant_err!(
          "column '{}' has {} record boundaries, expected {}",
          self.columns[i].column_name, boundaries, expected));
      }
    }

    self.transaction_id += 1;
    match self.target {
      CommitTarget::Arena(ref arena) => {
        arena.commit_transaction(self.transaction_id, self.num_rows);
      },
      CommitTarget::Disk { metablock_a_offset, metablock_b_offset } => {
        let mut page_mgr = self.page_mgr.borrow_mut();
        let index = metadata::serialize_index(page_mgr.entries());
        let index_offset = page_mgr.end_offset();
        page_mgr.write_raw(index_offset, &index)?;
        page_mgr.sync()?;

        let metablock = MetaBlock {
          transaction_id: self.transaction_id,
          num_rows: self.num_rows,
          index_offset: index_offset,
          index_size: index.len() as u64
        };
        let slot = if self.transaction_id % 2 == 1 {
          metablock_a_offset
        } else {
          metablock_b_offset
        };
        page_mgr.write_raw(slot, &metablock.serialize())?;
        page_mgr.sync()?;
      }
    }
    self.state = WriterState::Committed;
    Ok(())
  }
}

fn validate_columns(columns: &[ColumnConfig]) -> Result<()> {
  let mut names = HashMap::new();
  let mut ids = HashMap::new();
  for config in columns {
    config.validate()?;
    if config.column_id == 0 {
      return Err(argument_err!(
        "column '{}' needs a column id greater than zero", config.column_name));
    }
    if names.insert(config.column_name.clone(), ()).is_some() {
      return Err(argument_err!("duplicate column name: {}", config.column_name));
    }
    if ids.insert(config.column_id, ()).is_some() {
      return Err(argument_err!("duplicate column id: {}", config.column_id));
    }
  }
  Ok(())
}

fn round_up(value: u64, granule: u64) -> u64 {
  (value + granule - 1) / granule * granule
}

#[cfg(test)]
mod tests {
  use super::*;
  use basic::{ColumnEncoding, ColumnType};
  use errors::CSTableError;
  use tempfile::TempDir;

  fn two_columns() -> Vec<ColumnConfig> {
    vec![
      ColumnConfig::new(
        1, "a", ColumnType::UNSIGNED_INT, ColumnEncoding::UINT64_LEB128, 0, 0)
        .unwrap(),
      ColumnConfig::new(
        2, "b", ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 0, 1)
        .unwrap()
    ]
  }

  #[test]
  fn test_duplicate_names_rejected() {
    let mut columns = two_columns();
    columns[1].column_name = "a".to_string();
    let tmp = TempDir::new().unwrap();
    let result = CSTableWriter::create_file(tmp.path().join("t.cst"), columns);
    match result {
      Err(CSTableError::Argument(_)) => {},
      other => panic!("expected Argument error, got {:?}", other.err())
    }
  }

  #[test]
  fn test_duplicate_ids_rejected() {
    let mut columns = two_columns();
    columns[1].column_id = 1;
    let tmp = TempDir::new().unwrap();
    assert!(CSTableWriter::create_file(tmp.path().join("t.cst"), columns).is_err());
  }

  #[test]
  fn test_unknown_column_lookup() {
    let tmp = TempDir::new().unwrap();
    let writer =
      CSTableWriter::create_file(tmp.path().join("t.cst"), two_columns()).unwrap();
    match writer.get_column_writer("nope") {
      Err(CSTableError::NotFound(_)) => {},
      other => panic!("expected NotFound, got {:?}", other.err())
    }
    assert!(writer.has_column("a"));
    assert!(!writer.has_column("nope"));
  }

  #[test]
  fn test_row_count_mismatch_aborts_commit() {
    let tmp = TempDir::new().unwrap();
    let mut writer =
      CSTableWriter::create_file(tmp.path().join("t.cst"), two_columns()).unwrap();
    {
      let a = writer.get_column_writer("a").unwrap();
      let b = writer.get_column_writer("b").unwrap();
      for i in 0..5 {
        a.borrow_mut().write_unsigned_int(0, 0, i).unwrap();
      }
      for _ in 0..4 {
        b.borrow_mut().write_null(0, 0).unwrap();
      }
    }
    writer.add_rows(5);

    match writer.commit() {
      Err(CSTableError::InvariantViolation(_)) => {},
      other => panic!("expected InvariantViolation, got {:?}", other)
    }

    // the short column can be completed and the commit retried
    {
      let b = writer.get_column_writer("b").unwrap();
      b.borrow_mut().write_null(0, 0).unwrap();
    }
    writer.commit().unwrap();
  }

  #[test]
  fn test_double_commit_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut writer =
      CSTableWriter::create_file(tmp.path().join("t.cst"), two_columns()).unwrap();
    writer.commit().unwrap();
    assert!(writer.commit().is_err());
  }

  #[test]
  fn test_missing_record_boundary_fails_commit() {
    // a repeated column that never saw an rlvl == 0 event
    let columns = vec![
      ColumnConfig::new(
        1, "tags", ColumnType::STRING, ColumnEncoding::STRING_PLAIN, 1, 1)
        .unwrap()
    ];
    let tmp = TempDir::new().unwrap();
    let mut writer =
      CSTableWriter::create_file(tmp.path().join("t.cst"), columns).unwrap();
    {
      let tags = writer.get_column_writer("tags").unwrap();
      tags.borrow_mut().write_string(1, 1, "x").unwrap();
    }
    writer.add_row();
    match writer.commit() {
      Err(CSTableError::InvariantViolation(_)) => {},
      other => panic!("expected InvariantViolation, got {:?}", other)
    }
  }
}
