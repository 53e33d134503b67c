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

//! Contains the in-memory table arena.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use errors::Result;
use file::page_manager::{Device, PageManager};
use schema::ColumnConfig;

/// A table whose pages live in memory instead of a file.
///
/// An arena is written through `CSTableWriter::open_arena` and read
/// through `CSTableReader::open_arena`. Committing records a
/// `(transaction_id, num_rows)` pair here instead of serializing a
/// footer, so a caller can accumulate records across several
/// writer generations and serve reads of the last committed state at
/// any time. Clones share the same underlying pages and transaction.
#[derive(Clone)]
pub struct CSTableFile {
  page_mgr: Rc<RefCell<PageManager>>,
  columns: Rc<Vec<ColumnConfig>>,
  transaction: Rc<Cell<(u64, u64)>>
}

impl CSTableFile {
  pub fn new(columns: Vec<ColumnConfig>) -> Result<CSTableFile> {
    for config in &columns {
      config.validate()?;
      if config.column_id == 0 {
        return Err(argument_err!(
          "column '{}' needs a column id greater than zero", config.column_name));
      }
    }
    let page_mgr = PageManager::new(Device::Memory(Vec::new()), 0);
    Ok(CSTableFile {
      page_mgr: Rc::new(RefCell::new(page_mgr)),
      columns: Rc::new(columns),
      transaction: Rc::new(Cell::new((0, 0)))
    })
  }

  pub fn columns(&self) -> &[ColumnConfig] {
    &self.columns
  }

  pub fn page_manager(&self) -> &Rc<RefCell<PageManager>> {
    &self.page_mgr
  }

  /// The last committed `(transaction_id, num_rows)`. A fresh arena
  /// reports `(0, 0)`: nothing committed, nothing visible to readers.
  pub fn get_transaction(&self) -> (u64, u64) {
    self.transaction.get()
  }

  pub fn commit_transaction(&self, transaction_id: u64, num_rows: u64) {
    self.transaction.set((transaction_id, num_rows));
  }
}
