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

//! Contains page references, page index entries and the page sources
//! that feed encoded pages to the page-level decoders.

use std::cell::RefCell;
use std::rc::Rc;

use memmap::Mmap;

use basic::PageIndexEntryType;
use errors::Result;
use file::page_manager::PageManager;

/// A contiguous byte range `[offset, offset + size)` inside the file,
/// holding one encoded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
  pub offset: u64,
  pub size: u32
}

/// Identifies one logical page stream: the values, repetition level or
/// definition level stream of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageIndexKey {
  pub column_id: u32,
  pub entry_type: PageIndexEntryType
}

impl PageIndexKey {
  pub fn values(column_id: u32) -> PageIndexKey {
    PageIndexKey { column_id: column_id, entry_type: PageIndexEntryType::VALUES }
  }

  pub fn rlevel(column_id: u32) -> PageIndexKey {
    PageIndexKey { column_id: column_id, entry_type: PageIndexEntryType::RLEVEL }
  }

  pub fn dlevel(column_id: u32) -> PageIndexKey {
    PageIndexKey { column_id: column_id, entry_type: PageIndexEntryType::DLEVEL }
  }
}

/// One entry of the page index: a page, the stream it belongs to and
/// the number of logical values encoded in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageIndexEntry {
  pub key: PageIndexKey,
  pub page: PageRef,
  pub logical_length: u32
}

// ----------------------------------------------------------------------
// Page sources

/// An ordered source of encoded pages for one sub-stream. Decoders pull
/// `(bytes, logical value count)` pairs from a source and never care
/// whether the pages come out of a page manager (v0.2) or out of a
/// section of a memory-mapped legacy file (v0.1).
pub enum PageSource {
  /// Pages located through the page manager's index.
  Managed {
    page_mgr: Rc<RefCell<PageManager>>,
    entries: Vec<PageIndexEntry>
  },
  /// One section of a memory-mapped v0.1 column body, treated as a
  /// single page.
  Slice {
    mmap: Rc<Mmap>,
    offset: u64,
    size: u32,
    values: u32
  }
}

impl PageSource {
  /// A source over the pages currently indexed for `key`. The entry
  /// list is snapshotted here; pages allocated later are not visible.
  pub fn managed(page_mgr: &Rc<RefCell<PageManager>>, key: PageIndexKey) -> PageSource {
    let entries = page_mgr.borrow().pages(key);
    PageSource::Managed { page_mgr: page_mgr.clone(), entries: entries }
  }

  /// A source over one `[offset, offset + size)` section of a shared
  /// memory map, containing `values` logical values.
  pub fn slice(mmap: Rc<Mmap>, offset: u64, size: u32, values: u32) -> PageSource {
    PageSource::Slice { mmap: mmap, offset: offset, size: size, values: values }
  }

  pub fn num_pages(&self) -> usize {
    match *self {
      PageSource::Managed { ref entries, .. } => entries.len(),
      PageSource::Slice { .. } => 1
    }
  }

  /// Reads page `idx`, returning its bytes and logical value count.
  pub fn read_page(&self, idx: usize) -> Result<(Vec<u8>, u32)> {
    match *self {
      PageSource::Managed { ref page_mgr, ref entries } => {
        let entry = &entries[idx];
        let data = page_mgr.borrow().read(&entry.page)?;
        Ok((data, entry.logical_length))
      },
      PageSource::Slice { ref mmap, offset, size, values } => {
        debug_assert_eq!(idx, 0);
        let start = offset as usize;
        let end = start + size as usize;
        if end > mmap.len() {
          return Err(format_err!(
            "column body section [{}, {}) lies past the end of the file ({})",
            start, end, mmap.len()));
        }
        Ok((mmap[start..end].to_vec(), values))
      }
    }
  }
}
