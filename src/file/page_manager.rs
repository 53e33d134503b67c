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

//! Contains the page manager: page allocation, the per-stream page
//! index and positional page I/O against a file or an in-memory arena.

use std::cmp;
use std::collections::HashMap;
use std::fs::File;
use std::os::unix::fs::FileExt;

use column::page::{PageIndexEntry, PageIndexKey, PageRef};
use errors::Result;

/// Page allocations are rounded up to this granule so that released
/// pages have a chance of fitting later allocations.
pub const PAGE_GRANULE: u32 = 512;

// ----------------------------------------------------------------------
// Backing devices

/// Where page bytes live: a real file, or a growable buffer for tables
/// that are never (or not yet) written to disk.
pub enum Device {
  File(File),
  Memory(Vec<u8>)
}

impl Device {
  fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
    match *self {
      Device::File(ref file) => {
        file.read_exact_at(buf, offset)?;
        Ok(())
      },
      Device::Memory(ref data) => {
        let start = offset as usize;
        let end = start + buf.len();
        if end > data.len() {
          return Err(io_err!(
            "read of [{}, {}) past end of buffer ({})", start, end, data.len()));
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
      }
    }
  }

  fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
    match *self {
      Device::File(ref file) => {
        file.write_all_at(data, offset)?;
        Ok(())
      },
      Device::Memory(ref mut buffer) => {
        let start = offset as usize;
        let end = start + data.len();
        if buffer.len() < end {
          buffer.resize(end, 0);
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
      }
    }
  }

  fn sync(&self) -> Result<()> {
    match *self {
      Device::File(ref file) => {
        file.sync_all()?;
        Ok(())
      },
      Device::Memory(_) => Ok(())
    }
  }
}

// ----------------------------------------------------------------------
// Page manager

/// Owns the page region of one table: a monotonic allocation cursor,
/// the ordered page index and a free list of released ranges.
///
/// A writer-side manager allocates and writes pages; a reader-side
/// manager is built from a parsed index and only ever reads. Any device
/// error poisons the manager, after which writes and commits are
/// refused.
pub struct PageManager {
  device: Device,
  allocated_offset: u64,
  entries: Vec<PageIndexEntry>,
  entry_by_offset: HashMap<u64, usize>,
  free_list: Vec<PageRef>,
  poisoned: bool
}

impl PageManager {
  /// Creates an empty manager whose first page will be allocated at
  /// `start_offset`.
  pub fn new(device: Device, start_offset: u64) -> PageManager {
    PageManager {
      device: device,
      allocated_offset: start_offset,
      entries: Vec::new(),
      entry_by_offset: HashMap::new(),
      free_list: Vec::new(),
      poisoned: false
    }
  }

  /// Creates a read-side manager from a parsed page index.
  pub fn open(device: Device, index: Vec<PageIndexEntry>) -> PageManager {
    let mut end = 0u64;
    let mut by_offset = HashMap::new();
    for (i, entry) in index.iter().enumerate() {
      end = cmp::max(end, entry.page.offset + entry.page.size as u64);
      by_offset.insert(entry.page.offset, i);
    }
    PageManager {
      device: device,
      allocated_offset: end,
      entries: index,
      entry_by_offset: by_offset,
      free_list: Vec::new(),
      poisoned: false
    }
  }

  /// Allocates a page of at least `min_size` bytes for the stream
  /// `key`: best fit from the free list (smallest sufficient size, ties
  /// broken by lowest offset) or an extension of the device. The page
  /// is appended to the key's stream in index order.
  pub fn allocate(&mut self, key: PageIndexKey, min_size: u32) -> Result<PageRef> {
    self.check_poisoned()?;
    let size = round_up_to_granule(min_size);

    let mut best: Option<usize> = None;
    for (i, candidate) in self.free_list.iter().enumerate() {
      if candidate.size < size {
        continue;
      }
      best = match best {
        None => Some(i),
        Some(j) => {
          let current = &self.free_list[j];
          if candidate.size < current.size ||
             (candidate.size == current.size && candidate.offset < current.offset) {
            Some(i)
          } else {
            Some(j)
          }
        }
      };
    }

    let page = match best {
      Some(i) => self.free_list.remove(i),
      None => {
        let offset = self.allocated_offset;
        self.allocated_offset += size as u64;
        PageRef { offset: offset, size: size }
      }
    };

    let idx = self.entries.len();
    self.entries.push(PageIndexEntry {
      key: key,
      page: page,
      logical_length: 0
    });
    self.entry_by_offset.insert(page.offset, idx);
    Ok(page)
  }

  /// Positionally writes a page's bytes. Every page is written exactly
  /// once, before commit; `logical_length` is the number of values the
  /// page encodes and is recorded in its index entry.
  pub fn write(&mut self, page: &PageRef, data: &[u8], logical_length: u32) -> Result<()> {
    self.check_poisoned()?;
    if data.len() > page.size as usize {
      return Err(argument_err!(
        "page write of {} bytes exceeds page size {}", data.len(), page.size));
    }
    let idx = match self.entry_by_offset.get(&page.offset) {
      Some(&idx) => idx,
      None => {
        return Err(argument_err!("write to unallocated page at offset {}", page.offset));
      }
    };
    if let Err(e) = self.device.write_at(page.offset, data) {
      self.poisoned = true;
      return Err(e);
    }
    self.entries[idx].logical_length = logical_length;
    Ok(())
  }

  /// Positionally reads a page's bytes.
  pub fn read(&self, page: &PageRef) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; page.size as usize];
    self.device.read_at(page.offset, &mut buf)?;
    Ok(buf)
  }

  /// The ordered pages of one stream.
  pub fn pages(&self, key: PageIndexKey) -> Vec<PageIndexEntry> {
    self.entries.iter().filter(|e| e.key == key).cloned().collect()
  }

  /// All index entries, in allocation order.
  pub fn entries(&self) -> &[PageIndexEntry] {
    &self.entries
  }

  /// Returns a page's range to the free list and drops it from the
  /// index. Only writers release pages, and only between write passes.
  pub fn release(&mut self, page: PageRef) {
    if let Some(idx) = self.entry_by_offset.remove(&page.offset) {
      self.entries.remove(idx);
      self.entry_by_offset.clear();
      for (i, entry) in self.entries.iter().enumerate() {
        self.entry_by_offset.insert(entry.page.offset, i);
      }
    }
    self.free_list.push(page);
  }

  /// First byte past all allocated pages.
  pub fn end_offset(&self) -> u64 {
    self.allocated_offset
  }

  /// Writes bytes outside the page region (footer structures).
  pub fn write_raw(&mut self, offset: u64, data: &[u8]) -> Result<()> {
    self.check_poisoned()?;
    if let Err(e) = self.device.write_at(offset, data) {
      self.poisoned = true;
      return Err(e);
    }
    Ok(())
  }

  pub fn sync(&mut self) -> Result<()> {
    self.check_poisoned()?;
    if let Err(e) = self.device.sync() {
      self.poisoned = true;
      return Err(e);
    }
    Ok(())
  }

  pub fn is_poisoned(&self) -> bool {
    self.poisoned
  }

  fn check_poisoned(&self) -> Result<()> {
    if self.poisoned {
      Err(io_err!("page manager is poisoned by a previous I/O error"))
    } else {
      Ok(())
    }
  }
}

fn round_up_to_granule(size: u32) -> u32 {
  let granules = (size + PAGE_GRANULE - 1) / PAGE_GRANULE;
  cmp::max(granules, 1) * PAGE_GRANULE
}
