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

//! An implementation of the cstable columnar table file format.
//!
//! A cstable file persists nested, semi-structured records as
//! column-striped pages. Optional and repeated fields are encoded with
//! Dremel-style repetition and definition levels, so that every leaf
//! column is a stream of `(rlvl, dlvl, value)` triples which can be
//! written and scanned independently of all other columns.
//!
//! Writing goes through [`file::writer::CSTableWriter`], which hands out
//! one [`column::writer::ColumnWriter`] per configured column and commits
//! the table atomically. Reading goes through
//! [`file::reader::CSTableReader`], which parses the footer, rebuilds the
//! page index and hands out per-column readers.

extern crate byteorder;
extern crate memmap;
#[macro_use]
extern crate quick_error;
extern crate sha1;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

#[macro_use]
pub mod errors;
pub mod basic;
pub mod schema;
pub mod util;
pub mod encodings;
pub mod column;
pub mod file;
pub mod record;
