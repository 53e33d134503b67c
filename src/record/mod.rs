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

//! The contract between this crate and external record shredders and
//! assemblers.
//!
//! The core never sees whole records. An external shredder translates
//! each nested record into, per leaf column, a finite sequence of
//! `(rlvl, dlvl, value)` triples and feeds them to the column writers;
//! an external assembler pulls the same triples back out of column
//! readers and rebuilds records. The contract is:
//!
//! - Exactly one `rlvl == 0` triple per outer record per column, even
//!   when the record contributes no value to the column (then the one
//!   triple is `(0, dlvl < dlevel_max, no value)`).
//! - A value is attached iff `dlvl == dlevel_max`, and its type matches
//!   the column's logical type.
//! - Columns may be interleaved freely; within one column, triples are
//!   consumed in exactly the order they were emitted.
//! - [`file::writer::CSTableWriter::add_row`] is called once per outer
//!   record.

pub mod api;
