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

//! The `ds` command line: build, merge, query and save sketches from text streams.
//!
//! [`dispatch::run`] maps the first token to a [`kind::SketchKind`], parses that kind's flags
//! into an [`options::OptionSet`] and hands both to an [`orchestrator::Orchestrator`].
//! All output goes through the [`orchestrator::Streams`] given by the caller.

pub mod dispatch;
pub mod error;
pub mod help;
pub mod kind;
pub mod options;
pub mod orchestrator;
pub mod query;
