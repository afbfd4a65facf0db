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

//! Resolved flags of one sub-command invocation.

use std::collections::BTreeMap;
use std::str::FromStr;

use clap::Command;
use clap::parser::ValueSource;

use crate::error::Error;

/// Flags given on the command line, keyed by argument id.
///
/// A flag without values maps to an empty list. Defaults never appear here; the adapters apply
/// their own when an option is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    values: BTreeMap<String, Vec<String>>,
}

impl OptionSet {
    /// Parses `args` (without the sub-command token) against `command`.
    pub fn parse(command: &mut Command, args: &[String]) -> Result<Self, Error> {
        let args = normalize_long_names(command, args);
        let ids: Vec<(String, bool)> = command
            .get_arguments()
            .map(|arg| (arg.get_id().as_str().to_string(), arg.get_action().takes_values()))
            .collect();

        let matches = command
            .try_get_matches_from_mut(args)
            .map_err(|err| Error::option_parse(first_line(&err.to_string())))?;

        let mut values = BTreeMap::new();
        for (id, takes_values) in ids {
            if matches.value_source(&id) != Some(ValueSource::CommandLine) {
                continue;
            }
            let given = if takes_values {
                matches
                    .get_many::<String>(&id)
                    .map(|vals| vals.cloned().collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };
            values.insert(id, given);
        }
        Ok(Self { values })
    }

    pub fn has(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// First value of `id`, if given.
    pub fn value(&self, id: &str) -> Option<&str> {
        self.values
            .get(id)
            .and_then(|vals| vals.first())
            .map(String::as_str)
    }

    /// All values of `id`; empty when absent or given without values.
    pub fn values(&self, id: &str) -> &[String] {
        self.values.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Parses the value of a sizing option.
    pub fn parse_value<T>(&self, id: &'static str) -> Result<Option<T>, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.value(id) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|err| {
                Error::config_invalid(id, format!("invalid value '{raw}' for {id}: {err}"))
            }),
        }
    }
}

// `-lgk 10` and `-help` spell long options with one dash.
fn normalize_long_names(command: &Command, args: &[String]) -> Vec<String> {
    let longs: Vec<&str> = command
        .get_arguments()
        .flat_map(|arg| {
            arg.get_long()
                .into_iter()
                .chain(arg.get_all_aliases().unwrap_or_default())
        })
        .collect();
    args.iter()
        .map(|token| match token.strip_prefix('-') {
            Some(name) if name.len() > 1 && !name.starts_with('-') && longs.contains(&name) => {
                format!("-{token}")
            }
            _ => token.clone(),
        })
        .collect()
}

fn first_line(message: &str) -> String {
    let line = message.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}
