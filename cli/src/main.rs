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

use std::io;
use std::process::ExitCode;

use ds_cli::dispatch;
use ds_cli::error::ErrorKind;
use ds_cli::orchestrator::Streams;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let mut error = io::stderr();
    let mut streams = Streams {
        input: &mut input,
        output: &mut output,
        error: &mut error,
    };

    match dispatch::run(&args, &mut streams) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            // Bad input lines were already reported by the run.
            if err.kind() != ErrorKind::ValueParse {
                eprintln!("ds: {err}");
            }
            tracing::debug!(err = ?err, "run aborted");
            ExitCode::FAILURE
        }
    }
}
