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

use ds_cli::dispatch;
use ds_cli::dispatch::Outcome;
use ds_cli::error::Error;
use ds_cli::error::ErrorKind;
use ds_cli::help;
use ds_cli::kind::SketchKind;
use ds_cli::orchestrator::Streams;

struct Captured {
    outcome: Result<Outcome, Error>,
    stdout: String,
    stderr: String,
}

fn ds(args: &[&str], stdin: &str) -> Captured {
    ds_bytes(args, stdin.as_bytes())
}

fn ds_bytes(args: &[&str], stdin: &[u8]) -> Captured {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let mut input = stdin;
    let mut output = Vec::new();
    let mut error = Vec::new();
    let outcome = dispatch::run(
        &args,
        &mut Streams {
            input: &mut input,
            output: &mut output,
            error: &mut error,
        },
    );
    Captured {
        outcome,
        stdout: String::from_utf8(output).unwrap(),
        stderr: String::from_utf8(error).unwrap(),
    }
}

#[test]
fn test_no_token_shows_help() {
    let run = ds(&[], "");
    assert_eq!(run.outcome.unwrap(), Outcome::Help);
    assert_eq!(run.stdout, help::top_level_help());
    assert!(run.stderr.is_empty());
}

#[test]
fn test_help_tokens() {
    for token in ["help", "-help", "--help", "HELP"] {
        let run = ds(&[token], "");
        assert_eq!(run.outcome.unwrap(), Outcome::Help, "{token}");
        assert_eq!(run.stdout, help::top_level_help());
    }
}

#[test]
fn test_man_prints_every_usage() {
    let run = ds(&["man"], "");
    assert_eq!(run.outcome.unwrap(), Outcome::Manual);
    assert_eq!(run.stdout, help::manual());
    for kind in SketchKind::ALL {
        assert!(run.stdout.contains(&kind.describe_options()));
    }
}

#[test]
fn test_unrecognized_token_prints_error_and_help() {
    let run = ds(&["bogus", "-k", "10"], "1\n");
    assert_eq!(run.outcome.unwrap(), Outcome::Unrecognized("bogus".to_string()));
    assert_eq!(run.stderr, "Unrecognized Sketch Type: bogus\n");
    assert_eq!(run.stdout, help::top_level_help());
}

#[test]
fn test_empty_stdin_gives_no_data_result() {
    let expected = [
        ("hll", "0.000000 0.000000 0.000000\n"),
        ("quant", ""),
        ("freq", ""),
        ("rsamp", ""),
        ("vsamp", ""),
        ("theta", "0\n"),
    ];
    for (token, stdout) in expected {
        let run = ds(&[token], "");
        match run.outcome.unwrap() {
            Outcome::Ran(report) => {
                assert_eq!(report.acquired, 1, "{token}");
                assert_eq!(report.after_merge, 1, "{token}");
                assert!(!report.help_shown, "{token}");
            }
            other => panic!("{token}: {other:?}"),
        }
        assert_eq!(run.stdout, stdout, "{token}");
        assert!(run.stderr.is_empty(), "{token}: {}", run.stderr);
    }
}

#[test]
fn test_tokens_are_case_insensitive_with_aliases() {
    let run = ds(&["Theta"], "a\nb\n\nb\n");
    assert_eq!(run.stdout, "2\n");
    let run = ds(&["set-sketch"], "a\nb\nc\n");
    assert_eq!(run.stdout, "3\n");
}

#[test]
fn test_kind_help_flag() {
    for args in [["hll", "-help"], ["hll", "--help"]] {
        let run = ds(&args, "1\n");
        match run.outcome.unwrap() {
            Outcome::Ran(report) => assert!(report.help_shown),
            other => panic!("{other:?}"),
        }
        assert_eq!(run.stdout, SketchKind::Cardinality.describe_options());
    }
}

#[test]
fn test_option_parse_error_stops_the_run() {
    let run = ds(&["theta", "-i", "-m"], "1\n");
    match run.outcome.unwrap() {
        Outcome::OptionError(message) => assert!(!message.is_empty()),
        other => panic!("{other:?}"),
    }
    assert!(run.stderr.starts_with("runCommandLineUtil Error: "), "{}", run.stderr);
    assert!(run.stdout.is_empty());

    let run = ds(&["hll", "--no-such-flag"], "");
    assert!(matches!(run.outcome.unwrap(), Outcome::OptionError(_)));
}

#[test]
fn test_bad_value_aborts_the_run() {
    let run = ds(&["quant"], "1\n2\nabc\n3\n");
    let err = run.outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueParse);
    assert_eq!(run.stderr, "Read Error: Item: abc\n");
    assert!(run.stdout.is_empty());
}

#[test]
fn test_bad_weight_aborts_the_run() {
    let run = ds(&["freq", "-w"], "3\ta\nx\tb\n");
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ValueParse);
    assert_eq!(run.stderr, "Read Error: Item: x\tb\n");
}

#[test]
fn test_weight_overflow_aborts_the_run() {
    let stdin = "9223372036854775807\ta\n9223372036854775807\tb\n";
    let run = ds(&["freq", "-w"], stdin);
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ValueParse);
    assert_eq!(run.stderr, "Read Error: Item: 9223372036854775807\tb\n");
}

#[test]
fn test_invalid_utf8_line_is_kept_as_an_item() {
    let mut stdin = Vec::new();
    for i in 1..=1000 {
        stdin.extend_from_slice(format!("{i}\n").as_bytes());
    }
    stdin.extend_from_slice(b"caf\xe9\n");
    let run = ds_bytes(&["theta"], &stdin);
    match run.outcome.unwrap() {
        Outcome::Ran(report) => {
            assert_eq!(report.acquired, 1);
            assert!(!report.help_shown);
        }
        other => panic!("{other:?}"),
    }
    assert_eq!(run.stdout, "1001\n");
    assert!(run.stderr.is_empty(), "{}", run.stderr);

    let run = ds_bytes(&["quant"], b"1\n\xff\n");
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ValueParse);
    assert_eq!(run.stderr, "Read Error: Item: \u{FFFD}\n");
}

#[test]
fn test_crlf_line_endings_are_trimmed() {
    let crlf = ds(&["hll"], "a\r\nb\r\nb\r\n");
    let lf = ds(&["hll"], "a\nb\nb\n");
    assert_eq!(crlf.stdout, lf.stdout);
    let run = ds(&["quant", "-r", "1"], "1\r\n2\r\n");
    assert_eq!(run.stdout, "1\t2\n");
}

#[test]
fn test_bad_query_value_aborts_the_run() {
    let run = ds(&["quant", "-v", "abc"], "1\n2\n");
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ValueParse);
    assert_eq!(run.stderr, "Read Error: Item: abc\n");
}

#[test]
fn test_invalid_sizing_is_fatal() {
    let run = ds(&["hll", "-lgk", "40"], "1\n");
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ConfigInvalid);
    let run = ds(&["freq", "-k", "1000"], "1\n");
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::ConfigInvalid);
}

#[test]
fn test_print_appends_summary() {
    let run = ds(&["hll", "-p"], "a\nb\n");
    let lines: Vec<&str> = run.stdout.lines().collect();
    assert!(lines[0].starts_with("2.0"), "{}", run.stdout);
    assert_eq!(lines[1], "");
    assert_eq!(lines[2], "### HLL sketch summary:");
    assert_eq!(lines.last(), Some(&"### End sketch summary"));
}
