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

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use ds_cli::dispatch;
use ds_cli::dispatch::Outcome;
use ds_cli::kind::SketchKind;
use ds_cli::orchestrator::RunReport;
use ds_cli::orchestrator::Streams;
use googletest::assert_that;
use googletest::prelude::near;
use tempfile::TempDir;

struct Captured {
    report: RunReport,
    stdout: String,
    stderr: String,
}

fn ds(args: &[&str]) -> Captured {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let mut input: &[u8] = b"";
    let mut output = Vec::new();
    let mut error = Vec::new();
    let outcome = dispatch::run(
        &args,
        &mut Streams {
            input: &mut input,
            output: &mut output,
            error: &mut error,
        },
    )
    .unwrap();
    let Outcome::Ran(report) = outcome else {
        panic!("{args:?}: {outcome:?}");
    };
    Captured {
        report,
        stdout: String::from_utf8(output).unwrap(),
        stderr: String::from_utf8(error).unwrap(),
    }
}

fn write_lines(dir: &TempDir, name: &str, lines: impl IntoIterator<Item = String>) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path_str(&path)
}

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

fn out_path(dir: &TempDir, name: &str) -> String {
    path_str(&dir.path().join(name))
}

fn numbers(range: std::ops::RangeInclusive<u64>) -> impl Iterator<Item = String> {
    range.map(|i| i.to_string())
}

#[test]
fn test_save_then_reload_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=5_000));
    for kind in SketchKind::ALL {
        let first = out_path(&dir, &format!("{}-1.bin", kind.token()));
        let second = out_path(&dir, &format!("{}-2.bin", kind.token()));
        ds(&[kind.token(), "-d", &data, "-o", &first]);
        let run = ds(&[kind.token(), "-s", &first, "-o", &second]);
        assert_eq!(run.report.acquired, 1);
        assert!(run.stderr.is_empty(), "{}", run.stderr);
        let a = fs::read(&first).unwrap();
        let b = fs::read(&second).unwrap();
        assert_eq!(a, b, "{}", kind.token());
    }
}

#[test]
fn test_single_sketch_is_not_merged() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=3_000));
    let saved = out_path(&dir, "hll.bin");
    let direct = ds(&["hll", "-d", &data, "-o", &saved]);
    let reloaded = ds(&["hll", "-s", &saved]);
    assert_eq!(reloaded.report.acquired, 1);
    assert_eq!(reloaded.report.after_merge, 1);
    assert_eq!(direct.stdout, reloaded.stdout);
}

fn numbers_of(stdout: &str) -> Vec<f64> {
    stdout.split_whitespace().map(|v| v.parse().unwrap()).collect()
}

#[test]
fn test_merging_a_sketch_with_itself() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=5_000));
    for (token, bounds_flag) in [("hll", None), ("theta", Some("-b"))] {
        let saved = out_path(&dir, &format!("{token}.bin"));
        let single: Vec<&str> = [token, "-d", &data, "-o", &saved]
            .into_iter()
            .chain(bounds_flag)
            .collect();
        let alone = numbers_of(&ds(&single).stdout);

        let twice: Vec<&str> = [token, "-s", &saved, &saved]
            .into_iter()
            .chain(bounds_flag)
            .collect();
        let run = ds(&twice);
        assert_eq!(run.report.acquired, 2);
        assert_eq!(run.report.after_merge, 3);
        let merged = numbers_of(&run.stdout);
        assert_eq!(merged.len(), 3, "{token}: {}", run.stdout);
        assert!(
            merged[0] <= alone[1] && alone[1] <= merged[2],
            "{token}: {alone:?} vs {merged:?}"
        );
    }

    let small = write_lines(&dir, "small.txt", numbers(1..=50));
    let saved = out_path(&dir, "quant.bin");
    let alone = ds(&["quant", "-d", &small, "-o", &saved]);
    let twice = ds(&["quant", "-s", &saved, &saved]);
    assert_eq!(twice.report.after_merge, 3);
    assert_eq!(alone.stdout, twice.stdout);
}

#[test]
fn test_data_file_and_sketch_files_are_merged() {
    let dir = TempDir::new().unwrap();
    let a = out_path(&dir, "a.bin");
    let b = out_path(&dir, "b.bin");
    let data_a = write_lines(&dir, "a.txt", numbers(1..=1_000));
    let data_b = write_lines(&dir, "b.txt", numbers(1_001..=2_000));
    let data_c = write_lines(&dir, "c.txt", numbers(2_001..=3_000));
    ds(&["theta", "-d", &data_a, "-o", &a]);
    ds(&["theta", "-d", &data_b, "-o", &b]);

    let run = ds(&["theta", "-d", &data_c, "-s", &a, &b]);
    assert_eq!(
        run.report,
        RunReport {
            acquired: 3,
            after_merge: 4,
            help_shown: false,
        }
    );
    assert_eq!(run.stdout, "3000\n");
}

#[test]
fn test_theta_set_minus() {
    let dir = TempDir::new().unwrap();
    let a = out_path(&dir, "a.bin");
    let b = out_path(&dir, "b.bin");
    let data_a = write_lines(&dir, "a.txt", numbers(1..=20_000));
    let data_b = write_lines(&dir, "b.txt", numbers(15_001..=20_000));
    ds(&["theta", "-d", &data_a, "-o", &a]);
    ds(&["theta", "-d", &data_b, "-o", &b]);

    let run = ds(&["theta", "-s", &a, &b, "-m"]);
    let estimate: f64 = run.stdout.trim().parse().unwrap();
    assert_that!(estimate, near(15_000.0, 1_500.0));
}

#[test]
fn test_theta_intersection_within_union() {
    let dir = TempDir::new().unwrap();
    let a = out_path(&dir, "a.bin");
    let b = out_path(&dir, "b.bin");
    let data_a = write_lines(&dir, "a.txt", numbers(1..=10_000));
    let data_b = write_lines(&dir, "b.txt", numbers(5_001..=30_000));
    ds(&["theta", "-d", &data_a, "-o", &a]);
    ds(&["theta", "-d", &data_b, "-o", &b]);

    let union: f64 = ds(&["theta", "-s", &a, &b]).stdout.trim().parse().unwrap();
    let intersection: f64 = ds(&["theta", "-s", &a, &b, "-i"]).stdout.trim().parse().unwrap();
    assert!(intersection <= union, "{intersection} > {union}");
    assert_that!(intersection, near(5_000.0, 1_000.0));

    let bounds = ds(&["theta", "-s", &a, &b, "-b"]).stdout;
    let parts: Vec<f64> = bounds.split_whitespace().map(|v| v.parse().unwrap()).collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[0] <= parts[1] && parts[1] <= parts[2], "{bounds}");
}

#[test]
fn test_weighted_frequent_item_is_exact() {
    let dir = TempDir::new().unwrap();
    let lines = (1..=20_000u64).map(|i| if i < 19_976 { format!("1\t{i}") } else { format!("{i}\t{i}") });
    let data = write_lines(&dir, "weighted.txt", lines);

    let run = ds(&["freq", "-w", "-d", &data, "-f", "20000"]);
    assert_eq!(run.stdout, "20000\t20000\n");
}

#[test]
fn test_unreadable_sketch_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=100));
    let good = out_path(&dir, "good.bin");
    let garbage = write_lines(&dir, "garbage.bin", ["not a sketch".to_string()]);
    let missing = out_path(&dir, "missing.bin");
    ds(&["hll", "-d", &data, "-o", &good]);

    let run = ds(&["hll", "-s", &missing, &garbage, &good]);
    assert_eq!(run.report.acquired, 1);
    assert_eq!(run.stderr.lines().count(), 2, "{}", run.stderr);
    assert!(run.stderr.lines().all(|l| l.starts_with("loadInputSketches Error: ")));
    assert!(run.stdout.starts_with("100.0"), "{}", run.stdout);
}

#[test]
fn test_missing_data_file_shows_help() {
    let dir = TempDir::new().unwrap();
    let missing = out_path(&dir, "missing.txt");
    let run = ds(&["quant", "-d", &missing]);
    assert!(run.report.help_shown);
    assert_eq!(run.report.acquired, 0);
    assert!(run.stderr.starts_with("updateCurrentSketch Error: "), "{}", run.stderr);
    assert_eq!(run.stdout, SketchKind::Quantiles.describe_options());
}

#[test]
fn test_unwritable_output_is_reported() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=10));
    let target: PathBuf = dir.path().join("no-such-dir").join("out.bin");
    let run = ds(&["theta", "-d", &data, "-o", &path_str(&target)]);
    assert_eq!(run.stdout, "10\n");
    assert!(run.stderr.starts_with("saveCurrentSketch Error: "), "{}", run.stderr);
}

#[test]
fn test_uniform_samples_listed_when_saved() {
    let dir = TempDir::new().unwrap();
    let data = write_lines(&dir, "data.txt", numbers(1..=1_000));
    let saved = out_path(&dir, "rsamp.bin");
    let run = ds(&["rsamp", "-k", "16", "-d", &data, "-o", &saved]);
    let lines: Vec<&str> = run.stdout.lines().collect();
    assert_eq!(lines[..2], ["", "Uniform Samples"]);
    assert_eq!(lines.len(), 2 + 16);
}

#[test]
fn test_quantile_merge_keeps_every_value() {
    let dir = TempDir::new().unwrap();
    let a = out_path(&dir, "a.bin");
    let data_a = write_lines(&dir, "a.txt", numbers(1..=100));
    let data_b = write_lines(&dir, "b.txt", numbers(101..=200));
    ds(&["quant", "-d", &data_a, "-o", &a]);

    let run = ds(&["quant", "-k", "400", "-d", &data_b, "-s", &a, "-r", "0", "1"]);
    assert_eq!(run.report.after_merge, 3);
    assert_eq!(run.stdout, "0\t1\n1\t200\n");
}
