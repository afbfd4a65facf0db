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

//! Top-level usage and manual text.

use crate::kind::SketchKind;

const INDENT: &str = "                  ";

/// Usage shown for `ds`, `ds help` and unrecognized sketch types.
pub fn top_level_help() -> String {
    let mut text = String::new();
    text.push_str("NAME\n");
    text.push_str("  ds              This command-line application provides sketches for uniques,\n");
    line(&mut text, "distributions (quantiles, cdf, pmf), frequent items, set expressions,");
    line(&mut text, "and sampling of uniform and weighted items.");
    text.push('\n');

    text.push_str("SYNOPSIS\n");
    entry(&mut text, "ds", &["This help text."]);
    entry(&mut text, "ds help", &["This help text."]);
    entry(&mut text, "ds SKETCH <OPT>", &["Use this SKETCH with options."]);
    entry(&mut text, "ds SKETCH -help", &["Get options help for this SKETCH."]);
    entry(&mut text, "ds man", &["This help text followed by the options of every SKETCH."]);

    text.push_str("SKETCHES\n");
    for kind in SketchKind::ALL {
        entry(&mut text, &format!("ds {}", kind.token()), description(kind));
    }
    text
}

/// The top-level help followed by the usage of every sketch kind.
pub fn manual() -> String {
    let mut text = top_level_help();
    for kind in SketchKind::ALL {
        text.push('\n');
        text.push_str(&kind.describe_options());
    }
    text
}

fn description(kind: SketchKind) -> &'static [&'static str] {
    match kind {
        SketchKind::FrequentItems => &[
            "Frequency sketch for finding the heavy hitter objects from a stream of",
            "integer weighted items. This sketch accumulates the weights keyed on the items.",
            "The default is each line is a single item with an assumed weight of 1.",
        ],
        SketchKind::Cardinality => {
            &["HyperLogLog (HLL) sketch for estimating cardinalities from a stream of items."]
        }
        SketchKind::Quantiles => {
            &["Quantiles sketch for estimating distributions from a stream of numeric values."]
        }
        SketchKind::UniformSample => {
            &["Reservoir sketch for uniform sampling of a stream of integers into max k samples."]
        }
        SketchKind::SetSketch => {
            &["Theta sketch for estimating set expression cardinalities of a stream of items."]
        }
        SketchKind::WeightedSample => &[
            "VarOpt sketch for weighted sampling of a stream of pre-aggregated, weighted items",
            "into max k samples. This sketch does not accumulate weights of identical items.",
            "The default is each line is a single item with an assumed weight of 1.0.",
        ],
    }
}

fn entry(text: &mut String, name: &str, lines: &[&str]) {
    text.push_str(&format!("  {name:<16}"));
    for (i, body) in lines.iter().enumerate() {
        if i == 0 {
            text.push_str(body);
            text.push('\n');
        } else {
            line(text, body);
        }
    }
    text.push('\n');
}

fn line(text: &mut String, body: &str) {
    text.push_str(INDENT);
    text.push_str(body);
    text.push('\n');
}
