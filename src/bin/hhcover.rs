// Copyright 2023 The hhcode Contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! hhcover: rasterize area specs from the command line.
//!
//! ```bash
//! hhcover --format cells -- +circle:48.0:-4.5:5000 -circle:48.0:-4.55:3000
//! hhcover --config hhcover.toml --limit 64 @areas.txt
//! ```
//!
//! Terms starting with `-` must follow `--`. An argument `@FILE` (no `:`)
//! reads whitespace separated terms from FILE.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hhcode::hhcode::cell;
use hhcode::hhcode::config::CoverageConfig;
use hhcode::{AreaSpec, Coverage, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One hex cell per line, coarsest first
    Cells,
    /// Space separated hex cells on one line
    Hex,
    /// Regular expression over point hex strings
    Regexp,
    /// Serialized shape, hex encoded
    Bytes,
}

#[derive(Parser, Debug)]
#[command(name = "hhcover", version, about = "Rasterize area specs into HHCode cell coverages")]
struct Args {
    /// TOML file with [coverage] and [logging] tables
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resolution (even, 2 to 32), or 0/negative for an automatic one refined by that many steps
    #[arg(long, allow_hyphen_values = true)]
    resolution: Option<i32>,

    /// Largest cell diagonal as a fraction of each term's diagonal, used when no resolution is set
    #[arg(long)]
    pct_error: Option<f64>,

    /// Cell budget for subtraction and intersection
    #[arg(long)]
    max_cells: Option<usize>,

    /// Reduce the result to at most this many cells
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Hex)]
    format: Format,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Area spec terms, or @FILE
    #[arg(required = true, allow_hyphen_values = true, value_name = "SPEC")]
    specs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoggingSettings {
    level: String,
    json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    coverage: CoverageConfig,
    logging: LoggingSettings,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Command line flags take precedence over the file.
    fn apply(&mut self, args: &Args) {
        if let Some(resolution) = args.resolution {
            self.coverage.resolution = resolution;
        }
        if let Some(pct_error) = args.pct_error {
            self.coverage.pct_error = Some(pct_error);
        }
        if let Some(max_cells) = args.max_cells {
            self.coverage.max_cells = Some(max_cells);
        }
        if let Some(limit) = args.limit {
            self.coverage.limit_cells = Some(limit);
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }
}

/// Logs go to stderr; stdout carries the result. `RUST_LOG` wins over the
/// configured level.
fn setup_logging(config: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_file(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()?;
    }
    debug!(level = %config.level, json = config.json_format, "logging initialized");
    Ok(())
}

/// Joins the terms, replacing `@FILE` arguments with the file's content.
fn expand_specs(specs: &[String]) -> Result<String> {
    let mut terms = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec.strip_prefix('@') {
            Some(path) if !path.contains(':') => {
                let content = fs::read_to_string(path).with_context(|| format!("reading specs from {}", path))?;
                terms.push(content);
            }
            _ => terms.push(spec.clone()),
        }
    }
    Ok(terms.join(" "))
}

fn render(coverage: &Coverage, format: Format) -> String {
    match format {
        Format::Cells => coverage
            .iter()
            .map(|(res, code)| cell::to_hex(code, res))
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Hex => coverage.to_string(),
        Format::Regexp => Shape::from_coverage(coverage).to_regexp(),
        Format::Bytes => Shape::from_coverage(coverage)
            .serialize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    config.apply(&args);
    setup_logging(&config.logging)?;

    let text = expand_specs(&args.specs)?;
    let spec: AreaSpec = text.parse().context("parsing area spec")?;
    info!(terms = spec.terms().len(), "parsed area spec");

    let started = Instant::now();
    let coverage = spec.to_coverage(&config.coverage).context("computing coverage")?;
    info!(
        cells = coverage.cell_count(),
        resolutions = coverage.resolutions().len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "coverage computed"
    );

    println!("{}", render(&coverage, args.format));
    Ok(())
}
