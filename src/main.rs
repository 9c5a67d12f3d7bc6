// Copyright 2025 Google LLC
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

//! Command-line interface for the grounder.

use aether::error::{Diagnostic, GroundingReporter};
use aether::pipeline::{GroundOptions, GroundingPipeline};
use aether::statement::Program;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "grounder")]
#[command(about = "Grounds an Answer Set Programming program", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ground a program, printing the fully-instantiated program as JSON.
    Ground {
        /// Input program as JSON; reads stdin if omitted.
        input: Option<PathBuf>,

        /// Write the ground program here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print grounding stats (component count, iterations, etc.) to stderr.
        #[arg(short, long)]
        stats: bool,
    },

    /// Rewrite and safety-check a program without instantiating it.
    Check {
        /// Input program as JSON; reads stdin if omitted.
        input: Option<PathBuf>,
    },
}

fn read_program(input: &Option<PathBuf>) -> io::Result<Program> {
    let text = match input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_program(program: &Program, output: &Option<PathBuf>) -> io::Result<()> {
    let text = serde_json::to_string_pretty(program).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    match output {
        Some(path) => fs::write(path, text),
        None => {
            let mut stdout = io::stdout();
            writeln!(stdout, "{text}")
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = GroundOptions { verbose: cli.verbose, use_colors: !cli.no_color, check_only: false, ..GroundOptions::default() };
    let reporter = GroundingReporter::new(!cli.no_color);

    match &cli.command {
        Some(Commands::Ground { input, output, stats }) => {
            let program = read_program(input).map_err(|e| format!("failed to read program: {e}"))?;
            let mut pipeline = GroundingPipeline::new(options);
            let result = pipeline.ground(program).map_err(|e| e.to_string())?;

            reporter.report_warnings(&result.warnings);
            write_program(&result.program, output).map_err(|e| format!("failed to write output: {e}"))?;

            if *stats {
                eprintln!(
                    "components={} iterations={} ground_statements={} aggregate_groups={} choice_groups={} discarded={} total_ms={}",
                    result.stats.components,
                    result.stats.iterations,
                    result.stats.output_statements,
                    result.stats.aggregate_groups,
                    result.stats.choice_groups,
                    result.stats.discarded_statements,
                    result.stats.total_time_ms
                );
            }
            Ok(())
        }
        Some(Commands::Check { input }) => {
            let program = read_program(input).map_err(|e| format!("failed to read program: {e}"))?;
            let mut pipeline = GroundingPipeline::new(GroundOptions { check_only: true, ..options });
            match pipeline.ground(program) {
                Ok(_) => {
                    eprintln!("program is safe");
                    Ok(())
                }
                Err(e) => {
                    reporter.report(&Diagnostic::error(e.to_string(), None));
                    Err("safety check failed".to_string())
                }
            }
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            Err("no subcommand provided".to_string())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("{message}");
        process::exit(1);
    }
}
