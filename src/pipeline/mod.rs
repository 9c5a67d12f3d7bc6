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

//! Orchestrates a full grounding run: rewrite, safety check, dependency/
//! component graph construction, instantiation, and propagation (spec
//! §4.1-§4.6), in that order.

use crate::error::{GroundingError, InconsistencyWarning};
use crate::grounder::{self, GroundingStats, InstantiateOptions};
use crate::propagator;
use crate::statement::{Program, Statement};
use crate::symbols::DependencyGraph;
use std::collections::HashMap;
use std::time::Instant;

/// Knobs for a single grounding run (spec §7's ambient configuration: no
/// textual source, no optimization levels, just what affects observable
/// output and diagnostics).
#[derive(Debug, Clone)]
pub struct GroundOptions {
    /// Print a phase-by-phase timing/progress trace to stderr.
    pub verbose: bool,
    /// Colorize diagnostics reported through [`crate::error::GroundingReporter`].
    pub use_colors: bool,
    /// Stop after rewriting and safety-checking; do not instantiate or
    /// propagate. Useful for validating a program without grounding it.
    pub check_only: bool,
    /// Fan out independent exit-rule instantiation within a component
    /// across threads via rayon (see `grounder::InstantiateOptions`).
    pub parallel: bool,
    /// Record per-phase wall-clock time into `GroundingRunStats::phase_times`.
    pub enable_profiling: bool,
    /// Fixpoint safety valve per recursive component.
    pub max_iterations: usize,
}

impl Default for GroundOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            use_colors: true,
            check_only: false,
            parallel: true,
            enable_profiling: true,
            max_iterations: InstantiateOptions::default().max_iterations,
        }
    }
}

/// The grounded program plus everything observed while producing it.
#[derive(Debug, Clone)]
pub struct GroundingResult {
    pub program: Program,
    pub warnings: Vec<InconsistencyWarning>,
    pub stats: GroundingRunStats,
}

/// Aggregates the grounder's own [`GroundingStats`] with propagator
/// counters and per-phase wall-clock time, mirroring the teacher's
/// `CompilationStats { phase_times: HashMap<String, u128>, .. }` shape.
#[derive(Debug, Clone, Default)]
pub struct GroundingRunStats {
    pub input_statements: usize,
    pub output_statements: usize,
    pub components: usize,
    pub iterations: usize,
    pub aggregate_groups: usize,
    pub choice_groups: usize,
    pub discarded_statements: usize,
    pub total_time_ms: u128,
    pub phase_times: HashMap<String, u128>,
}

impl GroundingRunStats {
    fn from_grounder(stats: &GroundingStats) -> Self {
        Self {
            components: stats.components,
            iterations: stats.iterations,
            output_statements: stats.ground_rules,
            ..Self::default()
        }
    }
}

/// Drives a program through the grounding passes described at spec §4:
/// rewrite aggregates/choices, check safety, build the predicate
/// dependency and component graph, instantiate component-by-component,
/// then reassemble aggregate/choice literals from their ground
/// decomposition.
pub struct GroundingPipeline {
    options: GroundOptions,
}

impl GroundingPipeline {
    pub fn new(options: GroundOptions) -> Self {
        Self { options }
    }

    pub fn ground(&mut self, program: Program) -> Result<GroundingResult, GroundingError> {
        let run_start = Instant::now();
        let mut phase_times = HashMap::new();
        let input_statements = program.statements.len();

        self.trace(&format!("grounding program with {input_statements} statement(s)"));

        let phase_start = Instant::now();
        program.check_safety()?;
        self.record_phase(&mut phase_times, "safety", phase_start);
        self.trace("safety check passed");

        let phase_start = Instant::now();
        let (rewritten, meta) = crate::rewrite::rewrite_program(program);
        self.record_phase(&mut phase_times, "rewrite", phase_start);
        self.trace(&format!("rewrote to {} statement(s) (incl. auxiliary rules)", rewritten.statements.len()));

        if self.options.check_only {
            let mut stats = GroundingRunStats { input_statements, ..Default::default() };
            stats.total_time_ms = run_start.elapsed().as_millis();
            stats.phase_times = phase_times;
            return Ok(GroundingResult { program: rewritten, warnings: Vec::new(), stats });
        }

        let phase_start = Instant::now();
        let dep_graph = DependencyGraph::from_program(&rewritten);
        let components = dep_graph.component_graph(&rewritten);
        self.record_phase(&mut phase_times, "components", phase_start);
        self.trace(&format!("found {} component(s)", components.components.len()));

        let instantiate_options = InstantiateOptions { parallel: self.options.parallel, max_iterations: self.options.max_iterations };
        let phase_start = Instant::now();
        let (ground_statements, atoms, grounding_stats) = grounder::instantiate_program(&rewritten, &components, instantiate_options)?;
        self.record_phase(&mut phase_times, "instantiate", phase_start);
        self.trace(&format!(
            "instantiated {} ground statement(s) over {} atom(s) in {} iteration(s)",
            ground_statements.len(),
            atoms.len(),
            grounding_stats.iterations
        ));

        let phase_start = Instant::now();
        let (assembled, propagation_stats) = propagator::propagate_program(ground_statements, &meta)?;
        self.record_phase(&mut phase_times, "propagate", phase_start);
        self.trace(&format!(
            "propagated {} aggregate group(s), {} choice group(s); discarded {} unsatisfiable statement(s)",
            propagation_stats.aggregate_groups, propagation_stats.choice_groups, propagation_stats.discarded
        ));

        let warnings = collect_warnings(&assembled);

        let mut stats = GroundingRunStats::from_grounder(&grounding_stats);
        stats.input_statements = input_statements;
        stats.output_statements = assembled.len();
        stats.aggregate_groups = propagation_stats.aggregate_groups;
        stats.choice_groups = propagation_stats.choice_groups;
        stats.discarded_statements = propagation_stats.discarded;
        stats.total_time_ms = run_start.elapsed().as_millis();
        stats.phase_times = phase_times;

        let ground_program = Program { statements: assembled, query: rewritten.query };
        Ok(GroundingResult { program: ground_program, warnings, stats })
    }

    fn trace(&self, message: &str) {
        if self.options.verbose {
            eprintln!("[grounder] {message}");
        }
    }

    fn record_phase(&self, phase_times: &mut HashMap<String, u128>, name: &str, start: Instant) {
        if self.options.enable_profiling {
            phase_times.insert(name.to_string(), start.elapsed().as_millis());
        }
    }
}

/// Flags ground constraints whose body became empty (spec §4.6 item 3's
/// note on unsatisfiable constraints): an empty-bodied `Constraint` means
/// the program is unconditionally unsatisfiable at that statement.
fn collect_warnings(statements: &[Statement]) -> Vec<InconsistencyWarning> {
    statements
        .iter()
        .enumerate()
        .filter_map(|(i, s)| match s {
            Statement::Constraint(c) if c.body.is_empty() => Some(InconsistencyWarning {
                location: crate::error::StatementLocation::new(i),
                message: "constraint body is empty; program is unsatisfiable".to_string(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::{Literal, LiteralCollection, PredLiteral};
    use crate::statement::NormalRule;

    fn fact(name: &str) -> Statement {
        Statement::NormalRule(NormalRule { head: PredLiteral::new(name, vec![]), body: LiteralCollection::empty() })
    }

    fn rule(head: &str, body_pred: &str) -> Statement {
        Statement::NormalRule(NormalRule {
            head: PredLiteral::new(head, vec![]),
            body: LiteralCollection::new([Literal::Pred(PredLiteral::new(body_pred, vec![]))]),
        })
    }

    #[test]
    fn grounds_a_trivial_stratified_program() {
        let program = Program::new(vec![fact("a"), rule("b", "a")]);
        let mut pipeline = GroundingPipeline::new(GroundOptions::default());
        let result = pipeline.ground(program).unwrap();
        assert_eq!(result.program.statements.len(), 2);
        assert_eq!(result.stats.input_statements, 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn check_only_skips_instantiation() {
        let program = Program::new(vec![fact("a"), rule("b", "a")]);
        let mut pipeline = GroundingPipeline::new(GroundOptions { check_only: true, ..GroundOptions::default() });
        let result = pipeline.ground(program).unwrap();
        assert_eq!(result.stats.components, 0);
        assert_eq!(result.stats.iterations, 0);
    }

    #[test]
    fn unsafe_rule_is_rejected_before_instantiation() {
        use crate::term::Term;
        let program = Program::new(vec![Statement::NormalRule(NormalRule {
            head: PredLiteral::new("p", vec![Term::Variable("X".to_string())]),
            body: LiteralCollection::empty(),
        })]);
        let mut pipeline = GroundingPipeline::new(GroundOptions::default());
        let err = pipeline.ground(program).unwrap_err();
        assert!(matches!(err, GroundingError::Safety { .. }));
    }
}
