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

//! Error handling for the grounder
//!
//! Comprehensive error types and reporting for the term/literal/statement
//! layers, safety analysis, and the instantiation loop.

use std::fmt;
use thiserror::Error;

/// Where in a statement an error occurred, for diagnostics. Grounding never
/// sees file/line/column information (the textual parser is out of scope),
/// so locations are identified by statement index within the program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct StatementLocation {
    pub statement_index: usize,
}

impl StatementLocation {
    pub fn new(statement_index: usize) -> Self {
        Self { statement_index }
    }
}

impl fmt::Display for StatementLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "statement #{}", self.statement_index)
    }
}

/// Malformed-AST errors: the input `Program` violates an invariant of §3
/// (e.g. a `Variable` whose name does not start uppercase).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("variable name '{name}' does not begin with an uppercase letter or 'τ'")]
    InvalidVariableName { name: String },

    #[error("symbolic constant/functor name '{name}' does not begin with a lowercase letter or 'α', 'ε', 'η'")]
    InvalidSymbolName { name: String },

    #[error("anonymous variable id {id} is negative")]
    InvalidAnonVariableId { id: i64 },

    #[error("arithmetic variable id {id} is negative")]
    InvalidArithVariableId { id: i64 },

    #[error("reserved identifier '{name}' used by user program")]
    ReservedIdentifier { name: String },

    #[error("placeholder reference {reference} is not unique within the program")]
    DuplicatePlaceholderRef { reference: u64 },

    #[error("element ids of rewritten aggregate/choice {reference} are not dense 0..{count}")]
    NonDenseElementIds { reference: u64, count: usize },
}

/// A rule or statement cannot be grounded because some variable remains
/// unsafe after closure (§4.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("statement at {location} is not safe: variable(s) {unsafe_vars:?} remain unbound")]
pub struct SafetyError {
    pub location: StatementLocation,
    pub unsafe_vars: Vec<String>,
}

/// Arithmetic evaluation failures: division by zero, or evaluating a
/// non-ground term in a context that requires groundness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot evaluate non-ground arithmetic expression")]
    NonGroundEvaluation,
}

/// Substitution composition produced conflicting bindings. Caught internally
/// by the matching layer and turned into a failed match; never surfaced to
/// callers of the public API (kept `pub` so the matching layer's internals
/// and its unit tests can name it).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("variable bound to conflicting terms")]
pub struct AssignmentError;

/// Non-fatal: a ground constraint's body became empty after simplification
/// (the program is definitely unsatisfiable), or a disjunctive head was
/// reduced to a contradiction. Recorded alongside the ground program.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InconsistencyWarning {
    pub location: StatementLocation,
    pub message: String,
}

impl fmt::Display for InconsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// Invariant violation — a bug in the grounder itself (e.g. `precedes`
/// called on a non-ground term).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("internal grounder error: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Top-level error type returned by the grounding pipeline.
#[derive(Error, Debug, Clone)]
pub enum GroundingError {
    #[error("{source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("{source}")]
    Safety {
        #[from]
        source: SafetyError,
    },

    #[error("{source}")]
    Arithmetic {
        #[from]
        source: ArithmeticError,
    },

    #[error("{source}")]
    Internal {
        #[from]
        source: InternalError,
    },
}

/// Aggregates every `SafetyError` found while checking a whole program: the
/// checker reports all offending statements, not just the first (§7).
#[derive(Error, Debug, Clone)]
#[error("{} statement(s) failed safety analysis", .0.len())]
pub struct SafetyErrors(pub Vec<SafetyError>);

impl From<SafetyErrors> for GroundingError {
    fn from(errors: SafetyErrors) -> Self {
        // report the first offender as the primary error; callers that need
        // the full list should inspect `SafetyErrors` before conversion.
        GroundingError::Safety {
            source: errors
                .0
                .into_iter()
                .next()
                .expect("SafetyErrors must be non-empty to convert"),
        }
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional statement location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<StatementLocation>,
}

impl Diagnostic {
    pub fn error(message: String, location: Option<StatementLocation>) -> Self {
        Self { severity: Severity::Error, message, location }
    }

    pub fn warning(message: String, location: Option<StatementLocation>) -> Self {
        Self { severity: Severity::Warning, message, location }
    }
}

impl From<&SafetyError> for Diagnostic {
    fn from(err: &SafetyError) -> Self {
        Diagnostic::error(err.to_string(), Some(err.location.clone()))
    }
}

impl From<&InconsistencyWarning> for Diagnostic {
    fn from(warn: &InconsistencyWarning) -> Self {
        Diagnostic::warning(warn.message.clone(), Some(warn.location.clone()))
    }
}

/// Reports diagnostics produced during grounding to stderr.
pub struct GroundingReporter {
    use_colors: bool,
}

impl GroundingReporter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    pub fn report(&self, diagnostic: &Diagnostic) {
        let color = if self.use_colors {
            match diagnostic.severity {
                Severity::Error => "\x1b[31m",
                Severity::Warning => "\x1b[33m",
            }
        } else {
            ""
        };
        let reset = if self.use_colors { "\x1b[0m" } else { "" };

        match &diagnostic.location {
            Some(loc) => eprintln!("{color}{}{reset} ({loc}): {}", diagnostic.severity, diagnostic.message),
            None => eprintln!("{color}{}{reset}: {}", diagnostic.severity, diagnostic.message),
        }
    }

    pub fn report_warnings(&self, warnings: &[InconsistencyWarning]) {
        for warning in warnings {
            self.report(&Diagnostic::from(warning));
        }
    }

    pub fn report_safety_errors(&self, errors: &[SafetyError]) {
        for error in errors {
            self.report(&Diagnostic::from(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_location_display() {
        let loc = StatementLocation::new(3);
        assert_eq!(loc.to_string(), "statement #3");
    }

    #[test]
    fn safety_errors_conversion_keeps_first() {
        let errors = SafetyErrors(vec![
            SafetyError { location: StatementLocation::new(0), unsafe_vars: vec!["X".to_string()] },
            SafetyError { location: StatementLocation::new(1), unsafe_vars: vec!["Y".to_string()] },
        ]);
        let grounding_err: GroundingError = errors.into();
        assert!(matches!(grounding_err, GroundingError::Safety { .. }));
    }

    #[test]
    fn inconsistency_warning_display() {
        let warning = InconsistencyWarning {
            location: StatementLocation::new(2),
            message: "constraint body is empty".to_string(),
        };
        assert_eq!(warning.to_string(), "constraint body is empty at statement #2");
    }
}
