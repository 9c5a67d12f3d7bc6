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

//! A grounder for a Prolog-like Answer Set Programming language.
//!
//! Takes a `Program` (terms, literals, statements — see [`statement`]) and
//! produces its ground instantiation: variables replaced by every value
//! consistent with safety and the program's stratification, aggregates
//! and choice constructs rewritten and reassembled from their ground
//! decomposition. See [`pipeline::GroundingPipeline`] for the entry point.

pub mod error;
pub mod grounder;
pub mod literal;
pub mod operators;
pub mod pipeline;
pub mod propagator;
pub mod rewrite;
pub mod safety;
pub mod statement;
pub mod substitution;
pub mod symbols;
pub mod term;
pub mod variable_table;

use crate::error::GroundingError;
use crate::pipeline::{GroundOptions, GroundingPipeline, GroundingResult};
use crate::statement::Program;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Package-wide debug flag (grounded on `aspy/debug.py`'s module-level
/// flag). Read-only once grounding has started; set it before calling
/// [`Grounder::ground`], not from within it.
pub fn debug() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn set_debug(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

/// The grounder's main entry point, mirroring the teacher's `Compiler`
/// facade: a thin builder over [`GroundingPipeline`] for callers that
/// don't need direct access to the phase-by-phase API.
pub struct Grounder {
    options: GroundOptions,
}

impl Grounder {
    pub fn new() -> Self {
        Self { options: GroundOptions::default() }
    }

    pub fn with_options(options: GroundOptions) -> Self {
        Self { options }
    }

    /// Enable verbose phase-by-phase tracing to stderr.
    pub fn verbose(mut self, enable: bool) -> Self {
        self.options.verbose = enable;
        self
    }

    /// Colorize diagnostics reported for safety errors/warnings.
    pub fn use_colors(mut self, enable: bool) -> Self {
        self.options.use_colors = enable;
        self
    }

    /// Stop after rewriting and safety-checking, without instantiating.
    pub fn check_only(mut self, enable: bool) -> Self {
        self.options.check_only = enable;
        self
    }

    /// Grounds `program`, producing the fully-instantiated ground program
    /// plus diagnostics and stats.
    pub fn ground(&self, program: Program) -> Result<GroundingResult, GroundingError> {
        GroundingPipeline::new(self.options.clone()).ground(program)
    }
}

impl Default for Grounder {
    fn default() -> Self {
        Self::new()
    }
}
