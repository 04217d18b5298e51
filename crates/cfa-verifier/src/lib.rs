//! C4: runs one [`Analyzer`] on a CFA under a resource limit and returns an
//! [`cfa_classify::AnalysisResult`] (spec.md §4.4). The verifier itself is
//! an external dependency, treated as opaque; this crate only supplies the
//! shutdown-scope nesting, the round timer, and the mapping from caught
//! failure shapes to a captured error.
//!
//! The adapter does not itself require the verifier to be deterministic
//! modulo timing -- that requirement is on [`cfa_classify::classify`]'s
//! callers, who compare two rounds' results.

mod analyzer;
mod shutdown;
mod timer;

pub use analyzer::{Analyzer, AnalyzerFailure, AnalyzerVerdict, FailureKind};
pub use shutdown::ShutdownScope;
pub use timer::RoundTimer;

use std::sync::Arc;

use cfa_budget::Limit;
use cfa_classify::{AnalysisResult, CapturedError, Verdict};
use cfa_graph::Cfa;

/// Runs `analyzer` on `cfa` under `round_limits`, nested under `parent`'s
/// shutdown scope. `handle` is attached to the result unchanged -- callers
/// that need to recover the CFA a result was produced for should pass
/// whatever cheaply-clonable identifier fits (an id, an `Arc<Cfa>`, ...).
pub fn analyze<A: Analyzer, H>(
    analyzer: &mut A,
    cfa: &Cfa,
    handle: H,
    round_limits: &[Limit],
    parent: &Arc<ShutdownScope>,
) -> AnalysisResult<H> {
    let scope = ShutdownScope::child(parent);
    let timer = RoundTimer::start(round_limits, Arc::clone(&scope));

    let outcome = analyzer.run(cfa, &scope);
    timer.stop();

    match outcome {
        Ok(_) if scope.is_triggered() => {
            AnalysisResult::new(Verdict::Unknown, handle).with_error(CapturedError::cancelled())
        }
        Ok(verdict) => {
            let mut result = AnalysisResult::new(verdict.verdict, handle);
            if let Some(target) = verdict.target {
                result = result.with_target(target);
            }
            result
        }
        Err(failure) => {
            let error = CapturedError { class: failure.kind.class_name().to_string(), top_frame: failure.top_frame, cancelled: false };
            AnalysisResult::new(Verdict::Unknown, handle).with_error(error)
        }
    }
}
