use cfa_graph::Cfa;

/// The shape of an error the adapter is willing to capture as data instead
/// of propagating (spec.md §4.4 step 3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FailureKind {
    OutOfRangeIndex,
    StateMachineViolation,
    NullDereference,
    NoSuchElement,
    AssertionFailure,
}

impl FailureKind {
    pub fn class_name(self) -> &'static str {
        match self {
            FailureKind::OutOfRangeIndex => "OutOfRangeIndex",
            FailureKind::StateMachineViolation => "StateMachineViolation",
            FailureKind::NullDereference => "NullDereference",
            FailureKind::NoSuchElement => "NoSuchElement",
            FailureKind::AssertionFailure => "AssertionFailure",
        }
    }
}

/// An expected failure shape surfaced by [`Analyzer::run`], to be wrapped
/// into [`cfa_classify::CapturedError`] rather than propagated.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AnalyzerFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Top-of-stack location, when the underlying verifier reports one.
    pub top_frame: Option<String>,
}

impl AnalyzerFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), top_frame: None }
    }

    pub fn with_top_frame(mut self, top_frame: impl Into<String>) -> Self {
        self.top_frame = Some(top_frame.into());
        self
    }
}

/// A successful (non-cancelled, non-failed) analysis of one CFA.
#[derive(Clone, Debug)]
pub struct AnalyzerVerdict {
    pub verdict: cfa_classify::Verdict,
    pub target: Option<String>,
}

impl AnalyzerVerdict {
    pub fn verdict(verdict: cfa_classify::Verdict) -> Self {
        Self { verdict, target: None }
    }

    pub fn false_with_target(target: impl Into<String>) -> Self {
        Self { verdict: cfa_classify::Verdict::False, target: Some(target.into()) }
    }
}

/// The external program analysis, treated as opaque (spec.md §1 non-goal:
/// "the actual program analyses"). Implementations are expected to poll
/// `shutdown.is_triggered()` at their own cancellation points.
pub trait Analyzer {
    fn run(&mut self, cfa: &Cfa, shutdown: &crate::shutdown::ShutdownScope) -> Result<AnalyzerVerdict, AnalyzerFailure>;
}
