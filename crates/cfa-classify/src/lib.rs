//! C3: compares a round's [`AnalysisResult`] against the original's and
//! emits a categorical [`Outcome`] (spec.md §4.3). A pure function over two
//! results; it owns no state and performs no I/O.

/// The verdict a single analysis run reached.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    True,
    False,
    Unknown,
    NotYetStarted,
    Done,
}

/// An error captured from a round rather than propagated (spec.md §4.4).
/// `class` is the exception/error type name; `top_frame` is the top of its
/// stack trace, `None` when the underlying runtime elided it (observed for
/// a recurrent exception thrown many times in a row).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CapturedError {
    pub class: String,
    pub top_frame: Option<String>,
    pub cancelled: bool,
}

impl CapturedError {
    pub fn cancelled() -> Self {
        Self { class: "Cancelled".to_string(), top_frame: None, cancelled: true }
    }
}

/// The outcome of one verifier call, generic over whatever handle `cfa`
/// identifies the CFA it ran against (an id, a path, the CFA itself, ...).
#[derive(Clone, Debug)]
pub struct AnalysisResult<C> {
    pub verdict: Verdict,
    /// Present for a `False` verdict: a description of the violated
    /// property, compared byte-for-byte between rounds.
    pub target: Option<String>,
    pub error: Option<CapturedError>,
    pub cfa: C,
}

impl<C> AnalysisResult<C> {
    pub fn new(verdict: Verdict, cfa: C) -> Self {
        Self { verdict, target: None, error: None, cfa }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_error(mut self, error: CapturedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// The categorical comparison of a round's result to the original's.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    TrueVerdict,
    FalseVerdictSameBug,
    FalseVerdictOtherTarget,
    UnknownOtherVerdict,
    TimeoutUnknown,
    FailureSameException,
    FailureOtherException,
}

/// Compares `current` to `original` per spec.md §4.3.
pub fn classify<C, O>(current: &AnalysisResult<C>, original: &AnalysisResult<O>) -> Outcome {
    match current.verdict {
        Verdict::True => Outcome::TrueVerdict,
        Verdict::False => {
            if original.verdict == Verdict::False && current.target == original.target {
                Outcome::FalseVerdictSameBug
            } else {
                Outcome::FalseVerdictOtherTarget
            }
        }
        Verdict::Unknown | Verdict::NotYetStarted | Verdict::Done => {
            if current.error.as_ref().is_some_and(|e| e.cancelled) {
                return Outcome::TimeoutUnknown;
            }
            match (&current.error, &original.error) {
                (Some(cur), Some(orig)) if cur.class == orig.class && same_frame(cur, orig) => {
                    Outcome::FailureSameException
                }
                (Some(_), _) => Outcome::FailureOtherException,
                (None, _) => Outcome::UnknownOtherVerdict,
            }
        }
    }
}

/// Two captured errors agree on location when their top frames are equal,
/// or when both are empty -- the latter is how the classifier recognizes a
/// runtime that stopped recording stack traces for a recurrent exception.
fn same_frame(a: &CapturedError, b: &CapturedError) -> bool {
    a.top_frame == b.top_frame
}
