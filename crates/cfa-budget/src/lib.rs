//! C1: derive per-round resource limits from a global budget and the
//! original run's consumption, and detect when a round would exceed them
//! (spec.md §4.1).

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// The clock a resource limit is measured against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LimitKind {
    CpuTime,
    ThreadCpuTime,
    WallTime,
}

impl LimitKind {
    pub fn name(self) -> &'static str {
        match self {
            LimitKind::CpuTime => "cpu time",
            LimitKind::ThreadCpuTime => "thread CPU time",
            LimitKind::WallTime => "wall time",
        }
    }
}

/// A relative limit for one round: `span` of `kind`-time starting at
/// `start`.
#[derive(Clone, Copy, Debug)]
pub struct Limit {
    pub kind: LimitKind,
    pub start: Instant,
    pub span: Duration,
}

impl Limit {
    /// Remaining time before this limit fires, as of now.
    pub fn to_next_check(&self) -> Duration {
        self.span.saturating_sub(self.start.elapsed())
    }

    pub fn has_expired(&self) -> bool {
        self.start.elapsed() >= self.span
    }
}

/// Consumption-so-far and the absolute bound for one [`LimitKind`], tracked
/// across the whole driver run (spec.md §5: touched only by the main
/// thread, between rounds).
#[derive(Clone, Copy, Debug)]
pub struct GlobalLimit {
    pub current: Duration,
    pub bound: Duration,
}

/// The budget state described in spec.md §3: active global limits, the
/// original run's consumed time, and the three tunables that turn it into a
/// soft cap.
pub struct BudgetController {
    active_kinds: Vec<LimitKind>,
    globals: HashMap<LimitKind, GlobalLimit>,
    original_consumed: Option<Duration>,
    hard_cap: Duration,
    soft_cap_factor: f64,
    soft_cap_bias: Duration,
    feasibility_span: Duration,
}

impl BudgetController {
    pub fn new(
        active_kinds: Vec<LimitKind>,
        globals: HashMap<LimitKind, GlobalLimit>,
        hard_cap: Duration,
        soft_cap_factor: f64,
        soft_cap_bias: Duration,
        feasibility_span: Duration,
    ) -> Self {
        Self {
            active_kinds,
            globals,
            original_consumed: None,
            hard_cap,
            soft_cap_factor,
            soft_cap_bias,
            feasibility_span,
        }
    }

    /// Defaults from spec.md §6: `walltimeLimit.hardcap = 200s`,
    /// `walltimeLimit.factor = 2.0`, `walltimeLimit.add = 5s`,
    /// `timeLimit.cexCheck = 60s`, tracking wall time only.
    pub fn with_defaults(globals: HashMap<LimitKind, GlobalLimit>) -> Self {
        Self::new(
            vec![LimitKind::WallTime],
            globals,
            Duration::from_secs(200),
            2.0,
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
    }

    /// Sets the original run's consumed time. A no-op (returns `false`) if
    /// already recorded -- the budget controller records the *first* run
    /// only, per spec.md §4.1.
    pub fn record_original(&mut self, consumed: Duration) -> bool {
        if self.original_consumed.is_some() {
            return false;
        }
        self.original_consumed = Some(consumed);
        true
    }

    pub fn original_consumed(&self) -> Option<Duration> {
        self.original_consumed
    }

    /// Accumulates `elapsed` into the global counter for `kind`, if that
    /// kind is tracked. Called by the driver between rounds (spec.md §5:
    /// the only shared mutable state, touched exclusively by the main
    /// thread).
    pub fn record_consumption(&mut self, kind: LimitKind, elapsed: Duration) {
        if let Some(global) = self.globals.get_mut(&kind) {
            global.current += elapsed;
        }
    }

    fn round_span(&self) -> Duration {
        match self.original_consumed {
            None => self.hard_cap,
            Some(consumed) => {
                let soft = consumed.mul_f64(self.soft_cap_factor) + self.soft_cap_bias;
                soft.min(self.hard_cap)
            }
        }
    }

    /// Fresh relative limits, one per active global limit kind, starting
    /// now.
    pub fn derive_round_limits(&self) -> Vec<Limit> {
        let span = self.round_span();
        self.fresh_limits(span)
    }

    /// Same rule, but always using the configured feasibility-check span,
    /// independent of whether an original run has been recorded.
    pub fn derive_feasibility_limits(&self) -> Vec<Limit> {
        self.fresh_limits(self.feasibility_span)
    }

    fn fresh_limits(&self, span: Duration) -> Vec<Limit> {
        let start = Instant::now();
        self.active_kinds.iter().map(|&kind| Limit { kind, start, span }).collect()
    }

    /// For each paired local/global limit, would `global.current +
    /// local.to_next_check() + slack` exceed `global.bound`? Returns the
    /// first offending global's name, or `Some("shutdown requested")` if
    /// `shutdown_requested` is already set.
    pub fn will_exceed(&self, limits: &[Limit], slack: Duration, shutdown_requested: bool) -> Option<String> {
        if shutdown_requested {
            return Some("shutdown requested".to_string());
        }
        for limit in limits {
            let Some(global) = self.globals.get(&limit.kind) else { continue };
            let projected = global.current + limit.to_next_check() + slack;
            if projected > global.bound {
                return Some(limit.kind.name().to_string());
            }
        }
        None
    }
}
