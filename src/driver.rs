//! C8: the top-level mutation driver state machine (spec.md §4.8).
//! Orchestrates C1 (budget), C3 (classifier), C4 (verifier adapter), C6
//! (feasibility), and C7 (mutator) over the rounds `S1 Original` and
//! `S2 Ready` described there.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cfa_budget::{BudgetController, LimitKind};
use cfa_classify::{classify, AnalysisResult};
use cfa_feasibility::{check_counterexample, CexChecker, Counterexample, DelegatingRechecker};
use cfa_graph::Cfa;
use cfa_mutator::Mutator;
use cfa_verifier::{analyze, Analyzer, ShutdownScope};

use crate::config::DriverConfig;

/// The tool's mutation-mode exit status (spec.md §6).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitStatus {
    FeasibleFalse,
    DoneNoMoreMutations,
    NotYetStarted,
    Interrupted,
}

pub struct DriverOutcome {
    pub status: ExitStatus,
    pub last_result: Option<AnalysisResult<()>>,
    pub rounds_run: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Original,
    Mutation,
    Feasibility,
    Rollback,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Original => "original",
            Phase::Mutation => "mutation",
            Phase::Feasibility => "feasibility",
            Phase::Rollback => "rollback",
        }
    }
}

struct RoundStats {
    round: u64,
    phase: Phase,
    outcome: Option<cfa_classify::Outcome>,
    consumed: Duration,
}

impl RoundStats {
    fn render(&self) -> String {
        format!(
            "round={} phase={} outcome={:?} consumed_ms={}\n",
            self.round,
            self.phase.name(),
            self.outcome,
            self.consumed.as_millis()
        )
    }
}

fn round_output_dir(out_dir: &Path, round: u64, phase: Phase) -> PathBuf {
    out_dir.join(format!("{round}-{}", phase.name()))
}

/// A rank file entry per CFA node: `func:Nnum [ x count ]`, `count` being
/// the node's total edge degree. The real tool ranks nodes by a mutator's
/// own cost model; the degree is this driver's stand-in, since ranking
/// policy belongs to the mutator collaborator (spec.md §4.7).
fn ranked_nodes(cfa: &Cfa) -> String {
    let mut lines = Vec::new();
    for (_, function) in cfa.functions() {
        for &node_id in &function.nodes {
            let node = cfa.node(node_id);
            let degree = node.outgoing.len() + node.incoming.len();
            lines.push(format!("{}:N{} [ x {} ]", function.name, node_id.raw(), degree));
        }
    }
    lines.sort();
    lines.join("\n") + "\n"
}

fn make_counterexample<H>(result: &AnalysisResult<H>) -> Counterexample {
    Counterexample { error_state: result.target.clone().unwrap_or_default(), path_states: Vec::new() }
}

pub struct MutationDriver<A, M, D> {
    analyzer: A,
    mutator: M,
    rechecker: DelegatingRechecker<D>,
    budget: BudgetController,
    config: DriverConfig,
    out_dir: PathBuf,
    shutdown: Arc<ShutdownScope>,
    round: u64,
    rollbacks_in_row: u32,
}

impl<A: Analyzer, M: Mutator, D: CexChecker> MutationDriver<A, M, D> {
    pub fn new(analyzer: A, mutator: M, rechecker: DelegatingRechecker<D>, config: DriverConfig, out_dir: PathBuf, shutdown: Arc<ShutdownScope>) -> Self {
        let mut globals = std::collections::HashMap::new();
        globals.insert(LimitKind::WallTime, cfa_budget::GlobalLimit { current: Duration::ZERO, bound: config.walltime_hardcap.0 });
        let budget = BudgetController::new(
            vec![LimitKind::WallTime],
            globals,
            config.walltime_hardcap.0,
            config.walltime_factor,
            config.walltime_add.0,
            config.cex_check_time.0,
        );
        Self { analyzer, mutator, rechecker, budget, config, out_dir, shutdown, round: 0, rollbacks_in_row: 0 }
    }

    fn emit(&self, phase: Phase, stats: &RoundStats, cfa: &Cfa) {
        let dir = round_output_dir(&self.out_dir, stats.round, phase);
        if let Err(error) = std::fs::create_dir_all(&dir) {
            tracing::warn!(%error, dir = %dir.display(), "failed to create round output directory");
            return;
        }
        let writes = [
            (self.config.round_stat_file.as_path(), stats.render()),
            (self.config.ranked_nodes_file.as_path(), ranked_nodes(cfa)),
            (self.config.log_file.as_path(), format!("round {} ({}) completed\n", stats.round, phase.name())),
        ];
        for (name, contents) in writes {
            if let Err(error) = std::fs::write(dir.join(name), contents) {
                tracing::warn!(%error, file = %name.display(), "failed to write round artifact");
            }
        }
    }

    pub fn run(&mut self, original_cfa: &Cfa) -> DriverOutcome {
        if self.shutdown.is_triggered() {
            return DriverOutcome { status: ExitStatus::Interrupted, last_result: None, rounds_run: 0 };
        }

        // S1: run the original once, under the hard cap (no original
        // consumption is recorded yet).
        self.round += 1;
        let original_limits = self.budget.derive_round_limits();
        let started = Instant::now();
        let original_result = analyze(&mut self.analyzer, original_cfa, (), &original_limits, &self.shutdown);
        let elapsed = started.elapsed();
        self.budget.record_original(elapsed);
        self.budget.record_consumption(LimitKind::WallTime, elapsed);
        self.emit(Phase::Original, &RoundStats { round: self.round, phase: Phase::Original, outcome: None, consumed: elapsed }, original_cfa);

        let bail_outcome = classify(&original_result, &original_result);
        if self.mutator.should_return_without_mutation(bail_outcome) {
            return DriverOutcome { status: ExitStatus::NotYetStarted, last_result: Some(original_result), rounds_run: self.round };
        }

        let mut last_result = original_result.clone();

        // S2: mutate -> analyze -> classify -> rollback-or-keep.
        while self.mutator.can_mutate() {
            if self.shutdown.is_triggered() {
                return DriverOutcome { status: ExitStatus::Interrupted, last_result: Some(last_result), rounds_run: self.round };
            }

            self.round += 1;
            let mutated_cfa = self.mutator.mutate();
            let round_limits = self.budget.derive_round_limits();
            let round_started = Instant::now();
            let result = analyze(&mut self.analyzer, &mutated_cfa, (), &round_limits, &self.shutdown);
            let round_elapsed = round_started.elapsed();
            self.budget.record_consumption(LimitKind::WallTime, round_elapsed);

            let outcome = classify(&result, &original_result);
            self.emit(Phase::Mutation, &RoundStats { round: self.round, phase: Phase::Mutation, outcome: Some(outcome), consumed: round_elapsed }, &mutated_cfa);
            last_result = result.clone();

            if self.mutator.should_check_feasibility(outcome) {
                let feasibility_limits = self.budget.derive_feasibility_limits();
                if self.budget.will_exceed(&feasibility_limits, Duration::from_secs(1), self.shutdown.is_triggered()).is_some() {
                    return DriverOutcome { status: ExitStatus::FeasibleFalse, last_result: Some(last_result), rounds_run: self.round };
                }

                let already_present: HashSet<String> = mutated_cfa.function_names().map(str::to_string).collect();
                let cex = make_counterexample(&result);
                let restore_from = self.mutator.restore_cfa();
                let feasible = check_counterexample(&mut self.rechecker, &cex, self.round, &restore_from, &already_present);
                self.emit(Phase::Feasibility, &RoundStats { round: self.round, phase: Phase::Feasibility, outcome: Some(outcome), consumed: Duration::ZERO }, &mutated_cfa);

                match feasible {
                    Ok(true) => return DriverOutcome { status: ExitStatus::FeasibleFalse, last_result: Some(last_result), rounds_run: self.round },
                    Ok(false) => {}
                    Err(error) => tracing::warn!(%error, "feasibility check failed, continuing the mutation loop"),
                }
            }

            match self.mutator.set_result(outcome) {
                Some(prev_cfa) => {
                    self.rollbacks_in_row += 1;
                    if self.config.rollbacks_in_row_check != 0 && self.rollbacks_in_row % self.config.rollbacks_in_row_check == 0 {
                        let confirm_limits = self.budget.derive_round_limits();
                        let confirm_started = Instant::now();
                        let confirm_result = analyze(&mut self.analyzer, &prev_cfa, (), &confirm_limits, &self.shutdown);
                        self.budget.record_consumption(LimitKind::WallTime, confirm_started.elapsed());
                        let confirm_outcome = classify(&confirm_result, &original_result);
                        self.mutator.verify_outcome(confirm_outcome);
                        self.emit(
                            Phase::Rollback,
                            &RoundStats { round: self.round, phase: Phase::Rollback, outcome: Some(confirm_outcome), consumed: confirm_started.elapsed() },
                            &prev_cfa,
                        );
                    }
                }
                None => self.rollbacks_in_row = 0,
            }

            if self.budget.will_exceed(&round_limits, Duration::from_secs(1), self.shutdown.is_triggered()).is_some() {
                return DriverOutcome { status: ExitStatus::DoneNoMoreMutations, last_result: Some(last_result), rounds_run: self.round };
            }
        }

        DriverOutcome { status: ExitStatus::DoneNoMoreMutations, last_result: Some(last_result), rounds_run: self.round }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_classify::Verdict;
    use cfa_feasibility::PathTemplate;
    use cfa_graph::{EdgeKind, MachineModel, NodeKind};
    use cfa_mutator::FunctionRemovalMutator;
    use cfa_verifier::{AnalyzerFailure, AnalyzerVerdict, FailureKind};
    use std::fs::File;
    use std::path::PathBuf as StdPathBuf;

    fn caller_and_helper() -> Cfa {
        let mut cfa = Cfa::new(MachineModel::linux64());

        let helper_fn = cfa.next_function_id();
        let h_entry = cfa.new_node(helper_fn, NodeKind::FunctionEntry);
        let h_exit = cfa.new_node(helper_fn, NodeKind::FunctionExit);
        cfa.add_edge(h_entry, h_exit, EdgeKind::Blank, None);
        cfa.declare_function("helper", h_entry, h_exit, vec![h_entry, h_exit]);

        let main_fn = cfa.next_function_id();
        let m_entry = cfa.new_node(main_fn, NodeKind::FunctionEntry);
        let call_node = cfa.new_node(main_fn, NodeKind::Interior);
        let return_node = cfa.new_node(main_fn, NodeKind::Interior);
        let m_exit = cfa.new_node(main_fn, NodeKind::FunctionExit);
        cfa.add_edge(m_entry, call_node, EdgeKind::Blank, None);
        cfa.add_edge(call_node, h_entry, EdgeKind::FunctionCall, None);
        cfa.add_edge(call_node, return_node, EdgeKind::CallToReturn, None);
        cfa.add_edge(h_exit, return_node, EdgeKind::FunctionReturn, None);
        cfa.add_edge(return_node, m_exit, EdgeKind::Statement, None);
        cfa.declare_function("main", m_entry, m_exit, vec![m_entry, call_node, return_node, m_exit]);

        cfa
    }

    /// Fails with the same exception on every round: the symptom is
    /// preserved by any mutation.
    struct AlwaysSameException;
    impl Analyzer for AlwaysSameException {
        fn run(&mut self, _cfa: &Cfa, _shutdown: &ShutdownScope) -> Result<AnalyzerVerdict, AnalyzerFailure> {
            Err(AnalyzerFailure::new(FailureKind::AssertionFailure, "assertion failed: x > 0").with_top_frame("f:42"))
        }
    }

    struct NeverFeasible;
    impl CexChecker for NeverFeasible {
        fn temp_file_builder(&self) -> (&str, &str) {
            ("cex-", ".c")
        }
        fn write(&self, _cex: &Counterexample, out: &mut File) -> std::io::Result<()> {
            use std::io::Write;
            out.write_all(b"// cex\n")
        }
        fn decide(&mut self, _cex: &Counterexample, _path: &Path) -> Result<bool, cfa_feasibility::FeasibilityCheckFailed> {
            Ok(false)
        }
    }

    fn temp_out_dir(name: &str) -> StdPathBuf {
        let dir = std::env::temp_dir().join(format!("cfa-mutation-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn exhausting_mutations_while_the_symptom_survives_commits_the_removal_and_reports_done() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa.clone(), "main");
        let rechecker = DelegatingRechecker::new(NeverFeasible);
        let config = DriverConfig::default();
        let out_dir = temp_out_dir("done");
        let shutdown = ShutdownScope::root();

        let mut driver = MutationDriver::new(AlwaysSameException, mutator, rechecker, config, out_dir.clone(), shutdown);
        let outcome = driver.run(&cfa);

        assert_eq!(outcome.status, ExitStatus::DoneNoMoreMutations);
        assert!(outcome.last_result.unwrap().error.is_some());
        assert!(out_dir.join("1-original").join("this-round-stats.txt").exists());
        std::fs::remove_dir_all(&out_dir).ok();
    }

    struct TrueThenStaysTrue;
    impl Analyzer for TrueThenStaysTrue {
        fn run(&mut self, _cfa: &Cfa, _shutdown: &ShutdownScope) -> Result<AnalyzerVerdict, AnalyzerFailure> {
            Ok(AnalyzerVerdict::verdict(Verdict::True))
        }
    }

    #[test]
    fn a_true_original_verdict_bails_out_before_any_mutation() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa.clone(), "main");
        let rechecker = DelegatingRechecker::new(NeverFeasible);
        let config = DriverConfig::default();
        let out_dir = temp_out_dir("bail");
        let shutdown = ShutdownScope::root();

        let mut driver = MutationDriver::new(TrueThenStaysTrue, mutator, rechecker, config, out_dir.clone(), shutdown);
        let outcome = driver.run(&cfa);

        assert_eq!(outcome.status, ExitStatus::NotYetStarted);
        assert_eq!(outcome.rounds_run, 1);
        std::fs::remove_dir_all(&out_dir).ok();
    }

    struct FalseWithFeasibleTarget;
    impl Analyzer for FalseWithFeasibleTarget {
        fn run(&mut self, _cfa: &Cfa, _shutdown: &ShutdownScope) -> Result<AnalyzerVerdict, AnalyzerFailure> {
            Ok(AnalyzerVerdict::false_with_target("line 14: assertion"))
        }
    }

    struct AlwaysFeasible;
    impl CexChecker for AlwaysFeasible {
        fn temp_file_builder(&self) -> (&str, &str) {
            ("cex-", ".c")
        }
        fn cex_file_template(&self) -> Option<PathTemplate> {
            Some(PathTemplate(format!("{}/counterexample-with-restored-functions.{{n}}.c", std::env::temp_dir().display())))
        }
        fn write(&self, _cex: &Counterexample, out: &mut File) -> std::io::Result<()> {
            use std::io::Write;
            out.write_all(b"// cex\n")
        }
        fn decide(&mut self, _cex: &Counterexample, _path: &Path) -> Result<bool, cfa_feasibility::FeasibilityCheckFailed> {
            Ok(true)
        }
    }

    #[test]
    fn a_feasible_false_verdict_terminates_the_loop_immediately() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa.clone(), "main");
        let rechecker = DelegatingRechecker::new(AlwaysFeasible);
        let config = DriverConfig::default();
        let out_dir = temp_out_dir("feasible");
        let shutdown = ShutdownScope::root();

        let mut driver = MutationDriver::new(FalseWithFeasibleTarget, mutator, rechecker, config, out_dir.clone(), shutdown);
        let outcome = driver.run(&cfa);

        assert_eq!(outcome.status, ExitStatus::FeasibleFalse);
        assert_eq!(outcome.rounds_run, 2);
        std::fs::remove_dir_all(&out_dir).ok();
    }
}
