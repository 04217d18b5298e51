//! C7: proposes local shrinkings of a CFA, remembers tentative mutations,
//! and rolls them back when the symptom is lost (spec.md §4.7). The
//! driver (C8) treats this purely through the [`Mutator`] trait; the
//! concrete shrinkage strategy here, [`FunctionRemovalMutator`], is one
//! separable collaborator among possible others.

use cfa_classify::Outcome;
use cfa_graph::{Cfa, Function, FunctionId};

/// Interface-level contract the driver drives a mutation loop through.
pub trait Mutator {
    /// At least one untried mutation remains.
    fn can_mutate(&self) -> bool;

    /// Produce the next variant. Must not be called again before the
    /// matching [`Mutator::set_result`].
    fn mutate(&mut self) -> Cfa;

    /// Tell the mutator whether the last mutation preserved the symptom.
    /// Returns `Some(prev)` if the mutation must be rolled back.
    fn set_result(&mut self, outcome: Outcome) -> Option<Cfa>;

    /// Pass-through bail-out for an initial run not worth minimizing.
    fn should_return_without_mutation(&self, outcome: Outcome) -> bool;

    /// Whether this outcome warrants a feasibility check.
    fn should_check_feasibility(&self, outcome: Outcome) -> bool;

    /// Assertion after a rollback-confirmation round.
    fn verify_outcome(&self, outcome: Outcome);

    /// The pre-mutation CFA, for the counterexample restorer (C5).
    fn restore_cfa(&self) -> Cfa;
}

/// Whether an [`Outcome`] means the round reproduced the original symptom.
pub fn preserves_symptom(outcome: Outcome) -> bool {
    matches!(outcome, Outcome::FalseVerdictSameBug | Outcome::FailureSameException)
}

/// Shrinks a CFA by removing whole, currently-uncalled functions, in a
/// ddmin-flavored chunked order: each pass splits the removable set into
/// `granularity` chunks and tries dropping one chunk at a time; a
/// successful drop resets to coarse chunks over what remains, a failed
/// drop doubles the granularity (finer chunks) before moving to the next.
/// `protect` names the function that must never be removed (the entry
/// point the verifier was asked to check).
pub struct FunctionRemovalMutator {
    original: Cfa,
    current: Cfa,
    protect: String,
    granularity: usize,
    chunks: Vec<Vec<String>>,
    cursor: usize,
    tentative: Option<Vec<(FunctionId, Function)>>,
    committed: Vec<String>,
}

impl FunctionRemovalMutator {
    pub fn new(cfa: Cfa, protect: impl Into<String>) -> Self {
        let mut mutator = Self {
            original: cfa.clone(),
            current: cfa,
            protect: protect.into(),
            granularity: 2,
            chunks: Vec::new(),
            cursor: 0,
            tentative: None,
            committed: Vec::new(),
        };
        mutator.rebuild_chunks();
        mutator
    }

    /// Functions called by something in [`Self::current`], other than
    /// [`Self::protect`] -- leaves of the call graph are the only ones that
    /// can be removed without first removing their callers.
    fn removable(&self) -> Vec<String> {
        let mut called = std::collections::HashSet::new();
        for (fid, _) in self.current.functions() {
            for callee in self.current.callees(fid) {
                called.insert(callee);
            }
        }
        self.current
            .functions()
            .filter(|(fid, f)| f.name != self.protect && called.contains(fid))
            .map(|(_, f)| f.name.clone())
            .collect()
    }

    /// Function names committed to removal so far, for the driver's round
    /// statistics.
    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    fn rebuild_chunks(&mut self) {
        let removable = self.removable();
        self.cursor = 0;
        if removable.is_empty() {
            self.chunks = Vec::new();
            return;
        }
        self.granularity = self.granularity.clamp(1, removable.len());
        let chunk_size = removable.len().div_ceil(self.granularity);
        self.chunks = removable.chunks(chunk_size).map(|c| c.to_vec()).collect();
    }
}

impl Mutator for FunctionRemovalMutator {
    fn can_mutate(&self) -> bool {
        self.cursor < self.chunks.len()
    }

    fn mutate(&mut self) -> Cfa {
        assert!(self.tentative.is_none(), "mutate() called again before the pending set_result()");
        let chunk = self.chunks[self.cursor].clone();
        let mut undo = Vec::with_capacity(chunk.len());
        for name in &chunk {
            if let Some(removed) = self.current.remove_function(name) {
                undo.push(removed);
            }
        }
        tracing::debug!(?chunk, "proposing removal");
        self.tentative = Some(undo);
        self.current.clone()
    }

    fn set_result(&mut self, outcome: Outcome) -> Option<Cfa> {
        let undo = self.tentative.take().expect("set_result() called without a pending mutate()");

        if preserves_symptom(outcome) {
            self.committed.extend(undo.iter().map(|(_, f)| f.name.clone()));
            self.granularity = 2;
            self.rebuild_chunks();
            None
        } else {
            for (id, function) in undo {
                self.current.restore_function(id, function);
            }
            self.cursor += 1;
            if self.cursor >= self.chunks.len() {
                let ceiling = self.removable().len().max(1);
                if self.granularity < ceiling {
                    self.granularity = (self.granularity * 2).min(ceiling);
                    self.rebuild_chunks();
                } else {
                    self.chunks.clear();
                }
            }
            Some(self.current.clone())
        }
    }

    fn should_return_without_mutation(&self, outcome: Outcome) -> bool {
        matches!(outcome, Outcome::TrueVerdict)
    }

    fn should_check_feasibility(&self, outcome: Outcome) -> bool {
        matches!(outcome, Outcome::FalseVerdictSameBug | Outcome::FalseVerdictOtherTarget)
    }

    fn verify_outcome(&self, outcome: Outcome) {
        if !preserves_symptom(outcome) {
            tracing::warn!(?outcome, "rollback confirmation did not reproduce the original symptom");
        }
    }

    fn restore_cfa(&self) -> Cfa {
        self.original.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_graph::{check, EdgeKind, MachineModel, NodeKind};

    /// `main` calls `helper`, which is otherwise uncalled and so the only
    /// function `FunctionRemovalMutator` may propose removing.
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

    #[test]
    fn the_protected_function_is_never_offered_for_removal() {
        let cfa = Cfa::new(MachineModel::linux64());
        let mutator = FunctionRemovalMutator::new(cfa, "main");
        assert!(!mutator.can_mutate());
    }

    #[test]
    fn an_uncalled_helper_is_the_only_removal_candidate() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa, "main");
        assert!(mutator.can_mutate());
    }

    #[test]
    fn a_preserved_symptom_commits_the_removal_and_stops_offering_it_again() {
        let cfa = caller_and_helper();
        let mut mutator = FunctionRemovalMutator::new(cfa, "main");

        let mutated = mutator.mutate();
        assert!(mutated.function_by_name("helper").is_none());
        assert!(check(&mutated).is_ok());

        let rollback = mutator.set_result(Outcome::FalseVerdictSameBug);
        assert!(rollback.is_none());
        assert_eq!(mutator.committed(), &["helper".to_string()]);
        assert!(!mutator.can_mutate());
    }

    #[test]
    fn a_lost_symptom_rolls_back_to_a_structurally_valid_cfa() {
        let cfa = caller_and_helper();
        let mut mutator = FunctionRemovalMutator::new(cfa.clone(), "main");

        let _mutated = mutator.mutate();
        let rolled_back = mutator.set_result(Outcome::UnknownOtherVerdict).expect("rollback expected");

        assert!(rolled_back.function_by_name("helper").is_some());
        assert!(check(&rolled_back).is_ok());
        assert!(mutator.committed().is_empty());
    }

    #[test]
    fn restore_cfa_always_returns_the_pre_mutation_original() {
        let cfa = caller_and_helper();
        let mut mutator = FunctionRemovalMutator::new(cfa, "main");
        let _ = mutator.mutate();
        let _ = mutator.set_result(Outcome::FalseVerdictSameBug);

        let restored = mutator.restore_cfa();
        assert!(restored.function_by_name("helper").is_some());
        assert!(restored.function_by_name("main").is_some());
    }

    #[test]
    fn should_return_without_mutation_bails_out_only_on_a_true_verdict() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa, "main");
        assert!(mutator.should_return_without_mutation(Outcome::TrueVerdict));
        assert!(!mutator.should_return_without_mutation(Outcome::FalseVerdictSameBug));
    }

    #[test]
    fn should_check_feasibility_only_on_a_false_verdict() {
        let cfa = caller_and_helper();
        let mutator = FunctionRemovalMutator::new(cfa, "main");
        assert!(mutator.should_check_feasibility(Outcome::FalseVerdictSameBug));
        assert!(mutator.should_check_feasibility(Outcome::FalseVerdictOtherTarget));
        assert!(!mutator.should_check_feasibility(Outcome::TimeoutUnknown));
    }
}
