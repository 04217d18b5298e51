//! C6: invokes an external counterexample checker on a restored
//! counterexample file and reports feasible/infeasible/failed (spec.md
//! §4.6). All three selectable checker implementations share this crate's
//! delegation and cleanup policy; only [`CexChecker::write`]/
//! [`CexChecker::decide`] are checker-specific.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use cfa_graph::Cfa;

/// Which external checker a [`DelegatingRechecker`] wraps (spec.md §6,
/// `cex.checker`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CheckerType {
    ModelCheckerA,
    SameToolWithConfig,
    ConcreteExecution,
}

/// A reported counterexample: the error state plus the path of states
/// leading to it. The verifier's internal state representation is opaque
/// to this crate; checkers receive whatever they need to serialize and
/// decide on through this handle.
#[derive(Clone, Debug)]
pub struct Counterexample {
    pub error_state: String,
    pub path_states: Vec<String>,
}

/// A `{n}`-templated path for per-round, persisted counterexample files
/// (spec.md §6: `counterexample-with-restored-functions.<N>.c`).
#[derive(Clone, Debug)]
pub struct PathTemplate(pub String);

impl PathTemplate {
    pub fn render(&self, round: u64) -> PathBuf {
        PathBuf::from(self.0.replace("{n}", &round.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("feasibility check failed: {message}")]
pub struct FeasibilityCheckFailed {
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FeasibilityCheckFailed {
    fn from_io(message: impl Into<String>, cause: std::io::Error) -> Self {
        Self { message: message.into(), cause: Some(Box::new(cause)) }
    }

    fn from_restore(cause: cfa_restore::CounterexampleAnalysisFailed) -> Self {
        Self { message: "restoring removed functions".to_string(), cause: Some(Box::new(cause)) }
    }
}

/// One checker's serialization and feasibility policy. Never decides
/// "infeasible" on an I/O error -- that must surface as
/// [`FeasibilityCheckFailed`] instead (spec.md §4.6, §7.5).
pub trait CexChecker {
    /// `(prefix, suffix)` for a scratch file, used when
    /// [`CexChecker::cex_file_template`] is `None`.
    fn temp_file_builder(&self) -> (&str, &str);

    fn cex_file_template(&self) -> Option<PathTemplate> {
        None
    }

    fn write(&self, cex: &Counterexample, out: &mut File) -> std::io::Result<()>;

    fn decide(&mut self, cex: &Counterexample, path: &Path) -> Result<bool, FeasibilityCheckFailed>;
}

/// Wraps a [`CexChecker`], adding the "restore removed functions after the
/// delegate writes" step common to all three checker implementations
/// (spec.md §4.6).
pub struct DelegatingRechecker<D> {
    pub delegate: D,
}

impl<D: CexChecker> DelegatingRechecker<D> {
    pub fn new(delegate: D) -> Self {
        Self { delegate }
    }

    fn write(
        &self,
        cex: &Counterexample,
        original: &Cfa,
        already_present: &HashSet<String>,
        path: &Path,
    ) -> Result<(), FeasibilityCheckFailed> {
        let mut file = File::create(path).map_err(|e| FeasibilityCheckFailed::from_io(format!("creating {}", path.display()), e))?;
        self.delegate
            .write(cex, &mut file)
            .map_err(|e| FeasibilityCheckFailed::from_io(format!("writing {}", path.display()), e))?;
        drop(file);
        cfa_restore::restore_into(path, original, already_present).map_err(FeasibilityCheckFailed::from_restore)
    }

    fn decide(&mut self, cex: &Counterexample, path: &Path) -> Result<bool, FeasibilityCheckFailed> {
        self.delegate.decide(cex, path)
    }
}

/// Picks a cex file (template-derived if the checker supplies one, else a
/// scratch file removed on exit), writes the counterexample plus restored
/// functions, and asks the delegate to decide. `round` selects the
/// template's `{n}`; ignored for scratch files.
pub fn check_counterexample<D: CexChecker>(
    rechecker: &mut DelegatingRechecker<D>,
    cex: &Counterexample,
    round: u64,
    original: &Cfa,
    already_present_function_names: &HashSet<String>,
) -> Result<bool, FeasibilityCheckFailed> {
    let (path, scratch) = match rechecker.delegate.cex_file_template() {
        Some(template) => (template.render(round), false),
        None => {
            let (prefix, suffix) = rechecker.delegate.temp_file_builder();
            let named = tempfile::Builder::new()
                .prefix(prefix)
                .suffix(suffix)
                .tempfile()
                .map_err(|e| FeasibilityCheckFailed::from_io("creating scratch file", e))?;
            let (_, path) = named
                .keep()
                .map_err(|e| FeasibilityCheckFailed::from_io("persisting scratch file", e.error))?;
            (path, true)
        }
    };

    let outcome = rechecker
        .write(cex, original, already_present_function_names, &path)
        .and_then(|_| rechecker.decide(cex, &path));

    if scratch {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch cex file");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_graph::{EdgeKind, MachineModel, NodeKind};

    struct FakeChecker {
        feasible: bool,
        seen_path: Option<PathBuf>,
    }

    impl CexChecker for FakeChecker {
        fn temp_file_builder(&self) -> (&str, &str) {
            ("cex-", ".c")
        }

        fn write(&self, cex: &Counterexample, out: &mut File) -> std::io::Result<()> {
            use std::io::Write;
            writeln!(out, "// error state: {}", cex.error_state)
        }

        fn decide(&mut self, _cex: &Counterexample, path: &Path) -> Result<bool, FeasibilityCheckFailed> {
            self.seen_path = Some(path.to_path_buf());
            Ok(self.feasible)
        }
    }

    fn trivial_cfa() -> Cfa {
        let mut cfa = Cfa::new(MachineModel::linux64());
        let f = cfa.next_function_id();
        let entry = cfa.new_node(f, NodeKind::FunctionEntry);
        let exit = cfa.new_node(f, NodeKind::FunctionExit);
        cfa.add_edge(entry, exit, EdgeKind::Blank, None);
        cfa.declare_function("main", entry, exit, vec![entry, exit]);
        cfa
    }

    #[test]
    fn a_feasible_counterexample_is_reported_true_and_the_scratch_file_is_removed() {
        let cfa = trivial_cfa();
        let mut rechecker = DelegatingRechecker::new(FakeChecker { feasible: true, seen_path: None });
        let cex = Counterexample { error_state: "s1".to_string(), path_states: vec![] };
        let already_present = HashSet::from(["main".to_string()]);

        let feasible = check_counterexample(&mut rechecker, &cex, 1, &cfa, &already_present).unwrap();
        assert!(feasible);
        assert!(!rechecker.delegate.seen_path.as_ref().unwrap().exists());
    }

    #[test]
    fn an_infeasible_counterexample_is_reported_false() {
        let cfa = trivial_cfa();
        let mut rechecker = DelegatingRechecker::new(FakeChecker { feasible: false, seen_path: None });
        let cex = Counterexample { error_state: "s1".to_string(), path_states: vec![] };
        let feasible = check_counterexample(&mut rechecker, &cex, 1, &cfa, &HashSet::new()).unwrap();
        assert!(!feasible);
    }

    struct TemplatedChecker;
    impl CexChecker for TemplatedChecker {
        fn temp_file_builder(&self) -> (&str, &str) {
            ("unused-", ".c")
        }

        fn cex_file_template(&self) -> Option<PathTemplate> {
            Some(PathTemplate(format!("{}/counterexample-with-restored-functions.{{n}}.c", std::env::temp_dir().display())))
        }

        fn write(&self, _cex: &Counterexample, out: &mut File) -> std::io::Result<()> {
            use std::io::Write;
            out.write_all(b"cex bytes")
        }

        fn decide(&mut self, _cex: &Counterexample, _path: &Path) -> Result<bool, FeasibilityCheckFailed> {
            Ok(true)
        }
    }

    #[test]
    fn a_templated_checker_persists_its_file_at_the_rendered_path() {
        let cfa = trivial_cfa();
        let mut rechecker = DelegatingRechecker::new(TemplatedChecker);
        let cex = Counterexample { error_state: "s1".to_string(), path_states: vec![] };
        let already_present = HashSet::from(["main".to_string()]);

        check_counterexample(&mut rechecker, &cex, 7, &cfa, &already_present).unwrap();

        let expected = PathTemplate(format!("{}/counterexample-with-restored-functions.{{n}}.c", std::env::temp_dir().display())).render(7);
        let written = std::fs::read_to_string(&expected).unwrap();
        assert!(written.starts_with("cex bytes"));
        std::fs::remove_file(&expected).ok();
    }
}
