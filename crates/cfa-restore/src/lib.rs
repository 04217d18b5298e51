//! C5: appends C definitions of functions absent from a mutated CFA to a
//! counterexample file the verifier produced, so an external checker
//! reading that file sees a complete program (spec.md §4.5).

mod emit;

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use cfa_graph::Cfa;

pub use emit::emit_function;

/// Byte-for-byte literal separator required by spec.md §6 between the
/// verifier's counterexample bytes and the restored function definitions.
pub const RESTORED_FUNCTIONS_SEPARATOR: &str =
    "\n// Above is counterexample to check.\n// Below are restored functions.\n\n";

#[derive(Debug, thiserror::Error)]
#[error("counterexample restoration failed: {message}")]
pub struct CounterexampleAnalysisFailed {
    pub message: String,
    #[source]
    pub cause: Option<std::io::Error>,
}

impl CounterexampleAnalysisFailed {
    fn io(message: impl Into<String>, cause: std::io::Error) -> Self {
        Self { message: message.into(), cause: Some(cause) }
    }
}

/// The functions present in `original` but not in `already_present`,
/// in declaration order.
pub fn missing_functions<'a>(original: &'a Cfa, already_present: &HashSet<String>) -> Vec<&'a str> {
    original.function_names().filter(|name| !already_present.contains(*name)).collect()
}

/// Renders the restored-functions block for `original`'s functions that are
/// not in `already_present_function_names`, WITHOUT the leading separator.
/// Empty when nothing is missing.
pub fn restored_block(original: &Cfa, already_present_function_names: &HashSet<String>) -> String {
    let missing = missing_functions(original, already_present_function_names);
    let mut block = String::new();
    for name in missing {
        let function = original
            .function_by_name(name)
            .expect("missing_functions only returns names present in `original`");
        block.push_str(&emit_function(original, function, name));
        block.push('\n');
    }
    block
}

/// Appends the restored-functions block (preceded by
/// [`RESTORED_FUNCTIONS_SEPARATOR`]) to the counterexample file at `path`.
/// A no-op if no function is missing.
pub fn restore_into(
    path: &Path,
    original: &Cfa,
    already_present_function_names: &HashSet<String>,
) -> Result<(), CounterexampleAnalysisFailed> {
    let block = restored_block(original, already_present_function_names);
    if block.is_empty() {
        return Ok(());
    }

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| CounterexampleAnalysisFailed::io(format!("opening {}", path.display()), e))?;

    file.write_all(RESTORED_FUNCTIONS_SEPARATOR.as_bytes())
        .and_then(|_| file.write_all(block.as_bytes()))
        .map_err(|e| CounterexampleAnalysisFailed::io(format!("appending to {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_graph::{EdgeKind, MachineModel, NodeKind};
    use std::io::Write as _;

    fn cfa_with_two_functions() -> Cfa {
        let mut cfa = Cfa::new(MachineModel::linux64());

        let removed = cfa.next_function_id();
        let r_entry = cfa.new_node(removed, NodeKind::FunctionEntry);
        let r_exit = cfa.new_node(removed, NodeKind::FunctionExit);
        cfa.add_edge(r_entry, r_exit, EdgeKind::Blank, None);
        cfa.declare_function("helper", r_entry, r_exit, vec![r_entry, r_exit]);

        let kept = cfa.next_function_id();
        let k_entry = cfa.new_node(kept, NodeKind::FunctionEntry);
        let k_exit = cfa.new_node(kept, NodeKind::FunctionExit);
        cfa.add_edge(k_entry, k_exit, EdgeKind::Blank, None);
        cfa.declare_function("main", k_entry, k_exit, vec![k_entry, k_exit]);

        cfa
    }

    #[test]
    fn restore_into_appends_only_the_missing_functions() {
        let cfa = cfa_with_two_functions();
        let mut already_present = HashSet::new();
        already_present.insert("main".to_string());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"counterexample bytes").unwrap();

        restore_into(file.path(), &cfa, &already_present).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.starts_with("counterexample bytes"));
        assert!(written.contains(RESTORED_FUNCTIONS_SEPARATOR));
        assert!(written.contains("void helper(void)"));
        assert!(!written.contains("void main(void)"));
    }

    #[test]
    fn nothing_missing_is_a_no_op() {
        let cfa = cfa_with_two_functions();
        let mut already_present = HashSet::new();
        already_present.insert("main".to_string());
        already_present.insert("helper".to_string());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"counterexample bytes").unwrap();

        restore_into(file.path(), &cfa, &already_present).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "counterexample bytes");
    }

    #[test]
    fn an_unwritable_path_surfaces_as_counterexample_analysis_failed() {
        let cfa = cfa_with_two_functions();
        let missing = HashSet::new();
        let err = restore_into(Path::new("/nonexistent/dir/file.c"), &cfa, &missing).unwrap_err();
        assert!(err.cause.is_some());
    }
}
