//! The control-flow automaton data model (spec.md §3) and its structural
//! invariant checker, C2 (spec.md §4.2).

pub mod cfa;
pub mod check;
pub mod edge;
pub mod expr;
pub mod function;
pub mod machine_model;
pub mod node;

pub use cfa::Cfa;
pub use check::{check, Violation};
pub use edge::{Edge, EdgeId, EdgeKind};
pub use expr::{BinOp, Expr, UnOp};
pub use function::{Function, FunctionId};
pub use machine_model::{IntRank, MachineModel};
pub use node::{Node, NodeId, NodeKind};
