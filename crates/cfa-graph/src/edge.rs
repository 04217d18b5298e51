use crate::expr::Expr;
use cfa_arena::identifier;

identifier!(
    /// Id of an [`Edge`] inside a [`crate::Cfa`].
    pub struct EdgeId
);

impl EdgeId {
    pub fn raw(self) -> usize {
        cfa_arena::Id::from(self).raw()
    }
}

/// The finite set of edge kinds a CFA edge can carry (spec.md §3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    Blank,
    Declaration,
    Statement,
    Assume { branch: bool },
    FunctionCall,
    FunctionReturn,
    /// a.k.a. "summary" edge, paired with a `FunctionCall` edge.
    CallToReturn,
    FunctionSummaryStatement,
}

impl EdgeKind {
    pub fn is_assume(self) -> bool {
        matches!(self, EdgeKind::Assume { .. })
    }

    pub fn short_name(self) -> &'static str {
        match self {
            EdgeKind::Blank => "Blank",
            EdgeKind::Declaration => "Declaration",
            EdgeKind::Statement => "Statement",
            EdgeKind::Assume { branch: true } => "Assume(true)",
            EdgeKind::Assume { branch: false } => "Assume(false)",
            EdgeKind::FunctionCall => "FunctionCall",
            EdgeKind::FunctionReturn => "FunctionReturn",
            EdgeKind::CallToReturn => "CallToReturn",
            EdgeKind::FunctionSummaryStatement => "FunctionSummaryStatement",
        }
    }
}

use crate::node::NodeId;

/// A directed edge `from -> to`, labeled with a [`EdgeKind`] and, where
/// applicable, the expression it carries (used by C2's literal range check).
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub expr: Option<Expr>,
}

impl Edge {
    /// Human-readable form used inside [`crate::Violation`] messages.
    pub fn textualize(&self) -> String {
        format!("N{} -[{}]-> N{}", self.from.raw(), self.kind.short_name(), self.to.raw())
    }
}
