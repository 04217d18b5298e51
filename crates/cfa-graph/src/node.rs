use cfa_arena::identifier;
use smallvec::SmallVec;

use crate::edge::EdgeId;
use crate::function::FunctionId;

identifier!(
    /// Id of a [`Node`] inside a [`crate::Cfa`].
    pub struct NodeId
);

impl NodeId {
    pub fn raw(self) -> usize {
        cfa_arena::Id::from(self).raw()
    }
}

/// What a node represents within its function (spec.md §3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    FunctionEntry,
    FunctionExit,
    Termination,
    Interior,
}

/// A CFA node: a function id plus its incident edges. Edges live in the
/// CFA's own arena; a node stores only the ids of the ones touching it, in
/// insertion order, so `successors`/`predecessors` are O(out-degree).
#[derive(Clone, Debug)]
pub struct Node {
    pub function: FunctionId,
    pub kind: NodeKind,
    pub incoming: SmallVec<[EdgeId; 2]>,
    pub outgoing: SmallVec<[EdgeId; 2]>,
}

impl Node {
    pub fn new(function: FunctionId, kind: NodeKind) -> Self {
        Self {
            function,
            kind,
            incoming: SmallVec::new(),
            outgoing: SmallVec::new(),
        }
    }
}
