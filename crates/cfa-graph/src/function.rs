use cfa_arena::identifier;

use crate::node::NodeId;

identifier!(
    /// Id of a [`Function`] inside a [`crate::Cfa`].
    pub struct FunctionId
);

impl FunctionId {
    pub fn raw(self) -> usize {
        cfa_arena::Id::from(self).raw()
    }
}

/// A function's declared membership: its entry/exit nodes and the node set
/// that should equal the predecessor/successor closure from `entry` (C2
/// checks this equality; it is not assumed).
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub entry: NodeId,
    pub exit: NodeId,
    pub nodes: Vec<NodeId>,
}
