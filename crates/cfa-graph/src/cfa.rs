use cfa_arena::Arena;
use indexmap::IndexMap;

use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::expr::Expr;
use crate::function::{Function, FunctionId};
use crate::machine_model::MachineModel;
use crate::node::{Node, NodeId, NodeKind};

/// A control-flow automaton: a collection of per-function directed
/// multigraphs plus the [`MachineModel`] they were built against.
///
/// Nodes and edges are arena-allocated and referenced by id, per spec.md §9:
/// this keeps equality by identity and gives O(1) reverse lookups without
/// reference cycles.
#[derive(Clone)]
pub struct Cfa {
    functions: Arena<Function>,
    by_name: IndexMap<String, FunctionId>,
    nodes: Arena<Node>,
    edges: Arena<Edge>,
    machine_model: MachineModel,
}

impl Cfa {
    pub fn new(machine_model: MachineModel) -> Self {
        Self {
            functions: Arena::new(),
            by_name: IndexMap::new(),
            nodes: Arena::new(),
            edges: Arena::new(),
            machine_model,
        }
    }

    pub fn machine_model(&self) -> &MachineModel {
        &self.machine_model
    }

    /// The id the next [`Cfa::declare_function`] call will hand out, so
    /// callers can build a function's nodes (which must name their owning
    /// [`FunctionId`] up front) before the function itself is registered.
    pub fn next_function_id(&self) -> FunctionId {
        self.functions.next_id().into()
    }

    pub fn new_node(&mut self, function: FunctionId, kind: NodeKind) -> NodeId {
        self.nodes.insert(Node::new(function, kind)).into()
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, expr: Option<Expr>) -> EdgeId {
        let id: EdgeId = self
            .edges
            .insert(Edge { from, to, kind, expr })
            .into();
        self.node_mut(from).outgoing.push(id);
        self.node_mut(to).incoming.push(id);
        id
    }

    /// Register a function whose entry/exit/member nodes have already been
    /// created via [`Cfa::new_node`]/[`Cfa::add_edge`].
    pub fn declare_function(&mut self, name: impl Into<String>, entry: NodeId, exit: NodeId, nodes: Vec<NodeId>) -> FunctionId {
        let name = name.into();
        let id: FunctionId = self
            .functions
            .insert(Function { name: name.clone(), entry, exit, nodes })
            .into();
        self.by_name.insert(name, id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id.into()).expect("NodeId must reference a live node")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes.get_mut(id.into()).expect("NodeId must reference a live node")
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        self.edges.get(id.into()).expect("EdgeId must reference a live edge")
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        self.functions.get(id.into()).expect("FunctionId must reference a live function")
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).map(|id| self.function(*id))
    }

    pub fn function_id_by_name(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.by_name.values().map(|id| (*id, self.function(*id)))
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|s| s.as_str())
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).outgoing.iter().map(|e| self.edge(*e).to)
    }

    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).incoming.iter().map(|e| self.edge(*e).from)
    }

    /// Tombstone a function, removing it from name lookup and iteration.
    /// Its nodes/edges remain allocated (unreferenced by any live function)
    /// so ids elsewhere in the CFA stay valid; this is the self-contained,
    /// non-cloning removal spec.md §3/§9 calls for.
    pub fn remove_function(&mut self, name: &str) -> Option<(FunctionId, Function)> {
        let id = self.by_name.shift_remove(name)?;
        let function = self.functions.remove(id.into())?;
        Some((id, function))
    }

    /// Undo [`Cfa::remove_function`] exactly: reinstate the function record
    /// under the same id and name.
    pub fn restore_function(&mut self, id: FunctionId, function: Function) {
        let name = function.name.clone();
        self.functions.restore(id.into(), function);
        self.by_name.insert(name, id);
    }

    /// Functions this function calls directly, derived from its
    /// `FunctionCall` edges rather than stored separately.
    pub fn callees(&self, id: FunctionId) -> Vec<FunctionId> {
        let mut callees = Vec::new();
        for &node_id in &self.function(id).nodes {
            for edge_id in &self.node(node_id).outgoing {
                let edge = self.edge(*edge_id);
                if edge.kind == EdgeKind::FunctionCall {
                    let callee_fn = self.node(edge.to).function;
                    if !callees.contains(&callee_fn) {
                        callees.push(callee_fn);
                    }
                }
            }
        }
        callees
    }
}
