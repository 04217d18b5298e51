//! C2: the structural invariant checker (spec.md §3, §4.2).
//!
//! A pure property checker: it never mutates the CFA, and on the first
//! violation it finds it returns a [`Violation`] carrying enough context
//! (function name, node number, adjoining edges textualized) to reproduce
//! the failure without re-running anything.

use std::collections::BTreeSet;

use crate::cfa::Cfa;
use crate::edge::EdgeKind;
use crate::function::{Function, FunctionId};
use crate::node::{NodeId, NodeKind};

/// A single structural invariant violation. Carries enough text to be
/// reproducible on its own; see spec.md §4.2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub function: String,
    pub node: Option<usize>,
    pub message: String,
    pub edges: Vec<String>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node {
            Some(node) => write!(f, "{}: function `{}`, node N{}: {}", "invariant violation", self.function, node, self.message)?,
            None => write!(f, "{}: function `{}`: {}", "invariant violation", self.function, self.message)?,
        }
        for edge in &self.edges {
            write!(f, "\n    {edge}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violation {}

/// Check every function in `cfa` against spec.md §3's invariants. Returns
/// the first violation found, in function-then-node order.
pub fn check(cfa: &Cfa) -> Result<(), Violation> {
    for (_, function) in cfa.functions() {
        check_function(cfa, function)?;
        check_literal_ranges(cfa, function)?;
    }
    Ok(())
}

fn violation(function: &str, node: Option<NodeId>, message: impl Into<String>, edges: Vec<String>) -> Violation {
    Violation {
        function: function.to_string(),
        node: node.map(|n| n.raw()),
        message: message.into(),
        edges,
    }
}

fn check_function(cfa: &Cfa, function: &Function) -> Result<(), Violation> {
    let own_function = cfa.node(function.entry).function;
    let reachable = closure(cfa, own_function, function.entry);
    let declared: BTreeSet<NodeId> = function.nodes.iter().copied().collect();
    if reachable != declared {
        let missing: Vec<_> = declared.difference(&reachable).map(|n| format!("N{}", n.raw())).collect();
        let extra: Vec<_> = reachable.difference(&declared).map(|n| format!("N{}", n.raw())).collect();
        return Err(violation(
            &function.name,
            None,
            format!(
                "node set does not equal the entry-reachable closure (missing: [{}], extra: [{}])",
                missing.join(", "),
                extra.join(", ")
            ),
            Vec::new(),
        ));
    }

    for &node_id in &function.nodes {
        check_node_edges(cfa, &function.name, node_id)?;
        check_node_shape(cfa, &function.name, node_id)?;
    }
    Ok(())
}

/// Every successor's incoming set contains the edge to `n`, and the
/// converse for predecessors; no duplicate edges or duplicate neighbors.
fn check_node_edges(cfa: &Cfa, function_name: &str, id: NodeId) -> Result<(), Violation> {
    let node = cfa.node(id);

    for &edge_id in &node.outgoing {
        let edge = cfa.edge(edge_id);
        let succ = cfa.node(edge.to);
        if !succ.incoming.contains(&edge_id) {
            return Err(violation(
                function_name,
                Some(id),
                format!("edge {} is outgoing from N{} but missing from N{}'s incoming set", edge.textualize(), id.raw(), edge.to.raw()),
                vec![edge.textualize()],
            ));
        }
    }
    let mut neighbor_counts: std::collections::BTreeMap<NodeId, usize> = std::collections::BTreeMap::new();
    for &edge_id in &node.outgoing {
        *neighbor_counts.entry(cfa.edge(edge_id).to).or_default() += 1;
    }
    if let Some((&dup, _)) = neighbor_counts.iter().find(|(_, &count)| count > 1) {
        return Err(violation(
            function_name,
            Some(id),
            format!("duplicate outgoing edges to N{}", dup.raw()),
            node.outgoing.iter().map(|e| cfa.edge(*e).textualize()).collect(),
        ));
    }

    for &edge_id in &node.incoming {
        let edge = cfa.edge(edge_id);
        let pred = cfa.node(edge.from);
        if !pred.outgoing.contains(&edge_id) {
            return Err(violation(
                function_name,
                Some(id),
                format!("edge {} is incoming to N{} but missing from N{}'s outgoing set", edge.textualize(), id.raw(), edge.from.raw()),
                vec![edge.textualize()],
            ));
        }
    }
    Ok(())
}

fn check_node_shape(cfa: &Cfa, function_name: &str, id: NodeId) -> Result<(), Violation> {
    let node = cfa.node(id);
    let outgoing_kinds: Vec<EdgeKind> = node.outgoing.iter().map(|e| cfa.edge(*e).kind).collect();
    let incoming_kinds: Vec<EdgeKind> = node.incoming.iter().map(|e| cfa.edge(*e).kind).collect();
    let edge_texts = || -> Vec<String> {
        node.outgoing
            .iter()
            .chain(node.incoming.iter())
            .map(|e| cfa.edge(*e).textualize())
            .collect()
    };

    match node.kind {
        NodeKind::FunctionEntry => {
            if incoming_kinds.iter().any(|k| *k != EdgeKind::FunctionCall) {
                return Err(violation(function_name, Some(id), "FunctionEntry has a non-FunctionCall incoming edge", edge_texts()));
            }
            if outgoing_kinds.len() != 1 || outgoing_kinds[0] != EdgeKind::Blank {
                return Err(violation(
                    function_name,
                    Some(id),
                    "FunctionEntry must have exactly one outgoing Blank edge",
                    edge_texts(),
                ));
            }
        }
        NodeKind::FunctionExit => {
            if outgoing_kinds.iter().any(|k| *k != EdgeKind::FunctionReturn) {
                return Err(violation(function_name, Some(id), "FunctionExit has a non-FunctionReturn outgoing edge", edge_texts()));
            }
        }
        NodeKind::Termination => {
            if incoming_kinds.is_empty() {
                return Err(violation(function_name, Some(id), "Termination node has no incoming edges", edge_texts()));
            }
            if !outgoing_kinds.is_empty() {
                return Err(violation(function_name, Some(id), "Termination node has outgoing edges", edge_texts()));
            }
        }
        NodeKind::Interior => {
            if incoming_kinds.is_empty() {
                return Err(violation(function_name, Some(id), "interior node has no incoming edges", edge_texts()));
            }
            match outgoing_kinds.len() {
                0 => {
                    return Err(violation(function_name, Some(id), "interior node is a dead end (zero outgoing edges)", edge_texts()));
                }
                1 => {
                    let kind = outgoing_kinds[0];
                    if kind.is_assume() {
                        return Err(violation(function_name, Some(id), "interior node with one outgoing edge must not be Assume", edge_texts()));
                    }
                    if kind == EdgeKind::FunctionSummaryStatement {
                        return Err(violation(
                            function_name,
                            Some(id),
                            "a bare FunctionSummaryStatement may not be a node's only outgoing edge",
                            edge_texts(),
                        ));
                    }
                    if kind == EdgeKind::FunctionCall {
                        return Err(violation(
                            function_name,
                            Some(id),
                            "a FunctionCall outgoing edge requires a co-present CallToReturn summary edge",
                            edge_texts(),
                        ));
                    }
                }
                2 => {
                    let both_assume = outgoing_kinds.iter().all(|k| k.is_assume());
                    let call_and_summary = outgoing_kinds.contains(&EdgeKind::FunctionCall) && outgoing_kinds.contains(&EdgeKind::CallToReturn);
                    if both_assume {
                        let branches: Vec<bool> = outgoing_kinds
                            .iter()
                            .map(|k| match k {
                                EdgeKind::Assume { branch } => *branch,
                                _ => unreachable!(),
                            })
                            .collect();
                        if branches[0] == branches[1] {
                            return Err(violation(function_name, Some(id), "two Assume edges must have opposite truth values", edge_texts()));
                        }
                    } else if !call_and_summary {
                        return Err(violation(
                            function_name,
                            Some(id),
                            "two outgoing edges must be opposite Assume branches, or a FunctionCall paired with its CallToReturn summary",
                            edge_texts(),
                        ));
                    }
                }
                _ => {
                    return Err(violation(function_name, Some(id), "more than two outgoing edges", edge_texts()));
                }
            }
        }
    }
    Ok(())
}

fn check_literal_ranges(cfa: &Cfa, function: &Function) -> Result<(), Violation> {
    let mm = cfa.machine_model();
    for &node_id in &function.nodes {
        for &edge_id in &cfa.node(node_id).outgoing {
            let edge = cfa.edge(edge_id);
            let Some(expr) = &edge.expr else { continue };
            let mut out_of_range = None;
            expr.visit_int_literals(&mut |value, rank| {
                if out_of_range.is_none() && !mm.fits(rank, value) {
                    out_of_range = Some((value, rank));
                }
            });
            if let Some((value, rank)) = out_of_range {
                return Err(violation(
                    &function.name,
                    Some(node_id),
                    format!("integer literal {value} does not fit in declared type {}", rank.c_name()),
                    vec![edge.textualize()],
                ));
            }
        }
    }
    Ok(())
}

/// BFS from `entry` following both successor and predecessor edges, so
/// unreachable-from-entry nodes that still point *into* the graph are
/// discovered (spec.md §4.2). Traversal stays within `owner`: a
/// `FunctionCall`/`FunctionReturn` edge crosses into another function's
/// nodes, which belong to that function's own closure, not this one's.
fn closure(cfa: &Cfa, owner: FunctionId, entry: NodeId) -> BTreeSet<NodeId> {
    let mut visited = BTreeSet::new();
    let mut queue = std::collections::VecDeque::new();
    visited.insert(entry);
    queue.push_back(entry);
    while let Some(id) = queue.pop_front() {
        let neighbors = cfa
            .successors(id)
            .chain(cfa.predecessors(id))
            .filter(|n| cfa.node(*n).function == owner)
            .collect::<Vec<_>>();
        for neighbor in neighbors {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited
}
