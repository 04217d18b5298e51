use std::fmt::Write as _;

use cfa_graph::{BinOp, Cfa, EdgeKind, Expr, Function, NodeKind, UnOp};

fn expr_to_c(expr: &Expr) -> String {
    match expr {
        Expr::IntLiteral(value, _rank) => value.to_string(),
        Expr::Var(name) => name.clone(),
        Expr::UnOp(op, inner) => {
            let sym = match op {
                UnOp::Neg => "-",
                UnOp::Not => "!",
                UnOp::BitNot => "~",
            };
            format!("({sym}{})", expr_to_c(inner))
        }
        Expr::BinOp(lhs, op, rhs) => {
            let sym = match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Mod => "%",
                BinOp::And => "&&",
                BinOp::Or => "||",
                BinOp::BitAnd => "&",
                BinOp::BitOr => "|",
                BinOp::BitXor => "^",
                BinOp::Shl => "<<",
                BinOp::Shr => ">>",
                BinOp::Lt => "<",
                BinOp::Le => "<=",
                BinOp::Gt => ">",
                BinOp::Ge => ">=",
                BinOp::Eq => "==",
                BinOp::Ne => "!=",
            };
            format!("({} {sym} {})", expr_to_c(lhs), expr_to_c(rhs))
        }
    }
}

/// Emits `function` as a single C function definition: a label per CFA node
/// and a `goto` per edge, so that the restored body stays a faithful,
/// mechanically reversible translation of the graph rather than a
/// decompilation attempt. `void`-typed; argument and return types are not
/// reconstructed here since the CFA carries no declared C signature for a
/// removed function beyond its body (spec.md §1 leaves the type system to
/// the CFA builder).
pub fn emit_function(cfa: &Cfa, function: &Function, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "void {name}(void) {{");

    let mut nodes: Vec<_> = function.nodes.clone();
    nodes.sort_by_key(|n| n.raw());

    for node_id in nodes {
        let node = cfa.node(node_id);
        let _ = writeln!(out, "N{}:;", node_id.raw());

        match node.kind {
            NodeKind::FunctionExit => {
                let _ = writeln!(out, "  return;");
                continue;
            }
            NodeKind::Termination => {
                let _ = writeln!(out, "  abort();");
                continue;
            }
            _ => {}
        }

        let outgoing: Vec<_> = node.outgoing.iter().map(|e| cfa.edge(*e)).collect();

        if outgoing.len() == 2 {
            if let (EdgeKind::Assume { branch: b0 }, EdgeKind::Assume { branch: b1 }) = (outgoing[0].kind, outgoing[1].kind) {
                let (then, otherwise) = if b0 { (outgoing[0], outgoing[1]) } else { (outgoing[1], outgoing[0]) };
                let cond = then.expr.as_ref().map(expr_to_c).unwrap_or_else(|| "1".to_string());
                let _ = writeln!(out, "  if ({cond}) goto N{}; else goto N{};", then.to.raw(), otherwise.to.raw());
                continue;
            }
            if outgoing.iter().any(|e| e.kind == EdgeKind::FunctionCall) {
                let call = outgoing.iter().find(|e| e.kind == EdgeKind::FunctionCall).unwrap();
                let summary = outgoing.iter().find(|e| e.kind == EdgeKind::CallToReturn);
                let callee_name = cfa.function(cfa.node(call.to).function).name.clone();
                let _ = writeln!(out, "  {callee_name}();");
                if let Some(summary) = summary {
                    let _ = writeln!(out, "  goto N{};", summary.to.raw());
                }
                continue;
            }
        }

        for edge in &outgoing {
            match edge.kind {
                EdgeKind::CallToReturn => {
                    let _ = writeln!(out, "  goto N{};", edge.to.raw());
                }
                EdgeKind::Statement | EdgeKind::Declaration | EdgeKind::FunctionSummaryStatement => {
                    if let Some(expr) = &edge.expr {
                        let _ = writeln!(out, "  {};", expr_to_c(expr));
                    }
                    let _ = writeln!(out, "  goto N{};", edge.to.raw());
                }
                EdgeKind::Blank | EdgeKind::FunctionReturn => {
                    let _ = writeln!(out, "  goto N{};", edge.to.raw());
                }
                EdgeKind::Assume { .. } | EdgeKind::FunctionCall => {
                    // handled by the two-outgoing-edge cases above; a lone
                    // Assume or FunctionCall edge cannot reach here under a
                    // structurally valid CFA (spec.md §3).
                }
            }
        }
    }

    out.push_str("}\n");
    out
}
