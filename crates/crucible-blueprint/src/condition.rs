//! Tiny boolean-expression evaluator for conditional edges.
//!
//! Grammar: atoms of the form `<dimension> <op> <integer>` where `<op>` is
//! one of `==`, `!=`, `>=`, `<=`, `>`, `<`, combined with `&&` / `||`
//! (left-to-right, no operator precedence beyond that — sufficient for the
//! per-index gating conditions blueprints express). No parentheses.

use std::collections::BTreeMap;

use crate::error::{BlueprintError, BlueprintResult};

/// Evaluates `expr` against a substitution map of loop dimension name to
/// concrete index.
pub fn evaluate(
    expr: &str,
    indices: &BTreeMap<String, usize>,
    from: &str,
    to: &str,
) -> BlueprintResult<bool> {
    if let Some((lhs, rhs)) = split_once_top_level(expr, "||") {
        return Ok(evaluate(lhs.trim(), indices, from, to)? || evaluate(rhs.trim(), indices, from, to)?);
    }
    if let Some((lhs, rhs)) = split_once_top_level(expr, "&&") {
        return Ok(evaluate(lhs.trim(), indices, from, to)? && evaluate(rhs.trim(), indices, from, to)?);
    }
    evaluate_atom(expr.trim(), indices, from, to)
}

fn split_once_top_level<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    expr.split_once(op)
}

fn evaluate_atom(
    atom: &str,
    indices: &BTreeMap<String, usize>,
    from: &str,
    to: &str,
) -> BlueprintResult<bool> {
    const OPS: &[&str] = &["==", "!=", ">=", "<=", ">", "<"];
    for op in OPS {
        if let Some((lhs, rhs)) = atom.split_once(op) {
            let dim = lhs.trim();
            let rhs = rhs.trim();
            let index = *indices.get(dim).ok_or_else(|| BlueprintError::InvalidCondition {
                from: from.to_string(),
                to: to.to_string(),
                condition: atom.to_string(),
                reason: format!("unknown loop dimension {dim}"),
            })? as i64;
            let value: i64 = rhs.parse().map_err(|_| BlueprintError::InvalidCondition {
                from: from.to_string(),
                to: to.to_string(),
                condition: atom.to_string(),
                reason: format!("expected an integer literal, got {rhs:?}"),
            })?;
            return Ok(match *op {
                "==" => index == value,
                "!=" => index != value,
                ">=" => index >= value,
                "<=" => index <= value,
                ">" => index > value,
                "<" => index < value,
                _ => unreachable!(),
            });
        }
    }
    Err(BlueprintError::InvalidCondition {
        from: from.to_string(),
        to: to.to_string(),
        condition: atom.to_string(),
        reason: "no recognized comparison operator".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn equality_condition() {
        let indices = idx(&[("segment", 0)]);
        assert!(evaluate("segment == 0", &indices, "a", "b").unwrap());
        assert!(!evaluate("segment == 1", &indices, "a", "b").unwrap());
    }

    #[test]
    fn and_or_combinators() {
        let indices = idx(&[("segment", 2), ("shot", 0)]);
        assert!(evaluate("segment > 0 && shot == 0", &indices, "a", "b").unwrap());
        assert!(evaluate("segment == 0 || shot == 0", &indices, "a", "b").unwrap());
        assert!(!evaluate("segment == 0 && shot == 1", &indices, "a", "b").unwrap());
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        let indices = idx(&[("segment", 0)]);
        assert!(evaluate("shot == 0", &indices, "a", "b").is_err());
    }
}
