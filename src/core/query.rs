//! Boolean filter expressions over unit attributes.
//!
//! The grammar is flat (no parentheses): an atomic comparison is
//! `FIELD COMPARATOR CONSTANT` with comparator `=` or `>=`; compounds are
//! combined with `AND`, `OR`, and unary `NOT`. Precedence low to high:
//! `OR`, `AND`, the comparators, `NOT` (right-associative).
//!
//! Evaluation tokenizes on whitespace, converts infix to postfix with
//! shunting-yard, then runs the postfix stream on a stack machine. A binary
//! `AND`/`OR` must see either two already-reduced sub-results or two raw
//! leaves; mixing a leaf with a sub-result is a syntax error, as is `NOT`
//! applied to a bare leaf.

use crate::core::error::QueryError;
use crate::core::unit::{Health, Unit};

const OP_AND: &str = "AND";
const OP_OR: &str = "OR";
const OP_NOT: &str = "NOT";
const OP_EQ: &str = "=";
const OP_GTE: &str = ">=";

/// Fixed arity and precedence of an operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OperatorSpec {
    precedence: u8,
    num_operands: usize,
    right_associated: bool,
}

fn operator_spec(value: &str) -> Option<OperatorSpec> {
    let spec = match value {
        OP_OR => OperatorSpec {
            precedence: 0,
            num_operands: 2,
            right_associated: false,
        },
        OP_AND => OperatorSpec {
            precedence: 1,
            num_operands: 2,
            right_associated: false,
        },
        OP_EQ | OP_GTE => OperatorSpec {
            precedence: 2,
            num_operands: 2,
            right_associated: false,
        },
        OP_NOT => OperatorSpec {
            precedence: 3,
            num_operands: 1,
            right_associated: true,
        },
        _ => return None,
    };
    Some(spec)
}

/// One classified token of a query: an operator or an operand leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// The raw token text.
    pub value: &'a str,
    spec: Option<OperatorSpec>,
}

impl Token<'_> {
    /// Whether this token is an operator.
    pub fn is_operator(&self) -> bool {
        self.spec.is_some()
    }
}

/// Tokenize `query` on whitespace and convert it to postfix order via
/// shunting-yard. Unrecognized words are operand leaves.
pub fn to_postfix(query: &str) -> Vec<Token<'_>> {
    let mut output: Vec<Token> = Vec::new();
    let mut op_stack: Vec<(Token, OperatorSpec)> = Vec::new();

    for value in query.split_whitespace() {
        let spec = operator_spec(value);
        let token = Token { value, spec };
        let Some(op) = spec else {
            output.push(token);
            continue;
        };
        while let Some((top, top_spec)) = op_stack.last() {
            let yields = if op.right_associated {
                op.precedence < top_spec.precedence
            } else {
                op.precedence <= top_spec.precedence
            };
            if !yields {
                break;
            }
            output.push(*top);
            op_stack.pop();
        }
        op_stack.push((token, op));
    }
    while let Some((top, _)) = op_stack.pop() {
        output.push(top);
    }
    output
}

/// Typed value of a field or constant.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
}

/// Type a raw string: bool first, then integer with an optional magnitude
/// suffix (K/M/G/T = 2^10..2^40), else plain string.
fn type_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Some(n) = parse_magnitude(raw) {
        return Value::Int(n);
    }
    Value::Str(raw.to_string())
}

fn parse_magnitude(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let (digits, suffix) = raw.split_at(raw.len().checked_sub(1)?);
    let shift = match suffix {
        "K" | "k" => 10,
        "M" | "m" => 20,
        "G" | "g" => 30,
        "T" | "t" => 40,
        _ => return None,
    };
    let base: i64 = digits.parse().ok()?;
    base.checked_mul(1i64 << shift)
}

/// Resolve a leaf as a unit attribute.
///
/// Built-in fields: `name`, `health` (strings), `allocated`, `broken`,
/// `ready` (booleans). Everything else is looked up in the topology's
/// attribute map and typed by parsing.
fn resolve_field(unit: &Unit, name: &str) -> Result<Value, QueryError> {
    match name {
        "name" => Ok(Value::Str(unit.topology.name.clone())),
        "health" => Ok(Value::Str(unit.health.as_str().to_string())),
        "allocated" => Ok(Value::Bool(unit.is_allocated())),
        "broken" => Ok(Value::Bool(unit.health == Health::Broken)),
        "ready" => Ok(Value::Bool(unit.health == Health::Ready)),
        _ => unit
            .topology
            .attributes
            .get(name)
            .map(|raw| type_value(raw))
            .ok_or_else(|| QueryError::UnknownField(name.to_string())),
    }
}

#[derive(Debug, Clone)]
enum Operand<'a> {
    Leaf(&'a str),
    Reduced(bool),
}

fn compare(op: &str, field: &str, constant: &str, unit: &Unit) -> Result<bool, QueryError> {
    let lhs = resolve_field(unit, field)?;
    let rhs = type_value(constant);
    let mismatch = || QueryError::TypeMismatch {
        field: field.to_string(),
        constant: constant.to_string(),
    };
    if op == OP_GTE {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(a >= b),
            (_, Value::Int(_)) => Err(mismatch()),
            _ => Err(QueryError::BadConstant(constant.to_string())),
        }
    } else {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            _ => Err(mismatch()),
        }
    }
}

fn combine(op: &str, field: &str, constant: &str, unit: &Unit) -> Result<bool, QueryError> {
    // A raw-leaf AND/OR resolves like an atomic comparison: left is a field
    // lookup, right is a constant; both must be booleans.
    let lhs = match resolve_field(unit, field)? {
        Value::Bool(b) => b,
        _ => {
            return Err(QueryError::TypeMismatch {
                field: field.to_string(),
                constant: constant.to_string(),
            })
        }
    };
    let rhs = match type_value(constant) {
        Value::Bool(b) => b,
        _ => return Err(QueryError::BadConstant(constant.to_string())),
    };
    Ok(if op == OP_AND { lhs && rhs } else { lhs || rhs })
}

/// Evaluate `query` against `unit`.
///
/// Correct reduction leaves exactly one boolean on the stack; anything else
/// is an error naming the offending token.
pub fn evaluate(query: &str, unit: &Unit) -> Result<bool, QueryError> {
    let postfix = to_postfix(query);
    let mut stack: Vec<Operand> = Vec::new();

    for token in &postfix {
        let Some(spec) = token.spec else {
            stack.push(Operand::Leaf(token.value));
            continue;
        };
        let missing = || QueryError::MissingOperands(token.value.to_string());
        if stack.len() < spec.num_operands {
            return Err(missing());
        }
        if spec.num_operands == 1 {
            match stack.pop().ok_or_else(missing)? {
                Operand::Reduced(b) => stack.push(Operand::Reduced(!b)),
                Operand::Leaf(_) => return Err(QueryError::BareLeaf(token.value.to_string())),
            }
            continue;
        }
        let right = stack.pop().ok_or_else(missing)?;
        let left = stack.pop().ok_or_else(missing)?;
        let result = match (token.value, left, right) {
            (OP_EQ | OP_GTE, Operand::Leaf(f), Operand::Leaf(c)) => {
                compare(token.value, f, c, unit)?
            }
            (OP_AND, Operand::Reduced(a), Operand::Reduced(b)) => a && b,
            (OP_OR, Operand::Reduced(a), Operand::Reduced(b)) => a || b,
            (OP_AND | OP_OR, Operand::Leaf(f), Operand::Leaf(c)) => {
                combine(token.value, f, c, unit)?
            }
            _ => return Err(QueryError::MixedOperands(token.value.to_string())),
        };
        stack.push(Operand::Reduced(result));
    }

    match stack.as_slice() {
        [Operand::Reduced(b)] => Ok(*b),
        other => Err(QueryError::Unreduced(other.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invocation::Topology;

    const SIMPLE_EXPRESSION: &str =
        "numGpus = 2 AND ram >= 8M OR numGpus = 4 AND ram >= 4M AND NOT broken";

    fn test_unit() -> Unit {
        let mut topo = Topology::named("gpu-box");
        topo.attributes.insert("numGpus".to_string(), "2".to_string());
        topo.attributes.insert("ram".to_string(), "8M".to_string());
        topo.attributes
            .insert("licensed".to_string(), "true".to_string());
        Unit::new(topo)
    }

    #[test]
    fn test_simple_postfix_shape() {
        let postfix = to_postfix(SIMPLE_EXPRESSION);
        assert_eq!(postfix.len(), 18);
        let last = postfix.last().unwrap();
        assert!(last.is_operator());
        assert_eq!(last.value, "OR");
    }

    #[test]
    fn test_not_missing_operand_fails() {
        let err = evaluate("NOT", &test_unit()).unwrap_err();
        assert_eq!(err, QueryError::MissingOperands("NOT".to_string()));
    }

    #[test]
    fn test_atomic_comparisons() {
        let unit = test_unit();
        assert!(evaluate("numGpus = 2", &unit).unwrap());
        assert!(!evaluate("numGpus = 4", &unit).unwrap());
        assert!(evaluate("ram >= 4M", &unit).unwrap());
        assert!(!evaluate("ram >= 16M", &unit).unwrap());
        assert!(evaluate("name = gpu-box", &unit).unwrap());
        assert!(evaluate("health = unknown", &unit).unwrap());
        assert!(evaluate("broken = false", &unit).unwrap());
    }

    #[test]
    fn test_compound_precedence() {
        let unit = test_unit();
        // AND binds tighter than OR.
        assert!(evaluate("numGpus = 4 AND ram >= 4M OR numGpus = 2", &unit).unwrap());
        assert!(!evaluate("numGpus = 4 OR ram >= 16M AND numGpus = 2", &unit).unwrap());
        assert!(evaluate("numGpus = 2 AND ram >= 4M AND licensed = true", &unit).unwrap());
    }

    #[test]
    fn test_raw_leaf_and_or() {
        let unit = test_unit();
        assert!(evaluate("licensed AND true", &unit).unwrap());
        assert!(!evaluate("broken OR false", &unit).unwrap());
    }

    #[test]
    fn test_structural_errors() {
        let unit = test_unit();
        assert_eq!(
            evaluate("NOT broken", &unit).unwrap_err(),
            QueryError::BareLeaf("NOT".to_string())
        );
        // Leaf mixed with a sub-result under AND.
        assert!(matches!(
            evaluate("numGpus = 2 AND ram", &unit).unwrap_err(),
            QueryError::MixedOperands(_)
        ));
        // Bare leaf never reduces.
        assert_eq!(
            evaluate("numGpus", &unit).unwrap_err(),
            QueryError::Unreduced(1)
        );
    }

    #[test]
    fn test_field_and_constant_errors() {
        let unit = test_unit();
        assert_eq!(
            evaluate("nonesuch = 2", &unit).unwrap_err(),
            QueryError::UnknownField("nonesuch".to_string())
        );
        assert_eq!(
            evaluate("ram >= banana", &unit).unwrap_err(),
            QueryError::BadConstant("banana".to_string())
        );
        assert!(matches!(
            evaluate("name >= 3", &unit).unwrap_err(),
            QueryError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_magnitude_suffixes() {
        let unit = test_unit();
        // 8M == 8192K
        assert!(evaluate("ram >= 8192K", &unit).unwrap());
        assert!(evaluate("ram = 8388608", &unit).unwrap());
        assert!(!evaluate("ram >= 1G", &unit).unwrap());
    }

    #[test]
    fn test_magnitude_overflow_is_untypeable() {
        let unit = test_unit();
        // Near i64::MAX; scaling by K must fail instead of wrapping.
        assert_eq!(
            evaluate("ram >= 9000000000000000000K", &unit).unwrap_err(),
            QueryError::BadConstant("9000000000000000000K".to_string())
        );
    }
}
