//! Opcodes: named, pure operand-stack transformations.
//!
//! Each opcode is a unit type implementing [`Operation`]. The machine pops
//! `arity()` operands, hands them to `execute` bottom-to-top, and pushes the
//! returned values in order. Operations hold no state and perform no I/O.

use std::fmt;

use crate::error::MachineError;
use crate::value::Value;

/// A single stack transformation.
pub trait Operation {
    /// Registered name, e.g. `OP_ADD`.
    fn name(&self) -> &'static str;

    /// Number of operands popped before `execute` runs.
    fn arity(&self) -> usize;

    /// Map the popped operands (bottom to top) to the values to push.
    fn execute(&self, operands: Vec<Value>) -> Result<Vec<Value>, MachineError>;
}

/// The closed set of built-in opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    True,
    False,
    Add,
    Sub,
    Mul,
    Dup,
    Drop,
    Swap,
    Equal,
    Not,
}

impl Opcode {
    pub const ALL: [Opcode; 10] = [
        Opcode::True,
        Opcode::False,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Dup,
        Opcode::Drop,
        Opcode::Swap,
        Opcode::Equal,
        Opcode::Not,
    ];

    /// The implementation behind this opcode.
    pub fn operation(self) -> &'static dyn Operation {
        match self {
            Opcode::True => &OpTrue,
            Opcode::False => &OpFalse,
            Opcode::Add => &OpAdd,
            Opcode::Sub => &OpSub,
            Opcode::Mul => &OpMul,
            Opcode::Dup => &OpDup,
            Opcode::Drop => &OpDrop,
            Opcode::Swap => &OpSwap,
            Opcode::Equal => &OpEqual,
            Opcode::Not => &OpNot,
        }
    }

    pub fn name(self) -> &'static str {
        self.operation().name()
    }

    /// Look up a built-in opcode by its standard name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coerce an operand to an integer.
///
/// Integers pass through and text is parsed as base-10. Everything else,
/// booleans included, is rejected.
fn numeric(opcode: &'static str, value: &Value) -> Result<i64, MachineError> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Text(s) => s.trim().parse().map_err(|_| MachineError::NotNumeric {
            opcode,
            got: format!("{:?}", s),
        }),
        other => Err(MachineError::NotNumeric {
            opcode,
            got: other.type_name().to_string(),
        }),
    }
}

fn binary_arith(
    opcode: &'static str,
    operands: &[Value],
    f: fn(i64, i64) -> Option<i64>,
) -> Result<Vec<Value>, MachineError> {
    let a = numeric(opcode, &operands[0])?;
    let b = numeric(opcode, &operands[1])?;
    let result = f(a, b).ok_or(MachineError::Overflow(opcode))?;
    Ok(vec![Value::Integer(result)])
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Text(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Map(m) => !m.is_empty(),
    }
}

macro_rules! operation {
    ($ty:ident, $name:literal, $arity:literal, |$ops:ident| $body:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl Operation for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn arity(&self) -> usize {
                $arity
            }

            fn execute(&self, $ops: Vec<Value>) -> Result<Vec<Value>, MachineError> {
                $body
            }
        }
    };
}

operation!(OpTrue, "OP_TRUE", 0, |_ops| Ok(vec![Value::Bool(true)]));

operation!(OpFalse, "OP_FALSE", 0, |_ops| Ok(vec![Value::Bool(false)]));

operation!(OpAdd, "OP_ADD", 2, |ops| binary_arith("OP_ADD", &ops, i64::checked_add));

operation!(OpSub, "OP_SUB", 2, |ops| binary_arith("OP_SUB", &ops, i64::checked_sub));

operation!(OpMul, "OP_MUL", 2, |ops| binary_arith("OP_MUL", &ops, i64::checked_mul));

operation!(OpDup, "OP_DUP", 1, |ops| Ok(vec![ops[0].clone(), ops[0].clone()]));

operation!(OpDrop, "OP_DROP", 1, |_ops| Ok(Vec::new()));

operation!(OpSwap, "OP_SWAP", 2, |ops| {
    let mut ops = ops;
    ops.swap(0, 1);
    Ok(ops)
});

operation!(OpEqual, "OP_EQUAL", 2, |ops| Ok(vec![Value::Bool(ops[0] == ops[1])]));

operation!(OpNot, "OP_NOT", 1, |ops| Ok(vec![Value::Bool(!truthy(&ops[0]))]));

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: Opcode, operands: Vec<Value>) -> Result<Vec<Value>, MachineError> {
        op.operation().execute(operands)
    }

    #[test]
    fn test_names_roundtrip() {
        for op in Opcode::ALL {
            assert!(op.name().starts_with("OP_"));
            assert_eq!(Opcode::from_name(op.name()), Some(op));
        }
        assert_eq!(Opcode::from_name("OP_NOPE"), None);
    }

    #[test]
    fn test_add_coerces_text() {
        let out = run(Opcode::Add, vec![Value::from("1"), Value::from("1")]).unwrap();
        assert_eq!(out, vec![Value::Integer(2)]);
    }

    #[test]
    fn test_sub_is_ordered() {
        let out = run(Opcode::Sub, vec![Value::from(5), Value::from(3)]).unwrap();
        assert_eq!(out, vec![Value::Integer(2)]);
    }

    #[test]
    fn test_add_rejects_bool() {
        let err = run(Opcode::Add, vec![Value::from(true), Value::from(1)]).unwrap_err();
        assert!(matches!(err, MachineError::NotNumeric { opcode: "OP_ADD", .. }));
    }

    #[test]
    fn test_add_rejects_non_numeric_text() {
        let err = run(Opcode::Add, vec![Value::from("one"), Value::from(1)]).unwrap_err();
        assert!(matches!(err, MachineError::NotNumeric { .. }));
    }

    #[test]
    fn test_mul_overflow() {
        let err = run(Opcode::Mul, vec![Value::from(i64::MAX), Value::from(2)]).unwrap_err();
        assert_eq!(err, MachineError::Overflow("OP_MUL"));
    }

    #[test]
    fn test_stack_shuffles() {
        let a = Value::from("a");
        let b = Value::from("b");
        assert_eq!(run(Opcode::Dup, vec![a.clone()]).unwrap(), vec![a.clone(), a.clone()]);
        assert_eq!(run(Opcode::Drop, vec![a.clone()]).unwrap(), vec![]);
        assert_eq!(run(Opcode::Swap, vec![a.clone(), b.clone()]).unwrap(), vec![b, a]);
    }

    #[test]
    fn test_equal_and_not() {
        let out = run(Opcode::Equal, vec![Value::from(2), Value::from(2)]).unwrap();
        assert_eq!(out, vec![Value::Bool(true)]);
        assert_eq!(run(Opcode::Not, out).unwrap(), vec![Value::Bool(false)]);
        assert_eq!(run(Opcode::Not, vec![Value::from(0)]).unwrap(), vec![Value::Bool(true)]);
    }
}
