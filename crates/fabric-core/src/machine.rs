//! Machine: a stack interpreter over scripts of untyped tokens.
//!
//! Lifecycle: `Stopped -> Started -> (Computing) -> Started -> Stopped`.
//!
//! `compute` first resolves every token to an instruction, so a script with
//! an unknown opcode fails before anything executes. Resolution rules:
//!
//! 1. a token naming a defined opcode dispatches to it;
//! 2. an unregistered opcode-shaped token (`OP_[A-Z0-9_]+`) is an
//!    [`MachineError::UnknownOpcode`] under [`OpcodePolicy::Strict`], or a
//!    text literal under [`OpcodePolicy::Lenient`];
//! 3. anything else is a literal: an integer if it parses as base-10 `i64`,
//!    text otherwise.
//!
//! A successful run snapshots the operand stack (bottom to top) into a
//! [`State`]. A failed run leaves no state behind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::canonical::{CanonicalValue, ValueId};
use crate::error::MachineError;
use crate::opcode::Opcode;
use crate::script::{is_opcode_shaped, Script};
use crate::stack::OperandStack;
use crate::value::Value;

/// How unregistered opcode-shaped tokens are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpcodePolicy {
    /// Reject with `UnknownOpcode`.
    #[default]
    Strict,
    /// Push as a text literal.
    Lenient,
}

/// Machine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub policy: OpcodePolicy,
}

/// Lifecycle state of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineLifecycle {
    Stopped,
    Started,
    Computing,
}

impl MachineLifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            MachineLifecycle::Stopped => "stopped",
            MachineLifecycle::Started => "started",
            MachineLifecycle::Computing => "computing",
        }
    }
}

/// Result of a successful run: the final operand stack as a canonical array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State(CanonicalValue);

impl State {
    fn from_stack(stack: Vec<Value>) -> Self {
        Self(CanonicalValue::new(Value::Array(stack)))
    }

    pub fn id(&self) -> ValueId {
        self.0.id()
    }

    /// Final stack contents, bottom to top.
    pub fn stack(&self) -> &[Value] {
        self.0.data().as_array().unwrap_or(&[])
    }

    pub fn value(&self) -> &CanonicalValue {
        &self.0
    }

    pub fn into_value(self) -> CanonicalValue {
        self.0
    }
}

/// A resolved script step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Instruction {
    Literal(Value),
    Op(Opcode),
}

fn literal(token: &str) -> Value {
    match token.parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::Text(token.to_string()),
    }
}

/// Stack interpreter with a per-instance opcode table.
#[derive(Debug, Clone)]
pub struct Machine {
    config: MachineConfig,
    opcodes: HashMap<String, Opcode>,
    script: Script,
    stack: OperandStack,
    state: Option<State>,
    lifecycle: MachineLifecycle,
}

impl Machine {
    /// Create a stopped machine with an empty opcode table.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            opcodes: HashMap::new(),
            script: Script::new(),
            stack: OperandStack::new(),
            state: None,
            lifecycle: MachineLifecycle::Stopped,
        }
    }

    /// Create a stopped machine with every built-in opcode under its
    /// standard name.
    pub fn with_standard_opcodes(config: MachineConfig) -> Self {
        let mut machine = Self::new(config);
        for op in Opcode::ALL {
            machine.opcodes.insert(op.name().to_string(), op);
        }
        machine
    }

    /// Register `opcode` under `name`, returning the opcode it replaces.
    ///
    /// Takes `&mut self`, so it can never overlap a run.
    pub fn define(&mut self, name: impl Into<String>, opcode: Opcode) -> Option<Opcode> {
        self.opcodes.insert(name.into(), opcode)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.opcodes.contains_key(name)
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut Script {
        &mut self.script
    }

    pub fn start(&mut self) -> Result<(), MachineError> {
        if self.lifecycle != MachineLifecycle::Stopped {
            return Err(self.lifecycle_fault("start"));
        }
        self.stack.clear();
        self.lifecycle = MachineLifecycle::Started;
        tracing::debug!(tokens = self.script.len(), "machine started");
        Ok(())
    }

    /// Run the pending script and store the resulting [`State`].
    ///
    /// The script itself is left in place.
    pub fn compute(&mut self) -> Result<&State, MachineError> {
        if self.lifecycle != MachineLifecycle::Started {
            return Err(self.lifecycle_fault("compute"));
        }

        self.lifecycle = MachineLifecycle::Computing;
        self.state = None;
        self.stack.clear();

        let outcome = self.resolve().and_then(|program| self.execute(program));
        self.lifecycle = MachineLifecycle::Started;

        match outcome {
            Ok(()) => {
                let state = State::from_stack(self.stack.snapshot());
                tracing::debug!(id = %state.id(), depth = state.stack().len(), "computed state");
                Ok(self.state.insert(state))
            }
            Err(e) => {
                tracing::debug!(error = %e, "machine run failed");
                self.stack.clear();
                Err(e)
            }
        }
    }

    /// Finish the run. Safe from any state; a computed state is kept.
    pub fn stop(&mut self) {
        self.stack.clear();
        self.lifecycle = MachineLifecycle::Stopped;
    }

    /// State of the last successful run, if any.
    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn lifecycle(&self) -> MachineLifecycle {
        self.lifecycle
    }

    fn resolve(&self) -> Result<Vec<Instruction>, MachineError> {
        self.script
            .tokens()
            .iter()
            .map(|token| {
                if let Some(op) = self.opcodes.get(token) {
                    return Ok(Instruction::Op(*op));
                }
                if is_opcode_shaped(token) {
                    return match self.config.policy {
                        OpcodePolicy::Strict => Err(MachineError::UnknownOpcode(token.clone())),
                        OpcodePolicy::Lenient => Ok(Instruction::Literal(Value::Text(token.clone()))),
                    };
                }
                Ok(Instruction::Literal(literal(token)))
            })
            .collect()
    }

    fn execute(&mut self, program: Vec<Instruction>) -> Result<(), MachineError> {
        for instruction in program {
            match instruction {
                Instruction::Literal(value) => self.stack.push(value),
                Instruction::Op(opcode) => {
                    let op = opcode.operation();
                    let available = self.stack.len();
                    let operands =
                        self.stack
                            .pop_n(op.arity())
                            .ok_or(MachineError::StackUnderflow {
                                opcode: op.name(),
                                required: op.arity(),
                                available,
                            })?;
                    for value in op.execute(operands)? {
                        self.stack.push(value);
                    }
                }
            }
        }
        Ok(())
    }

    fn lifecycle_fault(&self, operation: &'static str) -> MachineError {
        MachineError::Lifecycle {
            operation,
            state: self.lifecycle.as_str(),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::with_standard_opcodes(MachineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tokens: &[&str]) -> Result<Vec<Value>, MachineError> {
        let mut machine = Machine::default();
        for token in tokens {
            machine.script_mut().push(*token);
        }
        machine.start()?;
        let stack = machine.compute()?.stack().to_vec();
        machine.stop();
        Ok(stack)
    }

    #[test]
    fn test_op_true() {
        assert_eq!(run(&["OP_TRUE"]).unwrap(), vec![Value::Bool(true)]);
    }

    #[test]
    fn test_one_plus_one() {
        assert_eq!(run(&["1", "1", "OP_ADD"]).unwrap(), vec![Value::Integer(2)]);
    }

    #[test]
    fn test_chained_add() {
        assert_eq!(
            run(&["1", "1", "OP_ADD", "2", "OP_ADD"]).unwrap(),
            vec![Value::Integer(4)]
        );
    }

    #[test]
    fn test_non_numeric_literal_is_text() {
        assert_eq!(
            run(&["hello", "1"]).unwrap(),
            vec![Value::from("hello"), Value::Integer(1)]
        );
    }

    #[test]
    fn test_underflow_leaves_no_state() {
        let mut machine = Machine::default();
        machine.script_mut().push("1");
        machine.script_mut().push("OP_ADD");
        machine.start().unwrap();

        let err = machine.compute().unwrap_err();
        assert_eq!(
            err,
            MachineError::StackUnderflow {
                opcode: "OP_ADD",
                required: 2,
                available: 1
            }
        );
        assert!(machine.state().is_none());
        assert_eq!(machine.lifecycle(), MachineLifecycle::Started);
    }

    #[test]
    fn test_unknown_opcode_strict() {
        let err = run(&["1", "OP_NOPE"]).unwrap_err();
        assert_eq!(err, MachineError::UnknownOpcode("OP_NOPE".into()));
    }

    #[test]
    fn test_unknown_opcode_rejected_before_execution() {
        let mut machine = Machine::default();
        machine.script_mut().push("OP_TRUE");
        machine.script_mut().push("OP_NOPE");
        machine.start().unwrap();
        machine.compute().unwrap_err();
        assert!(machine.state().is_none());
    }

    #[test]
    fn test_unknown_opcode_lenient() {
        let mut machine = Machine::with_standard_opcodes(MachineConfig {
            policy: OpcodePolicy::Lenient,
        });
        machine.script_mut().push("OP_NOPE");
        machine.start().unwrap();
        let state = machine.compute().unwrap();
        assert_eq!(state.stack(), &[Value::from("OP_NOPE")]);
    }

    #[test]
    fn test_define_overwrites() {
        let mut machine = Machine::default();
        assert_eq!(machine.define("OP_ADD", Opcode::Mul), Some(Opcode::Add));
        assert_eq!(machine.define("OP_TIMES", Opcode::Mul), None);

        for token in ["3", "4", "OP_ADD", "2", "OP_TIMES"] {
            machine.script_mut().push(token);
        }
        machine.start().unwrap();
        assert_eq!(machine.compute().unwrap().stack(), &[Value::Integer(24)]);
    }

    #[test]
    fn test_empty_machine_has_no_opcodes() {
        let mut machine = Machine::new(MachineConfig::default());
        assert!(!machine.is_defined("OP_TRUE"));
        machine.script_mut().push("OP_TRUE");
        machine.start().unwrap();
        assert!(matches!(machine.compute(), Err(MachineError::UnknownOpcode(_))));
    }

    #[test]
    fn test_compute_requires_start() {
        let mut machine = Machine::default();
        assert!(matches!(
            machine.compute(),
            Err(MachineError::Lifecycle { operation: "compute", state: "stopped" })
        ));
    }

    #[test]
    fn test_restart_is_clean() {
        let mut machine = Machine::default();
        machine.script_mut().push("OP_TRUE");
        machine.start().unwrap();
        machine.stop();
        machine.start().unwrap();

        let first = machine.compute().unwrap().id();
        machine.stop();
        assert_eq!(machine.state().map(State::id), Some(first));

        machine.start().unwrap();
        assert_eq!(machine.compute().unwrap().id(), first);
        assert!(matches!(machine.start(), Err(MachineError::Lifecycle { .. })));
    }

    #[test]
    fn test_state_is_canonical_array() {
        let stack = run(&["1", "2"]).unwrap();
        let state = State::from_stack(stack.clone());
        assert_eq!(state.value().data(), &Value::Array(stack));
        assert_eq!(state.id(), CanonicalValue::new(state.value().data().clone()).id());
    }
}
