//! Ordered sequences of canonical values.
//!
//! Two separate types, never one type with a mode switch:
//!
//! - [`Stack`] is an append-only commitment log. Entries are never removed
//!   or reordered, and every push folds the entry id into a rolling
//!   commitment.
//! - [`OperandStack`] is a LIFO work area used by the machine. It supports
//!   removal and carries no commitment.

use crate::canonical::{reconstruct, CanonicalValue};
use crate::crypto::Sha256Hash;
use crate::value::Value;

/// Append-only ordered sequence with a rolling commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    entries: Vec<CanonicalValue>,
    commitment: Sha256Hash,
}

impl Stack {
    /// Create an empty stack. Its commitment is [`Sha256Hash::ZERO`].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            commitment: Sha256Hash::ZERO,
        }
    }

    /// Append a value, canonicalizing it if needed.
    ///
    /// Returns the new length (1-based position of the pushed entry).
    pub fn push(&mut self, value: impl Into<CanonicalValue>) -> usize {
        let value = value.into();
        self.commitment = Sha256Hash::hash_pair(&self.commitment.0, &value.id().0);
        self.entries.push(value);
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CanonicalValue> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&CanonicalValue> {
        self.entries.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalValue> {
        self.entries.iter()
    }

    /// Rolling commitment: `H(H(H(0 || id0) || id1) || ...)`.
    pub fn commitment(&self) -> Sha256Hash {
        self.commitment
    }

    /// The entries as one array value.
    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(|e| e.data().clone()).collect())
    }

    /// Rebuild a stack from a serialized array of entries.
    ///
    /// Malformed input yields an empty stack; a preimage that parses but is
    /// not a sequence becomes a single-entry stack.
    pub fn from_preimage(preimage: &str) -> Self {
        let mut stack = Self::new();
        match reconstruct(preimage).into_data() {
            Value::Array(items) => {
                for item in items {
                    stack.push(item);
                }
            }
            other => {
                stack.push(other);
            }
        }
        stack
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a CanonicalValue;
    type IntoIter = std::slice::Iter<'a, CanonicalValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// LIFO operand stack for machine runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandStack {
    items: Vec<Value>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.items.pop()
    }

    /// Pop the top `n` values, returned bottom-to-top.
    ///
    /// Leaves the stack untouched and returns `None` if fewer than `n`
    /// values are present.
    pub fn pop_n(&mut self, n: usize) -> Option<Vec<Value>> {
        if n > self.items.len() {
            return None;
        }
        Some(self.items.split_off(self.items.len() - n))
    }

    pub fn peek(&self) -> Option<&Value> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Contents, bottom to top.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.clone()
    }
}
