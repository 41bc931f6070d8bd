//! Scripts: ordered token programs for the machine.

/// Prefix shared by every opcode-shaped token.
pub const OPCODE_PREFIX: &str = "OP_";

/// Whether `token` follows the opcode naming convention `OP_[A-Z0-9_]+`.
pub fn is_opcode_shaped(token: &str) -> bool {
    match token.strip_prefix(OPCODE_PREFIX) {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
        }
        None => false,
    }
}

/// An ordered list of untyped tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    tokens: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token. Returns the new token count.
    pub fn push(&mut self, token: impl Into<String>) -> usize {
        self.tokens.push(token.into());
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

impl<T: Into<String>> FromIterator<T> for Script {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}
