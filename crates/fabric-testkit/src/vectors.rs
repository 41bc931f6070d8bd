//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding, the default genesis, and the
//! ledger hashes produced by this encoder; a change to any of them changes ids.

use fabric_core::{canonical_bytes, CanonicalValue, Ledger, MerkleTree, Value};

/// A canonical-encoding vector.
#[derive(Debug, Clone)]
pub struct CanonicalVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Builds the input value.
    pub value: fn() -> Value,
    /// Expected canonical bytes (hex).
    pub expected_bytes: &'static str,
    /// Expected value id (hex).
    pub expected_id: &'static str,
}

/// A ledger vector: the default genesis followed by the given messages.
#[derive(Debug, Clone)]
pub struct LedgerVector {
    pub name: &'static str,
    /// Inputs appended as `{ debug: true, input }` after genesis.
    pub inputs: &'static [&'static str],
    /// Expected preimage leaves (hex), genesis first.
    pub expected_leaves: &'static [&'static str],
    /// Expected ledger id (hex).
    pub expected_ledger_id: &'static str,
    /// Expected Merkle root over the preimage (hex).
    pub expected_root: &'static str,
}

/// Get all canonical-encoding vectors.
pub fn canonical_vectors() -> Vec<CanonicalVector> {
    vec![
        CanonicalVector {
            name: "short text",
            value: || Value::from("bar"),
            expected_bytes: "63626172",
            expected_id: "a51b7d32cf572b9468acfde8d65a984bf4a09d4a7810d1fbffcba8025dbb94fa",
        },
        CanonicalVector {
            name: "four zero bytes",
            value: || Value::from(vec![0u8; 4]),
            expected_bytes: "4400000000",
            expected_id: "093f931703155bc6bf1c13039ffdb49856410b2b359c93cab8e52059073ecef9",
        },
        CanonicalVector {
            name: "empty value",
            value: Value::empty,
            expected_bytes: "80",
            expected_id: "76be8b528d0075f7aae98d6fa57a6d3c83ae480a8469e668d7b0af968995ac71",
        },
        CanonicalVector {
            name: "debug message",
            value: || message("Hello, world."),
            expected_bytes: "a2656465627567f565696e7075746d48656c6c6f2c20776f726c642e",
            expected_id: "f0c4e1c7154fb0427829b6eab4c33f8e55fc8e0619a01b50fc32829e52c12ce0",
        },
        CanonicalVector {
            name: "mixed map",
            value: || {
                Value::map([
                    ("nested", Value::Array(vec![Value::Null, Value::from("x")])),
                    ("raw", Value::from(vec![1u8, 2, 3])),
                    ("n", Value::from(-300)),
                ])
            },
            expected_bytes: "a3616e39012b6372617743010203666e657374656482f66178",
            expected_id: "d147f77fc16de08606fb4eefe668480ffee6f3d49aa74c3e8e0a26e87135b918",
        },
    ]
}

/// Get all ledger vectors.
pub fn ledger_vectors() -> Vec<LedgerVector> {
    vec![
        LedgerVector {
            name: "genesis only",
            inputs: &[],
            expected_leaves: &["89a88e812bc1a835792e0824196a91e92eff5058d577889735dda55a5261c999"],
            expected_ledger_id: "6af9cf497aaf2535fb0b3a543f09b5c3a8454cc9f11d6acabdbe4f6e1602aed0",
            expected_root: "6af9cf497aaf2535fb0b3a543f09b5c3a8454cc9f11d6acabdbe4f6e1602aed0",
        },
        LedgerVector {
            name: "two messages",
            inputs: &["Hello, world.", "Why trust? Verify."],
            expected_leaves: &[
                "89a88e812bc1a835792e0824196a91e92eff5058d577889735dda55a5261c999",
                "de75f97eae6a8e272678ca73f913687366e2fb1466d0bcaf8595b2945e6d1c87",
                "a7d8f4f94e498966473b30683d6210b0585a292cd1231e68cc7342c1c9012b97",
            ],
            expected_ledger_id: "802251d61a0db944b88663604292b828b204970797dfc77108c8fcdb16d27905",
            expected_root: "6fe6417540518adf9b89fd93046547e3a616192434dc589c4636f366c6f6de26",
        },
    ]
}

/// The message shape used by the ledger vectors.
pub fn message(input: &str) -> Value {
    Value::map([("debug", Value::from(true)), ("input", Value::from(input))])
}

/// Build the started ledger a vector describes.
pub fn ledger_from_vector(vector: &LedgerVector) -> fabric_core::Result<Ledger> {
    let mut ledger = Ledger::default();
    ledger.start()?;
    for input in vector.inputs {
        ledger.append(message(input))?;
    }
    Ok(ledger)
}

/// Check every vector, returning `(name, matches, detail)` per vector.
///
/// `detail` is the first mismatching field, or empty on success.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results = Vec::new();

    for v in canonical_vectors() {
        let value = (v.value)();
        let bytes = hex::encode(canonical_bytes(&value));
        let id = CanonicalValue::new(value).id().to_hex();
        let detail = if bytes != v.expected_bytes {
            format!("bytes {}", bytes)
        } else if id != v.expected_id {
            format!("id {}", id)
        } else {
            String::new()
        };
        results.push((v.name.to_string(), detail.is_empty(), detail));
    }

    for v in ledger_vectors() {
        let detail = match ledger_from_vector(&v) {
            Ok(ledger) => {
                let leaves: Vec<String> = ledger.preimage().iter().map(hex::encode).collect();
                let root = MerkleTree::new(ledger.preimage()).root().to_hex();
                if leaves != v.expected_leaves {
                    format!("leaves {:?}", leaves)
                } else if ledger.id().to_hex() != v.expected_ledger_id {
                    format!("ledger id {}", ledger.id())
                } else if root != v.expected_root {
                    format!("root {}", root)
                } else {
                    String::new()
                }
            }
            Err(e) => e.to_string(),
        };
        results.push((v.name.to_string(), detail.is_empty(), detail));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, ok, detail) in verify_all_vectors() {
            assert!(ok, "vector '{}' mismatched: {}", name, detail);
        }
    }

    #[test]
    fn test_vectors_are_deterministic() {
        for vector in ledger_vectors() {
            let a = ledger_from_vector(&vector).unwrap();
            let b = ledger_from_vector(&vector).unwrap();
            assert_eq!(a.id(), b.id(), "vector '{}' is not reproducible", vector.name);
        }
    }
}
