//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use fabric_core::{Key, Opcode, Script, Value};

/// Generate a random key.
pub fn key() -> impl Strategy<Value = Key> {
    any::<[u8; 32]>().prop_map(|seed| Key::from_seed(&seed))
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a scalar value.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        ".{0,24}".prop_map(Value::Text),
        payload(48).prop_map(Value::from),
    ]
}

/// Generate an arbitrary value up to a few levels deep.
pub fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..8).prop_map(Value::Map),
        ]
    })
}

/// Generate distinct-key map entries in shuffled order.
pub fn entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z]{1,8}", scalar(), 0..12)
        .prop_map(|m: BTreeMap<String, Value>| m.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// Generate a script that pushes literals and then folds them with `OP_ADD`.
///
/// Returns the script and the expected sum.
pub fn sum_script() -> impl Strategy<Value = (Script, i64)> {
    prop::collection::vec(-1000i64..1000, 1..16).prop_map(|numbers| {
        let mut script = Script::new();
        script.push(numbers[0].to_string());
        for n in &numbers[1..] {
            script.push(n.to_string());
            script.push(Opcode::Add.name());
        }
        (script, numbers.iter().sum())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::{canonical_bytes, decode_value, CanonicalValue, Machine};

    proptest! {
        #[test]
        fn test_canonical_id_deterministic(v in value()) {
            let a = CanonicalValue::new(v.clone());
            let b = CanonicalValue::new(v);
            prop_assert_eq!(a.id(), b.id());
        }

        #[test]
        fn test_decode_inverts_encode(v in value()) {
            let bytes = canonical_bytes(&v);
            prop_assert_eq!(decode_value(&bytes).unwrap(), v);
        }

        #[test]
        fn test_insertion_order_irrelevant(entries in entries()) {
            let forward = Value::map(entries.clone());
            let reversed = Value::map(entries.into_iter().rev());
            prop_assert_eq!(canonical_bytes(&forward), canonical_bytes(&reversed));
        }

        #[test]
        fn test_signature_bit_flips(key in key(), data in payload(64), bit in 0usize..512) {
            let value = CanonicalValue::new(Value::from(data));
            let sig = value.sign(&key);
            prop_assert!(value.verify(&key.public_key(), &sig));

            let mut flipped = sig;
            flipped.0[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(!value.verify(&key.public_key(), &flipped));

            let mut bytes = value.to_bytes();
            let i = bit % bytes.len();
            bytes[i] ^= 0x01;
            prop_assert!(!key.verify(&bytes, &sig));
        }

        #[test]
        fn test_sum_script((script, expected) in sum_script()) {
            let mut machine = Machine::default();
            *machine.script_mut() = script;
            machine.start().unwrap();
            let state = machine.compute().unwrap();
            prop_assert_eq!(state.stack(), &[Value::Integer(expected)]);
        }
    }
}
