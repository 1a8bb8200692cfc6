use crate::Value;

/// Encodes a value into its canonical bencoded byte representation.
///
/// Dictionary keys are always emitted in ascending byte order because
/// `Value::Dict` is backed by a `BTreeMap`; callers never need to
/// pre-sort their keys.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        Value::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(map) => {
            out.push(b'd');
            for (key, value) in map {
                encode_into(&Value::Bytes(key.clone()), out);
                encode_into(value, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn encodes_integers() {
        assert_eq!(encode(&Value::Int(42)), b"i42e");
        assert_eq!(encode(&Value::Int(-3)), b"i-3e");
        assert_eq!(encode(&Value::Int(0)), b"i0e");
    }

    #[test]
    fn encodes_byte_strings() {
        assert_eq!(encode(&Value::string("spam")), b"4:spam");
        assert_eq!(encode(&Value::bytes(Vec::<u8>::new())), b"0:");
    }

    #[test]
    fn encodes_lists() {
        let value = Value::List(vec![Value::string("spam"), Value::Int(42)]);
        assert_eq!(encode(&value), b"l4:spami42ee");
    }

    #[test]
    fn encodes_empty_dict() {
        assert_eq!(encode(&Value::Dict(BTreeMap::new())), b"de");
    }
}
