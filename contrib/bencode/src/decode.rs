use std::collections::BTreeMap;

use crate::{Error, Value};

/// Decodes a single bencoded value, rejecting any trailing bytes after it.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] for truncated input, non-minimal
/// integers, `-0`, unsorted or duplicate dictionary keys, dictionary keys
/// that are not byte strings, or bytes left over once the value ends.
pub fn decode(input: &[u8]) -> Result<Value, Error> {
    let mut pos = 0;
    let value = decode_value(input, &mut pos)?;
    if pos != input.len() {
        return Err(malformed(pos, "trailing data after top-level value"));
    }
    Ok(value)
}

fn malformed(position: usize, reason: &str) -> Error {
    Error::MalformedInput {
        position,
        reason: reason.to_owned(),
    }
}

fn decode_value(input: &[u8], pos: &mut usize) -> Result<Value, Error> {
    match input.get(*pos) {
        Some(b'i') => decode_int(input, pos),
        Some(b'l') => decode_list(input, pos),
        Some(b'd') => decode_dict(input, pos),
        Some(b'0'..=b'9') => decode_bytes(input, pos).map(Value::Bytes),
        Some(_) => Err(malformed(*pos, "expected 'i', 'l', 'd' or a digit")),
        None => Err(malformed(*pos, "unexpected end of input")),
    }
}

fn decode_int(input: &[u8], pos: &mut usize) -> Result<Value, Error> {
    debug_assert_eq!(input[*pos], b'i');
    *pos += 1;
    let start = *pos;
    let end = find(input, *pos, b'e').ok_or_else(|| malformed(*pos, "unterminated integer"))?;
    let digits = &input[start..end];
    let text = std::str::from_utf8(digits).map_err(|_| malformed(start, "integer is not ASCII"))?;

    validate_minimal_integer(text, start)?;

    let value: i64 = text.parse().map_err(|_| malformed(start, "integer out of range"))?;
    *pos = end + 1;
    Ok(Value::Int(value))
}

fn validate_minimal_integer(text: &str, start: usize) -> Result<(), Error> {
    if text.is_empty() {
        return Err(malformed(start, "empty integer"));
    }
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(start, "integer must be decimal digits"));
    }
    if sign && digits == "0" {
        return Err(malformed(start, "negative zero is not allowed"));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(malformed(start, "integer has a non-minimal leading zero"));
    }
    Ok(())
}

fn decode_bytes(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, Error> {
    let start = *pos;
    let colon = find(input, *pos, b':').ok_or_else(|| malformed(*pos, "unterminated byte string length"))?;
    let digits = &input[start..colon];
    let text = std::str::from_utf8(digits).map_err(|_| malformed(start, "length is not ASCII"))?;

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(start, "byte string length must be decimal digits"));
    }
    if text.len() > 1 && text.starts_with('0') {
        return Err(malformed(start, "byte string length has a non-minimal leading zero"));
    }

    let length: usize = text.parse().map_err(|_| malformed(start, "byte string length out of range"))?;
    let data_start = colon + 1;
    let data_end = data_start
        .checked_add(length)
        .ok_or_else(|| malformed(start, "byte string length overflows"))?;
    if data_end > input.len() {
        return Err(malformed(start, "byte string runs past end of input"));
    }

    *pos = data_end;
    Ok(input[data_start..data_end].to_vec())
}

fn decode_list(input: &[u8], pos: &mut usize) -> Result<Value, Error> {
    debug_assert_eq!(input[*pos], b'l');
    *pos += 1;
    let mut items = Vec::new();
    loop {
        match input.get(*pos) {
            Some(b'e') => {
                *pos += 1;
                break;
            }
            Some(_) => items.push(decode_value(input, pos)?),
            None => return Err(malformed(*pos, "unterminated list")),
        }
    }
    Ok(Value::List(items))
}

fn decode_dict(input: &[u8], pos: &mut usize) -> Result<Value, Error> {
    debug_assert_eq!(input[*pos], b'd');
    *pos += 1;
    let mut map = BTreeMap::new();
    let mut last_key: Option<Vec<u8>> = None;
    loop {
        match input.get(*pos) {
            Some(b'e') => {
                *pos += 1;
                break;
            }
            Some(b'0'..=b'9') => {
                let key_start = *pos;
                let key = decode_bytes(input, pos)?;
                if let Some(previous) = &last_key {
                    match key.cmp(previous) {
                        std::cmp::Ordering::Equal => return Err(malformed(key_start, "duplicate dictionary key")),
                        std::cmp::Ordering::Less => return Err(malformed(key_start, "dictionary keys out of order")),
                        std::cmp::Ordering::Greater => {}
                    }
                }
                let value = decode_value(input, pos)?;
                last_key = Some(key.clone());
                map.insert(key, value);
            }
            Some(_) => return Err(malformed(*pos, "dictionary key must be a byte string")),
            None => return Err(malformed(*pos, "unterminated dictionary")),
        }
    }
    Ok(Value::Dict(map))
}

fn find(input: &[u8], from: usize, needle: u8) -> Option<usize> {
    input[from..].iter().position(|&b| b == needle).map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_values() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Int(42));
        assert_eq!(decode(b"i-3e").unwrap(), Value::Int(-3));
        assert_eq!(decode(b"i0e").unwrap(), Value::Int(0));
        assert_eq!(decode(b"4:spam").unwrap(), Value::string("spam"));
        assert_eq!(decode(b"l4:spami42ee").unwrap(), Value::List(vec![Value::string("spam"), Value::Int(42)]));
    }

    #[test]
    fn rejects_non_minimal_integers() {
        assert!(decode(b"i03e").is_err());
        assert!(decode(b"i-0e").is_err());
        assert!(decode(b"ie").is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode(b"4:sp").is_err());
        assert!(decode(b"i42").is_err());
        assert!(decode(b"l4:spam").is_err());
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(decode(b"i42egarbage").is_err());
    }

    #[test]
    fn rejects_unsorted_or_duplicate_dict_keys() {
        assert!(decode(b"d1:zi1e1:ai2ee").is_err());
        assert!(decode(b"d1:ai1e1:ai2ee").is_err());
        assert!(decode(b"d1:ai1e1:zi2ee").is_ok());
    }
}
