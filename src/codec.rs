use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;

// Fixed key shipped with the client. This only obfuscates cached documents so
// they are not trivially readable on disk; it is not a confidentiality
// mechanism and must not be treated as one.
const KEY: &[u8] = b"OUTREACH_2024_CACHE_KEY";

fn xor_key(data: &[u8]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ KEY[i % KEY.len()])
        .collect()
}

/// Serialize a value into the obfuscated text form used by the slot store.
/// Returns None on any failure; callers treat that as "nothing to cache".
pub fn encode<T: Serialize>(value: &T) -> Option<String> {
    let json = serde_json::to_string(value).ok()?;
    let inner = general_purpose::STANDARD.encode(json.as_bytes());
    let scrambled = xor_key(inner.as_bytes());
    Some(general_purpose::STANDARD.encode(scrambled))
}

/// Reverse of [`encode`]. Corrupted or foreign input yields None, never a panic.
pub fn decode<T: DeserializeOwned>(encoded: &str) -> Option<T> {
    let scrambled = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let inner = xor_key(&scrambled);
    let inner = String::from_utf8(inner).ok()?;
    let json = general_purpose::STANDARD.decode(inner.as_bytes()).ok()?;
    let json = String::from_utf8(json).ok()?;
    serde_json::from_str(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn round_trips_json_values() {
        let values = [
            json!(null),
            json!(42),
            json!("héllo wörld ✉"),
            json!([1, 2, 3]),
            json!({"name": "Ada", "email": "ada@example.com", "nested": {"ok": true}}),
        ];
        for v in values {
            let encoded = encode(&v).expect("encode");
            let back: serde_json::Value = decode(&encoded).expect("decode");
            assert_eq!(back, v);
        }
    }

    #[test]
    fn round_trips_typed_maps() {
        let mut m = BTreeMap::new();
        m.insert("a@x.com".to_string(), vec!["one".to_string(), "two".to_string()]);
        let encoded = encode(&m).unwrap();
        let back: BTreeMap<String, Vec<String>> = decode(&encoded).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn output_is_not_plaintext() {
        let encoded = encode(&json!({"email": "ada@example.com"})).unwrap();
        assert!(!encoded.contains("ada@example.com"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode::<serde_json::Value>(""), None);
        assert_eq!(decode::<serde_json::Value>("not base64 !!!"), None);
        // Valid base64 that is not a codec document.
        let stray = general_purpose::STANDARD.encode(b"stray bytes");
        assert_eq!(decode::<serde_json::Value>(&stray), None);
        // Truncated real output.
        let encoded = encode(&json!([1, 2, 3])).unwrap();
        assert_eq!(decode::<serde_json::Value>(&encoded[..encoded.len() / 2]), None);
    }

    #[test]
    fn decode_rejects_type_mismatch() {
        let encoded = encode(&json!("a string")).unwrap();
        assert_eq!(decode::<Vec<u32>>(&encoded), None);
    }
}
