use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const MUTATION_COUNT: usize = 5;

/// Encoding variants of `payload`, always in this order: identity, URL,
/// double URL, base64, hex.
pub fn mutate(payload: &str) -> [String; MUTATION_COUNT] {
    let url_encoded = query_escape(payload);
    let double_encoded = query_escape(&url_encoded);

    [
        payload.to_string(),
        url_encoded,
        double_encoded,
        STANDARD.encode(payload.as_bytes()),
        hex::encode(payload.as_bytes()),
    ]
}

fn query_escape(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

pub fn mutation_label(index: usize) -> &'static str {
    match index {
        0 => "identity",
        1 => "url",
        2 => "double-url",
        3 => "base64",
        4 => "hex",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_order() {
        let out = mutate("<a b>");
        assert_eq!(out[0], "<a b>");
        assert_eq!(out[1], "%3Ca+b%3E");
        assert_eq!(out[2], "%253Ca%2Bb%253E");
        assert_eq!(out[3], "PGEgYj4=");
        assert_eq!(out[4], "3c6120623e");
    }

    #[test]
    fn test_mutation_is_deterministic() {
        for payload in ["' OR 1=1--", "../../etc/passwd", "", "..\u{2215}etc"] {
            assert_eq!(mutate(payload), mutate(payload));
        }
    }

    #[test]
    fn test_unreserved_characters_pass_through() {
        let out = mutate("AZaz09-_.~");
        assert_eq!(out[1], "AZaz09-_.~");
        assert_eq!(out[2], "AZaz09-_.~");
    }

    #[test]
    fn test_space_encodes_as_plus() {
        let out = mutate("' OR 1=1--");
        assert_eq!(out[1], "%27+OR+1%3D1--");
        assert_eq!(out[2], "%2527%2BOR%2B1%253D1--");
    }

    #[test]
    fn test_literal_plus_is_escaped() {
        let out = mutate("a+b c");
        assert_eq!(out[1], "a%2Bb+c");
    }

    #[test]
    fn test_empty_payload() {
        let out = mutate("");
        assert!(out.iter().all(String::is_empty));
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = (0..MUTATION_COUNT).map(mutation_label).collect();
        assert_eq!(labels, vec!["identity", "url", "double-url", "base64", "hex"]);
    }
}
