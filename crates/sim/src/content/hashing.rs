use sha2::{Digest, Sha256};

use super::catalog::RecipeDef;

/// Order-sensitive SHA-256 over recipe fields. Callers pass recipes sorted by
/// def name.
pub(crate) fn fingerprint_recipes(recipes: &[RecipeDef]) -> String {
    let mut hasher = Sha256::new();
    for recipe in recipes {
        hasher.update(recipe.def_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(recipe.label.as_bytes());
        hasher.update([0u8]);
        hasher.update(recipe.base_time_ms.to_le_bytes());
        hasher.update(recipe.batch_size.to_le_bytes());
        hasher.update(recipe.input_cost.to_le_bytes());
        hasher.update(recipe.unit_value.to_le_bytes());
    }
    to_hex_lower(&hasher.finalize())
}

/// SHA-256 of a serialized snapshot, used to detect silent divergence
/// between two replays of the same action log.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    to_hex_lower(&Sha256::digest(bytes))
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(def_name: &str, batch_size: u32) -> RecipeDef {
        RecipeDef {
            def_name: def_name.to_string(),
            label: "Label".to_string(),
            base_time_ms: 10_000,
            batch_size,
            input_cost: 0,
            unit_value: 1,
        }
    }

    #[test]
    fn fingerprint_changes_on_any_field() {
        let a = fingerprint_recipes(&[recipe("a", 10)]);
        let b = fingerprint_recipes(&[recipe("a", 11)]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn byte_fingerprint_is_hex_sha256() {
        assert_eq!(
            fingerprint_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
