use sha2::{Digest, Sha256};

pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a presented bearer token against the configured one.
///
/// Both sides are hashed first so the constant-time comparison always runs
/// over equal-length inputs.
pub fn verify_service_token(expected: &str, presented: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let expected = hash_token(expected);
    let presented = hash_token(presented);
    subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_deterministic() {
        let hash1 = hash_token("hwr_svc_abc");
        let hash2 = hash_token("hwr_svc_abc");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64, "SHA256 hash should be 64 hex chars");
    }

    #[test]
    fn test_verify_service_token() {
        let token = "hwr_svc_9f2c41d7b0e8";

        assert!(verify_service_token(token, token));
        assert!(!verify_service_token(token, "hwr_svc_wrong"));
        assert!(!verify_service_token(token, ""));
    }

    #[test]
    fn test_empty_expected_token_rejects_everything() {
        assert!(!verify_service_token("", ""));
        assert!(!verify_service_token("", "anything"));
    }
}
