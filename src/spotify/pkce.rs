//! PKCE (RFC 7636) verifier, challenge and state generation

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generates a cryptographically random code verifier for PKCE.
///
/// Returns a 64-character URL-safe string (48 random bytes → base64url).
#[must_use]
pub fn generate_code_verifier() -> String {
    let mut random_bytes = [0u8; 48];
    rand::rng().fill(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Computes the S256 code challenge from a code verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generates a random `state` parameter for the authorization request.
#[must_use]
pub fn generate_state() -> String {
    let mut random_bytes = [0u8; 16];
    rand::rng().fill(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Whether `verifier` hashes to `challenge`
pub fn verify_challenge(verifier: &str, challenge: &str) -> bool {
    generate_code_challenge(verifier) == challenge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_verifier_length() {
        assert_eq!(generate_code_verifier().len(), 64);
    }

    #[test]
    fn test_code_verifier_url_safe() {
        let verifier = generate_code_verifier();
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier should be URL-safe: {}",
            verifier
        );
    }

    #[test]
    fn test_code_verifier_uniqueness() {
        assert_ne!(generate_code_verifier(), generate_code_verifier());
    }

    #[test]
    fn test_code_challenge_known_vector() {
        // RFC 7636 appendix B
        assert_eq!(
            generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_verify_challenge() {
        let verifier = generate_code_verifier();
        let challenge = generate_code_challenge(&verifier);
        assert!(verify_challenge(&verifier, &challenge));
        assert!(!verify_challenge("other", &challenge));
    }

    #[test]
    fn test_state_length() {
        assert_eq!(generate_state().len(), 22);
    }
}
