//! Random primitives shared by the custody components.
//!
//! Everything here draws from the OS cryptographically secure RNG. No
//! function accepts caller-supplied entropy.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

/// Length of a disclosure token before encoding (32 bytes)
pub const TOKEN_LEN: usize = 32;

/// Generate cryptographically secure random bytes.
///
/// # Type Parameters
///
/// - `N`: The number of bytes to generate
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a URL-safe random token (32 bytes, base64url without padding).
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_LEN] = generate_random_bytes();
    BASE64_URL.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes() {
        let bytes1: [u8; 16] = generate_random_bytes();
        let bytes2: [u8; 16] = generate_random_bytes();

        // Should generate different values
        assert_ne!(bytes1, bytes2);
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();

        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(token.len(), 43);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        assert_ne!(token, generate_token());
    }
}
