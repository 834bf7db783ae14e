//! One-time disclosure of sealed private keys.
//!
//! The plaintext private key leaves custody through exactly one path:
//! [`DisclosureGate::reveal`]. In the default mode the principal must present
//! the token issued at key creation, and that token works once.
//!
//! # Security
//!
//! - Tokens are 32 random bytes from the OS RNG (base64url, no padding)
//! - Consumption is a single atomic compare-and-clear in the store, so two
//!   concurrent reveals with the same token cannot both succeed
//! - The envelope is opened only after the supplied token matches, and
//!   before it is consumed; an integrity failure leaves the token in place
//! - A wrong token never opens the envelope and does not burn the real one

use tracing::{info, warn};
use zeroize::Zeroizing;

use super::crypto::generate_token;
use super::envelope::EnvelopeCipher;
use crate::store::CustodyStore;
use crate::types::{CustodyError, DisclosureError, Result};

/// How private keys may be revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisclosureMode {
    /// Token issued at creation, valid for a single reveal
    #[default]
    OneTimeToken,
    /// Reveal without a token, any number of times (`EXPOSE_PRIVATE_ALWAYS`)
    AlwaysOpen,
}

/// Mediates every reveal of a sealed private key
#[derive(Debug, Clone, Copy, Default)]
pub struct DisclosureGate {
    mode: DisclosureMode,
}

impl DisclosureGate {
    pub fn new(mode: DisclosureMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DisclosureMode {
        self.mode
    }

    /// Token to store with a new key pair, `None` in `AlwaysOpen` mode.
    pub fn issue_token(&self) -> Option<String> {
        match self.mode {
            DisclosureMode::OneTimeToken => Some(generate_token()),
            DisclosureMode::AlwaysOpen => None,
        }
    }

    /// Reveal the private key PEM of `principal_id`.
    ///
    /// # Arguments
    ///
    /// * `store` - Where the key pair and its token live
    /// * `cipher` - Opens the sealed private key
    /// * `principal_id` - Owner of the key pair
    /// * `supplied_token` - Token presented by the caller
    ///
    /// # Returns
    ///
    /// The PKCS#8 PEM in a zeroizing buffer, or:
    /// - `NoKeyPair` when the principal has no key pair
    /// - `Disclosure(MissingToken)` when no token was supplied
    /// - `Disclosure(AlreadyConsumed)` when the token was already used
    /// - `Disclosure(InvalidToken)` when the token does not match
    /// - `Integrity` when the envelope cannot be opened
    pub async fn reveal(
        &self,
        store: &dyn CustodyStore,
        cipher: &EnvelopeCipher,
        principal_id: &str,
        supplied_token: Option<&str>,
    ) -> Result<Zeroizing<String>> {
        let key_pair = store
            .find_key_pair(principal_id)
            .await?
            .ok_or_else(|| CustodyError::NoKeyPair(principal_id.to_string()))?;

        if self.mode == DisclosureMode::AlwaysOpen {
            let private_key_pem = cipher.open(&key_pair.sealed_private_key)?;
            info!(principal_id = %principal_id, "Private key revealed (always-open mode)");
            return Ok(private_key_pem);
        }

        let token = match supplied_token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Err(DisclosureError::MissingToken.into()),
        };

        match key_pair.disclosure_token.as_deref() {
            None => return Err(DisclosureError::AlreadyConsumed.into()),
            Some(stored) if stored != token => {
                warn!(principal_id = %principal_id, "Reveal refused: invalid disclosure token");
                return Err(DisclosureError::InvalidToken.into());
            }
            Some(_) => {}
        }

        // Only a matching token gets the envelope opened
        let private_key_pem = cipher.open(&key_pair.sealed_private_key)?;

        if store.consume_disclosure_token(principal_id, token).await? {
            info!(principal_id = %principal_id, "Private key revealed, disclosure token consumed");
            return Ok(private_key_pem);
        }

        // Lost a race against another reveal; the current state decides
        let current = store.find_key_pair(principal_id).await?;
        match current.and_then(|kp| kp.disclosure_token) {
            None => Err(DisclosureError::AlreadyConsumed.into()),
            Some(_) => {
                warn!(principal_id = %principal_id, "Reveal refused: invalid disclosure token");
                Err(DisclosureError::InvalidToken.into())
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
