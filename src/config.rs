//! Configuration for Sealkeeper
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};

use crate::custodial_keys::keypair::{DEFAULT_KEY_BITS, MIN_KEY_BITS};
use crate::custodial_keys::{CustodyConfig, DisclosureMode, EnvelopeAlgorithm};

/// Sealkeeper - custodial signing keys
#[derive(Parser, Debug, Clone)]
#[command(name = "sealkeeper")]
#[command(about = "Custodial RSA signing keys with sealed storage and one-time disclosure")]
pub struct Args {
    /// Operator master secret (base64, hex, or raw text)
    #[arg(long, env = "MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,

    /// Reveal private keys without a one-time token, any number of times
    #[arg(long, env = "EXPOSE_PRIVATE_ALWAYS", default_value = "false")]
    pub expose_private_always: bool,

    /// AEAD for new envelopes (aes-256-gcm, chacha20-poly1305)
    #[arg(long, env = "ENVELOPE_ALGORITHM", default_value = "aes-256-gcm")]
    pub envelope_algorithm: EnvelopeAlgorithm,

    /// RSA modulus size for new key pairs
    #[arg(long, env = "RSA_KEY_BITS", default_value_t = DEFAULT_KEY_BITS)]
    pub rsa_key_bits: usize,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "sealkeeper")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Operator commands, one per core operation
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate and seal the key pair of a principal
    Generate {
        /// Principal identifier
        principal: String,
    },

    /// Sign text with a principal's key
    Sign {
        principal: String,

        /// Text to sign
        text: String,

        /// Keep the text with the signature record
        #[arg(long, default_value = "false")]
        store_text: bool,
    },

    /// Verify a stored signature by identifier
    VerifyId {
        signature_id: String,

        /// Address recorded in the verification ledger
        #[arg(long, default_value = "cli")]
        requester: String,
    },

    /// Verify text and a base64 signature
    VerifyPayload {
        text: String,

        signature_b64: String,

        /// Address recorded in the verification ledger
        #[arg(long, default_value = "cli")]
        requester: String,
    },

    /// Reveal a principal's private key
    Reveal {
        principal: String,

        /// One-time disclosure token
        #[arg(long, env = "DISCLOSURE_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Show a principal's public key and fingerprint
    PublicKey { principal: String },
}

impl Args {
    /// Disclosure mode selected by `EXPOSE_PRIVATE_ALWAYS`
    pub fn disclosure_mode(&self) -> DisclosureMode {
        if self.expose_private_always {
            DisclosureMode::AlwaysOpen
        } else {
            DisclosureMode::OneTimeToken
        }
    }

    /// Settings handed to the custody service
    pub fn custody_config(&self) -> CustodyConfig {
        CustodyConfig {
            envelope_algorithm: self.envelope_algorithm,
            disclosure_mode: self.disclosure_mode(),
            rsa_key_bits: self.rsa_key_bits,
        }
    }

    /// Whether logs should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.master_key.as_deref() {
            None => return Err("MASTER_KEY is required".to_string()),
            Some(secret) if secret.trim().is_empty() => {
                return Err("MASTER_KEY is empty".to_string())
            }
            Some(_) => {}
        }

        if self.rsa_key_bits < MIN_KEY_BITS {
            return Err(format!(
                "RSA_KEY_BITS must be at least {} (got {})",
                MIN_KEY_BITS, self.rsa_key_bits
            ));
        }

        if !matches!(self.log_format.to_ascii_lowercase().as_str(), "text" | "json") {
            return Err(format!("LOG_FORMAT must be text or json (got {})", self.log_format));
        }

        Ok(())
    }
}
