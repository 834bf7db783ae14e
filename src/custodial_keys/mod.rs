//! Custodial Key Management
//!
//! Key pairs are generated and held on behalf of principals. The private
//! half never rests in plaintext and leaves custody only through the
//! disclosure gate.
//!
//! # Architecture
//!
//! Each principal gets one RSA key pair:
//! - Public key (SPKI PEM) is published together with its SHA-256 fingerprint
//! - Private key (PKCS#8 PEM) is sealed under the deployment master key
//!   (AES-256-GCM by default, ChaCha20-Poly1305 selectable)
//! - Signatures are RSASSA-PSS over SHA-256 with a 32-byte salt
//!
//! # Disclosure
//!
//! By default a one-time token is issued at creation. Presenting it once
//! reveals the private key; afterwards the key is sealed for good. Deployments
//! may instead run with disclosure always open.

pub mod crypto;
pub mod disclosure;
pub mod envelope;
pub mod keypair;
pub mod master_key;
pub mod records;
pub mod service;
pub mod signer;

pub use crypto::{generate_random_bytes, generate_token, TOKEN_LEN};
pub use disclosure::{DisclosureGate, DisclosureMode};
pub use envelope::{EnvelopeAlgorithm, EnvelopeCipher, SealedEnvelope};
pub use keypair::{algorithm_tag, fingerprint, generate_keypair, GeneratedKeyPair};
pub use master_key::{MasterKey, MasterKeyEncoding};
pub use records::{
    ByIdOutcome, ByPayloadOutcome, KeyPairRecord, PublicKeyInfo, SignatureRecord,
    SignatureSummary, VerificationOutcome,
};
pub use service::{CustodialKeyService, CustodyConfig};
pub use signer::{hash_hex, sign, verify};
