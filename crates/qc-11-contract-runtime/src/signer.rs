//! # Contract Signer
//!
//! Ed25519 authorship signatures over bytecode. Provenance only: a contract
//! is valid and executable whether or not it was ever signed.
//!
//! The signed message is `H("QC-CONTRACT-SIG-V1" | H(bytecode))`, so a
//! signature over contract code can never be replayed as a signature over
//! anything else.

use crate::domain::services::hash256_concat;
use crate::domain::value_objects::ByteCode;
use crate::errors::SigningError;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use std::fmt;

/// Domain separation prefix of the signed message.
pub const SIGNATURE_DOMAIN: &[u8] = b"QC-CONTRACT-SIG-V1";

/// Private key length in bytes (Ed25519 seed).
pub const PRIVATE_KEY_LEN: usize = 32;

/// Public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 signature over a contract.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ContractSignature([u8; SIGNATURE_LEN]);

impl ContractSignature {
    /// Wraps raw signature bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Debug for ContractSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractSignature(0x{}..)", hex::encode(&self.0[..8]))
    }
}

fn signed_message(code: &ByteCode) -> [u8; 32] {
    let code_hash = code.hash();
    hash256_concat(&[SIGNATURE_DOMAIN, code_hash.as_bytes()]).0
}

fn signing_key(private_key: &[u8]) -> Result<SigningKey, SigningError> {
    let seed: [u8; PRIVATE_KEY_LEN] = private_key
        .try_into()
        .map_err(|_| SigningError::InvalidPrivateKey {
            expected: PRIVATE_KEY_LEN,
            actual: private_key.len(),
        })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Signs `code`. Fails fast on a malformed private key.
pub fn sign(private_key: &[u8], code: &ByteCode) -> Result<ContractSignature, SigningError> {
    let key = signing_key(private_key)?;
    Ok(ContractSignature(key.sign(&signed_message(code)).to_bytes()))
}

/// Public key belonging to `private_key`.
pub fn public_key(private_key: &[u8]) -> Result<[u8; PUBLIC_KEY_LEN], SigningError> {
    Ok(signing_key(private_key)?.verifying_key().to_bytes())
}

/// Checks a signature, reporting why it does not hold.
pub fn try_verify(
    public_key: &[u8],
    code: &ByteCode,
    signature: &[u8],
) -> Result<(), SigningError> {
    let key_bytes: [u8; PUBLIC_KEY_LEN] = public_key
        .try_into()
        .map_err(|_| SigningError::InvalidPublicKey)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| SigningError::InvalidPublicKey)?;
    let signature = Signature::from_slice(signature).map_err(|_| SigningError::InvalidSignature)?;
    key.verify_strict(&signed_message(code), &signature)
        .map_err(|_| SigningError::InvalidSignature)
}

/// Returns true iff `signature` is a valid signature of `code` by
/// `public_key`. Never fails: malformed input is simply not valid.
#[must_use]
pub fn verify(public_key: &[u8], code: &ByteCode, signature: &[u8]) -> bool {
    try_verify(public_key, code, signature).is_ok()
}
