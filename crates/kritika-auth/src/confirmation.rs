//! Confirmation codes handed out at signup and exchanged for tokens.
//!
//! Only the digest of a code is stored; the check re-runs the same one-way
//! function the generator used.

use sha2::{Digest as _, Sha256};

const CODE_BYTES: usize = 32;

/// A freshly generated code together with the digest to persist.
#[derive(Debug)]
pub struct ConfirmationCode {
    pub code: String,
    pub digest: String,
}

pub fn generate_code() -> ConfirmationCode {
    let raw = rand::random::<[u8; CODE_BYTES]>();
    let code = base16ct::lower::encode_string(&raw);
    let digest = digest_code(&code);
    ConfirmationCode { code, digest }
}

pub fn digest_code(code: &str) -> String {
    let hash = Sha256::digest(code.as_bytes());
    base16ct::lower::encode_string(&hash)
}

pub fn check_code(supplied: &str, stored_digest: &str) -> bool {
    digest_code(supplied) == stored_digest
}
