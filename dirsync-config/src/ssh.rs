//! OpenSSH authorized-key validation.
//!
//! Accepts lines of the form `[options] <type> <base64 blob> [comment]`. The
//! blob is decoded and its embedded type name must match the declared one.

use crate::error::SshKeyError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

const KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-dss",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
    "ssh-rsa-cert-v01@openssh.com",
    "ssh-ed25519-cert-v01@openssh.com",
    "ecdsa-sha2-nistp256-cert-v01@openssh.com",
    "ecdsa-sha2-nistp384-cert-v01@openssh.com",
    "ecdsa-sha2-nistp521-cert-v01@openssh.com",
];

/// Returns true for key type names this validator knows.
pub fn is_known_key_type(name: &str) -> bool {
    KEY_TYPES.contains(&name)
}

/// Checks that `line` is a well-formed authorized-key entry.
///
/// # Errors
///
/// Returns the first defect found.
pub fn validate_authorized_key(line: &str) -> Result<(), SshKeyError> {
    let mut tokens = line.split_whitespace().peekable();
    let first = *tokens.peek().ok_or(SshKeyError::Empty)?;

    // leading tokens are options until the first known key type
    let key_type = tokens
        .by_ref()
        .find(|t| is_known_key_type(t))
        .ok_or_else(|| SshKeyError::UnknownKeyType(first.to_string()))?;
    let blob = tokens.next().ok_or(SshKeyError::MissingKeyData)?;

    let bytes = BASE64
        .decode(blob)
        .map_err(|e| SshKeyError::InvalidBase64(e.to_string()))?;

    let len_bytes: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or(SshKeyError::Truncated)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let encoded = bytes.get(4..4 + len).ok_or(SshKeyError::Truncated)?;

    if encoded != key_type.as_bytes() {
        return Err(SshKeyError::TypeMismatch {
            declared: key_type.to_string(),
            encoded: String::from_utf8_lossy(encoded).into_owned(),
        });
    }
    Ok(())
}
