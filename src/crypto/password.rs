//! Password hashing for staff accounts.
//!
//! Hashes use the `pbkdf2:sha256:<iterations>$<salt>$<hex digest>` layout,
//! so hashes produced by the Werkzeug-based tooling verify unchanged.

use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const DIGEST_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Parsed form of a stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHashParts<'a> {
    pub iterations: u32,
    pub salt: &'a str,
    pub digest_hex: &'a str,
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let digest = derive_hex(password, &salt, iterations);
    format!("pbkdf2:sha256:{iterations}${salt}${digest}")
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts = match parse_password_hash(stored) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!("Refusing to verify against stored hash: {e}");
            return false;
        }
    };
    let computed = derive_hex(password, parts.salt, parts.iterations);
    computed.as_bytes().ct_eq(parts.digest_hex.as_bytes()).into()
}

/// Split a stored hash into method parameters, salt and digest.
pub fn parse_password_hash(stored: &str) -> Result<PasswordHashParts<'_>, CryptoError> {
    let mut sections = stored.splitn(3, '$');
    let method = sections.next().ok_or(CryptoError::MalformedHash)?;
    let salt = sections.next().ok_or(CryptoError::MalformedHash)?;
    let digest_hex = sections.next().ok_or(CryptoError::MalformedHash)?;

    let mut method_parts = method.split(':');
    match (method_parts.next(), method_parts.next()) {
        (Some("pbkdf2"), Some("sha256")) => {}
        _ => return Err(CryptoError::UnsupportedMethod(method.to_string())),
    }
    let iterations = method_parts
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .ok_or(CryptoError::MalformedHash)?;

    if salt.is_empty() || digest_hex.len() != DIGEST_LENGTH * 2 {
        return Err(CryptoError::MalformedHash);
    }

    Ok(PasswordHashParts {
        iterations,
        salt,
        digest_hex,
    })
}

fn derive_hex(password: &str, salt: &str, iterations: u32) -> String {
    let mut digest = Zeroizing::new([0u8; DIGEST_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut digest[..]);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}
