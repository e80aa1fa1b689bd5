//! Verification of the `<algorithm>$<fields>` password encoding written by
//! the identity provider's user table.

use argon2::{password_hash::PasswordHash, Argon2, PasswordVerifier};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ARGON2: &str = "argon2";
const PBKDF2_SHA256: &str = "pbkdf2_sha256";

/// Prefix of passwords that can never be used to log in.
const UNUSABLE_PREFIX: char = '!';

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Encoded password as stored on the user row.
#[derive(Debug, Clone)]
pub struct EncodedPassword(String);

impl EncodedPassword {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_usable(&self) -> bool {
        !self.0.is_empty() && !self.0.starts_with(UNUSABLE_PREFIX)
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.0.split_once('$').map(|(algorithm, _)| algorithm)
    }
}

/// Verify a password against its stored encoding.
///
/// Supports `argon2$<PHC string without leading $>` and
/// `pbkdf2_sha256$<iterations>$<salt>$<base64 digest>`. Comparison is
/// constant-time for both.
pub fn verify_password(
    password: &Password,
    encoded: &EncodedPassword,
) -> Result<(), anyhow::Error> {
    if !encoded.is_usable() {
        anyhow::bail!("Password is unusable");
    }

    let (algorithm, fields) = encoded
        .as_str()
        .split_once('$')
        .ok_or_else(|| anyhow::anyhow!("Invalid password encoding"))?;

    match algorithm {
        ARGON2 => verify_argon2(password, fields),
        PBKDF2_SHA256 => verify_pbkdf2_sha256(password, fields),
        other => Err(anyhow::anyhow!("Unsupported password hasher: {}", other)),
    }
}

fn verify_argon2(password: &Password, fields: &str) -> Result<(), anyhow::Error> {
    let phc = format!("${}", fields);
    let parsed_hash = PasswordHash::new(&phc)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

fn verify_pbkdf2_sha256(password: &Password, fields: &str) -> Result<(), anyhow::Error> {
    let mut parts = fields.splitn(3, '$');
    let (Some(iterations), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("Invalid pbkdf2_sha256 encoding");
    };
    let iterations: u32 = iterations
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid pbkdf2_sha256 iteration count: {}", e))?;
    if iterations == 0 {
        anyhow::bail!("Invalid pbkdf2_sha256 iteration count: 0");
    }

    let expected = STANDARD
        .decode(expected)
        .map_err(|e| anyhow::anyhow!("Invalid pbkdf2_sha256 digest: {}", e))?;

    let mut derived = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_str().as_bytes(),
        salt.as_bytes(),
        iterations,
        &mut derived,
    );

    if bool::from(derived.as_slice().ct_eq(expected.as_slice())) {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Password verification failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    fn encoded(s: &str) -> EncodedPassword {
        EncodedPassword::new(s.to_string())
    }

    fn secret() -> Password {
        Password::new("secret".to_string())
    }

    #[test]
    fn test_pbkdf2_sha256_known_digest() {
        let stored = encoded("pbkdf2_sha256$1000$abc$ezAwPW/wuspSU83Z4aU2LP5+de/RqK3RFrreZbJFqEM=");
        assert!(verify_password(&secret(), &stored).is_ok());
        assert!(verify_password(&Password::new("Secret".to_string()), &stored).is_err());
    }

    #[test]
    fn test_pbkdf2_sha256_production_iterations() {
        let stored = encoded(
            "pbkdf2_sha256$260000$Zl8hN1bxJ6cP$0gl+SQL5oHhCmDLkAyBYlT0a37uR2Calrwf539YSt+g=",
        );
        assert!(verify_password(&secret(), &stored).is_ok());
    }

    #[test]
    fn test_malformed_pbkdf2_is_rejected() {
        assert!(verify_password(&secret(), &encoded("pbkdf2_sha256$260000$abc$def")).is_err());
        assert!(verify_password(&secret(), &encoded("pbkdf2_sha256$many$abc$def")).is_err());
        assert!(verify_password(&secret(), &encoded("pbkdf2_sha256$1000")).is_err());
    }

    #[test]
    fn test_argon2_with_algorithm_prefix() {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(b"secret", &salt)
            .unwrap()
            .to_string();
        let stored = encoded(&format!("{}{}", ARGON2, phc));

        assert_eq!(stored.algorithm(), Some(ARGON2));
        assert!(verify_password(&secret(), &stored).is_ok());
        assert!(verify_password(&Password::new("wrong".to_string()), &stored).is_err());
    }

    #[test]
    fn test_bare_phc_string_is_not_accepted() {
        let salt = SaltString::generate(&mut OsRng);
        let phc = Argon2::default()
            .hash_password(b"secret", &salt)
            .unwrap()
            .to_string();

        assert!(verify_password(&secret(), &encoded(&phc)).is_err());
    }

    #[test]
    fn test_unusable_and_unknown_encodings() {
        assert!(!encoded("").is_usable());
        assert!(!encoded("!Xy7ghQ").is_usable());
        assert!(verify_password(&secret(), &encoded("!Xy7ghQ")).is_err());
        assert!(verify_password(&secret(), &encoded("md5$salt$hash")).is_err());
    }
}
