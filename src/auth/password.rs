use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Length is counted in characters, so multi-byte passwords are not
/// penalised.
pub fn check_policy(plain: &str) -> Result<(), String> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if plain.trim().is_empty() {
        return Err("Password must not be blank".into());
    }
    Ok(())
}

fn argon_err(e: password_hash::Error) -> anyhow::Error {
    anyhow::anyhow!("argon2: {}", e)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(argon_err)?;
    Ok(phc.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(argon_err)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(argon_err(e)),
    }
}
