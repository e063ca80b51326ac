use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{PasswordHash, PasswordHasher, PasswordVerifier};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let hasher = argon2::Argon2::default();
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), argon2::password_hash::Error> {
    let hasher = argon2::Argon2::default();
    let parsed_hash = PasswordHash::new(hash)?;
    hasher.verify_password(password.as_bytes(), &parsed_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_the_original_password_only() -> Result<(), argon2::password_hash::Error> {
        let hash = hash_password("hunter2")?;
        assert!(verify_password("hunter2", &hash).is_ok());
        assert!(verify_password("hunter3", &hash).is_err());
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<(), argon2::password_hash::Error> {
        let first = hash_password("same input")?;
        let second = hash_password("same input")?;
        assert_ne!(first, second);
        Ok(())
    }
}
