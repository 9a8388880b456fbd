use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
const SPECIAL_CHARACTERS: &str = "@$!%*?&";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("{0}")]
    Weak(String),

    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
}

/// Password rules: length, a lowercase and an uppercase letter, a digit and one of `@$!%*?&`.
pub fn check_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::Weak(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARACTERS.contains(c));

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(PasswordError::Weak(
            "Password must contain at least one uppercase letter, one lowercase letter, one number and one special character"
                .to_string(),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// A malformed stored hash counts as a mismatch
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_rules() {
        assert!(check_password_strength("Passw0rd!").is_ok());
        assert!(check_password_strength("Pa0!").is_err());
        assert!(check_password_strength("password1!").is_err());
        assert!(check_password_strength("PASSWORD1!").is_err());
        assert!(check_password_strength("Password!!").is_err());
        assert!(check_password_strength("Password12").is_err());
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("Passw0rd!", 4).unwrap();
        assert!(verify_password("Passw0rd!", &hash));
        assert!(!verify_password("Passw0rd?", &hash));
        assert!(!verify_password("Passw0rd!", "not-a-hash"));
    }
}
