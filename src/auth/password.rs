/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password strength validation.

use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Compared against when a login names an unknown email
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// bcrypt wrapper with a fixed work factor
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: String,
}

impl PasswordHasher {
    /// Create a hasher using the given bcrypt cost
    ///
    /// # Errors
    /// Returns error if bcrypt rejects the cost
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let decoy_hash = hash(DECOY_PASSWORD, cost)
            .map_err(|e| AppError::Internal(format!("Password hasher setup failed: {}", e)))?;

        Ok(Self { cost, decoy_hash })
    }

    /// Hash a password; the salt is generated per call and embedded in the result
    ///
    /// # Errors
    /// Returns error if bcrypt hashing fails
    pub fn encode(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    ///
    /// A malformed stored hash counts as a mismatch.
    pub fn matches(&self, password: &str, hash: &str) -> bool {
        verify(password, hash).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        })
    }

    /// Spend the same bcrypt work as a real comparison
    pub fn burn_decoy(&self, password: &str) {
        let _ = self.matches(password, &self.decoy_hash);
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }

    // bcrypt only reads the first 72 bytes; the cap also bounds hashing cost
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::WeakPassword);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(TEST_COST).expect("Failed to build hasher")
    }

    #[test]
    fn test_encode_password() {
        let password = "ValidPassword123";
        let hash = hasher().encode(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_encode_is_salted() {
        let hasher = hasher();
        let first = hasher.encode("ValidPassword123").unwrap();
        let second = hasher.encode("ValidPassword123").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_matches_password() {
        let hasher = hasher();
        let hash = hasher.encode("ValidPassword123").unwrap();

        assert!(hasher.matches("ValidPassword123", &hash));
        assert!(!hasher.matches("WrongPassword123", &hash));
    }

    #[test]
    fn test_malformed_hash_is_a_mismatch() {
        assert!(!hasher().matches("ValidPassword123", "not-a-bcrypt-hash"));
        assert!(!hasher().matches("ValidPassword123", ""));
    }

    #[test]
    fn test_decoy_hash_is_a_real_hash() {
        let hasher = hasher();
        assert!(hasher.matches(DECOY_PASSWORD, &hasher.decoy_hash));
        hasher.burn_decoy("ValidPassword123");
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        assert!(PasswordHasher::new(1).is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password_strength("ValidPassword123").is_ok());
        assert!(matches!(
            validate_password_strength(""),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(matches!(
            validate_password_strength("Short1"),
            Err(ValidationError::TooShort(_, _))
        ));
        assert!(matches!(
            validate_password_strength(&("a".repeat(MAX_PASSWORD_LENGTH) + "A1")),
            Err(ValidationError::TooLong(_, _))
        ));
        assert!(matches!(
            validate_password_strength("NoDigitsPassword"),
            Err(ValidationError::WeakPassword)
        ));
        assert!(validate_password_strength("NOLOWERCASE1").is_err());
        assert!(validate_password_strength("nouppercase1").is_err());
    }
}
