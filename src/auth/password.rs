use bcrypt::{hash, verify, BcryptError};

pub const HASH_COST: u32 = 12;

pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    // The bcrypt hash string embeds the salt and cost parameters.
    hash(password, HASH_COST)
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, BcryptError> {
    // bcrypt recomputes the full hash before comparing, so the check is
    // constant-time with respect to the stored value.
    verify(password, hashed_password)
}
