use rand::{distr::Alphanumeric, Rng as _};

pub const CONFIRMATION_CODE_LENGTH: usize = 32;

/// Fresh single-use confirmation code, sent to the user instead of a password.
pub fn generate_confirmation_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code() {
        let code = generate_confirmation_code();
        assert_eq!(code.len(), CONFIRMATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(code, generate_confirmation_code());
    }
}
