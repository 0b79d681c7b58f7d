use std::str::FromStr;

use garde::Validate;
use serde::{Deserialize, Serialize};

/// Username that cannot be registered, as it names the self-profile route.
pub const RESERVED_USERNAME: &str = "me";
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const SLUG_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Validate, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[garde(transparent)]
pub struct ValidEmail(#[garde(email, length(max = 254))] String);

#[cfg(feature = "e2e-tests")]
impl ValidEmail {
    pub fn cheat(email: String) -> Self {
        ValidEmail(email)
    }
}

impl FromStr for ValidEmail {
    type Err = garde::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = ValidEmail(s.to_string());
        email.validate()?;
        Ok(email)
    }
}

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidEmail> for String {
    fn from(value: ValidEmail) -> Self {
        value.0
    }
}

/// Letters, digits and `.@+-_`, at most 150 characters, not `me`.
pub fn valid_username(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || value.chars().count() > USERNAME_MAX_LENGTH {
        return Err(garde::Error::new(format!(
            "username must have 1 to {USERNAME_MAX_LENGTH} characters"
        )));
    }
    if value == RESERVED_USERNAME {
        return Err(garde::Error::new("username `me` is reserved"));
    }
    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(garde::Error::new(
            "username may contain only letters, digits and .@+-_",
        ));
    }
    Ok(())
}

pub fn valid_slug(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || value.len() > SLUG_MAX_LENGTH {
        return Err(garde::Error::new(format!(
            "slug must have 1 to {SLUG_MAX_LENGTH} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(garde::Error::new(
            "slug may contain only latin letters, digits, - and _",
        ));
    }
    Ok(())
}

pub fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

pub fn not_in_future(year: &i32, _ctx: &()) -> garde::Result {
    if *year > current_year() {
        Err(garde::Error::new("year cannot be in the future"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fake::Fake as _;
    use quickcheck::Arbitrary;
    use quickcheck_macros::quickcheck;

    use super::*;

    impl Arbitrary for ValidEmail {
        fn arbitrary(_g: &mut quickcheck::Gen) -> Self {
            let email: String = fake::faker::internet::en::SafeEmail().fake();
            ValidEmail(email)
        }
    }

    #[quickcheck]
    fn test_valid_email_arbitrary(valid_email: ValidEmail) {
        assert!(valid_email.validate().is_ok());
    }

    #[test]
    fn test_valid_email() {
        let email = ValidEmail::from_str("admin@localhost").unwrap();
        assert_eq!(email.as_ref(), "admin@localhost");
    }

    #[test]
    fn test_invalid_email() {
        assert!(ValidEmail::from_str("invalid_email").is_err());
        let email = ValidEmail("admin".to_string());
        assert!(email.validate().is_err());
    }

    #[test]
    fn test_username() {
        assert!(valid_username("valid_username", &()).is_ok());
        assert!(valid_username("jan.novak+test@x-y", &()).is_ok());
        assert!(valid_username("me", &()).is_err());
        assert!(valid_username("", &()).is_err());
        assert!(valid_username("has space", &()).is_err());
        assert!(valid_username("semi;colon", &()).is_err());
        assert!(valid_username(&"x".repeat(151), &()).is_err());
        assert!(valid_username(&"x".repeat(150), &()).is_ok());
    }

    #[test]
    fn test_slug() {
        assert!(valid_slug("sci-fi", &()).is_ok());
        assert!(valid_slug("books_2", &()).is_ok());
        assert!(valid_slug("", &()).is_err());
        assert!(valid_slug("$%^&", &()).is_err());
        assert!(valid_slug("žánr", &()).is_err());
        assert!(valid_slug(&"a".repeat(51), &()).is_err());
    }

    #[test]
    fn test_year() {
        let this_year = current_year();
        assert!(not_in_future(&this_year, &()).is_ok());
        assert!(not_in_future(&1999, &()).is_ok());
        assert!(not_in_future(&(this_year + 1), &()).is_err());
    }
}
