use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use tracing::debug;
use yamdb_types::claim::TimeLimited;

use crate::error::{Error, Result};

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// Issues and validates HS256 signed access tokens.
pub struct TokenManager {
    keys: Keys,
    default_validity: std::time::Duration,
    header: Header,
    validation: Validation,
}

impl TokenManager {
    pub fn new(secret: impl AsRef<[u8]>, default_validity: std::time::Duration) -> Self {
        let validation = Validation::default();
        let header = Header::default();
        Self {
            keys: Keys::new(secret),
            default_validity,
            header,
            validation,
        }
    }

    pub fn issue(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let now = std::time::SystemTime::now();
        let validity = now + self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    #[cfg(test)]
    pub fn issue_expired(&self, mut claims: impl serde::Serialize + TimeLimited) -> Result<String> {
        let now = std::time::SystemTime::now();
        let validity = now - self.default_validity;
        claims.set_validity(validity);
        let token = encode(&self.header, &claims, &self.keys.encoding)?;
        Ok(token)
    }

    /// Checks signature and expiry, jsonwebtoken's leeway is not applied to expiry.
    pub fn validate<T>(&self, token: &str) -> Result<T>
    where
        T: DeserializeOwned + TimeLimited,
    {
        let data = decode::<T>(token, &self.keys.decoding, &self.validation)?;
        if !data.claims.check_validity() {
            debug!("Token within leeway but already expired");
            return Err(Error::ExpiredToken);
        }
        Ok(data.claims)
    }

    pub fn default_validity(&self) -> std::time::Duration {
        self.default_validity
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;
    use yamdb_types::claim::ApiClaim;

    use super::*;

    #[test]
    fn test_token() {
        let claim = ApiClaim::new_expired(123);
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue(claim).unwrap();
        let res = manager.validate::<ApiClaim>(&token);
        assert!(res.is_ok());
        let claim = res.unwrap();
        assert_eq!(claim.sub, "123");
        assert_eq!(claim.user_id().unwrap(), 123);
        assert!(claim.check_validity());
    }

    #[test]
    fn test_token_expiration() {
        let claim = ApiClaim::new_expired(123);
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let token = manager.issue_expired(claim).unwrap();
        let err = manager.validate::<ApiClaim>(&token).unwrap_err();
        assert!(err.is_expired(), "Unexpected error: {err}");
    }

    #[test]
    #[traced_test]
    fn test_token_in_leeway_is_expired() {
        let claim = ApiClaim::new_expired(123);
        // expired 10 secs ago, which is still within default jwt leeway
        let manager = TokenManager::new("secret", std::time::Duration::from_secs(10));
        let token = manager.issue_expired(claim).unwrap();
        let err = manager.validate::<ApiClaim>(&token).unwrap_err();
        assert!(matches!(err, Error::ExpiredToken));
        assert!(logs_contain("already expired"));
    }

    #[test]
    fn test_foreign_signature() {
        let claim = ApiClaim::new_expired(123);
        let issuer = TokenManager::new("secret", std::time::Duration::from_secs(3600));
        let validator = TokenManager::new("other secret", std::time::Duration::from_secs(3600));
        let token = issuer.issue(claim).unwrap();
        let err = validator.validate::<ApiClaim>(&token).unwrap_err();
        assert!(matches!(err, Error::JwtError(_)));
        assert!(!err.is_expired());
    }
}
