use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};

use crate::claims::{Claims, TokenValidationError, validate_claims};

/// Verifies a bearer token and yields its typed claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenValidationError>;
}

/// Shared-secret HS256 verification.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenValidationError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenValidationError::BadSignature,
            _ => TokenValidationError::Malformed(e.to_string()),
        })?;

        validate_claims(&data.claims, now)?;
        tracing::debug!(user_id = %data.claims.sub, "token accepted");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilio_core::UserId;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn mint(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trips_valid_token() {
        let now = Utc::now();
        let claims = Claims::new(UserId::new(), Some("a@b.co".into()), now, now + Duration::hours(1));
        let token = mint("s3cret", &claims);

        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert_eq!(validator.validate(&token, now).unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret() {
        let now = Utc::now();
        let claims = Claims::new(UserId::new(), None, now, now + Duration::hours(1));
        let token = mint("other", &claims);

        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        assert_eq!(
            validator.validate(&token, now),
            Err(TokenValidationError::BadSignature)
        );
    }

    #[test]
    fn rejects_expired_token_and_garbage() {
        let now = Utc::now();
        let claims = Claims::new(UserId::new(), None, now - Duration::hours(2), now - Duration::hours(1));
        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());

        assert_eq!(
            validator.validate(&mint("s3cret", &claims), now),
            Err(TokenValidationError::Expired)
        );
        assert!(matches!(
            validator.validate("not-a-jwt", now),
            Err(TokenValidationError::Malformed(_))
        ));
    }
}
