use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::usermodel::{User, UserRole};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Identity snapshot signed into every token. Trusted until expiry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    pub approved: bool,
    pub active: bool,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn for_user(user: &User, typ: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        TokenClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            approved: user.approved,
            active: user.active,
            typ,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }
}

pub fn create_token(
    user: &User,
    typ: TokenType,
    secret: &[u8],
    expires_in: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode_claims(&TokenClaims::for_user(user, typ, expires_in), secret)
}

pub fn encode_claims(
    claims: &TokenClaims,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Verifies signature and expiry. No other state is consulted.
pub fn decode_token<T: AsRef<str>>(
    token: T,
    secret: &[u8],
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<TokenClaims>(
        token.as_ref(),
        &DecodingKey::from_secret(secret),
        &validation,
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn user(role: UserRole, approved: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "jane".to_string(),
            email: Some("jane@example.com".to_string()),
            full_name: "Jane Doe".to_string(),
            password: String::new(),
            role,
            approved,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn claims_survive_a_round_trip() {
        let user = user(UserRole::Professional, false);
        let token = create_token(&user, TokenType::Access, SECRET, Duration::minutes(5)).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, UserRole::Professional);
        assert!(!claims.approved);
        assert!(claims.active);
        assert_eq!(claims.typ, TokenType::Access);
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let user = user(UserRole::Customer, true);
        let expired = create_token(&user, TokenType::Access, SECRET, Duration::minutes(-5)).unwrap();
        assert!(decode_token(&expired, SECRET).is_err());

        let token = create_token(&user, TokenType::Access, b"other", Duration::minutes(5)).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
        assert!(decode_token("not.a.token", SECRET).is_err());
    }
}
