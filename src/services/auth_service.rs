//! Authentication service
//!
//! Password hashing, bearer token issuance and verification, and session
//! creation. Tokens embed the account id, name, and role; the signing secret
//! is loaded once at startup and immutable afterwards.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AuthConfig;
use crate::db::repositories::AccountRepository;
use crate::error::{AppError, AppResult};
use crate::models::{Account, Role};

/// Claims embedded in a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Account name
    pub name: String,
    /// Account role
    pub role: String,
    /// Expiry as a unix timestamp
    pub exp: usize,
}

/// Identity extracted from a verified token
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub account_id: i64,
    pub account_name: String,
    pub role: Role,
}

/// Authentication service
pub struct AuthService {
    jwt_secret: String,
    token_expiry_hours: i64,
}

impl AuthService {
    /// Create the service from configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            token_expiry_hours: config.token_expiry_hours,
        }
    }

    /// Hash a password for storage
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash is malformed: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Issue a signed bearer token for an account
    pub fn issue_token(&self, account: &Account) -> AppResult<String> {
        let expiry = chrono::Utc::now() + chrono::Duration::hours(self.token_expiry_hours);

        let claims = Claims {
            sub: account.id.to_string(),
            name: account.name.clone(),
            role: account.role().as_str().to_string(),
            exp: expiry.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify a bearer token and extract the embedded identity
    pub fn verify_token(&self, token: &str) -> AppResult<TokenIdentity> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        let account_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::InvalidToken)?;

        let role = Role::from_str(&data.claims.role).ok_or(AppError::InvalidToken)?;

        Ok(TokenIdentity {
            account_id,
            account_name: data.claims.name,
            role,
        })
    }

    /// Create a session: verify the password of the named account and issue
    /// a token for it.
    pub async fn create_session(
        &self,
        pool: &PgPool,
        name: &str,
        password: &str,
    ) -> AppResult<(String, Account)> {
        let account = AccountRepository::find_by_name(pool, name)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = AccountRepository::get_password_hash(pool, account.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(password, &hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_token(&account)?;
        Ok((token, account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_expiry_hours: 1,
        })
    }

    fn worker_account() -> Account {
        Account {
            id: 7,
            name: "worker".to_string(),
            role: Role::Worker.as_i16(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let auth = service();
        let hash = auth.hash_password("secret-password").unwrap();

        assert!(auth.verify_password("secret-password", &hash).unwrap());
        assert!(!auth.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let auth = service();
        let token = auth.issue_token(&worker_account()).unwrap();

        let identity = auth.verify_token(&token).unwrap();
        assert_eq!(identity.account_id, 7);
        assert_eq!(identity.account_name, "worker");
        assert_eq!(identity.role, Role::Worker);
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let auth = service();
        let token = auth.issue_token(&worker_account()).unwrap();

        let other = AuthService::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            token_expiry_hours: 1,
        });

        assert!(matches!(
            other.verify_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let auth = service();
        assert!(auth.verify_token("not-a-token").is_err());
    }
}
