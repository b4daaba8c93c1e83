use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use spendwise_common::models::auth::Claims;

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Create an access token (HS256 JWT) valid for `ttl_secs`
pub fn create_access_token(
    user_id: &str,
    email: &str,
    jwt_secret: &str,
    ttl_secs: i64,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .context("Failed to create access token")
}

/// Validate an access token and return claims
pub fn validate_access_token(token: &str, jwt_secret: &str) -> Result<Claims> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .context("Invalid access token")?;
    Ok(token_data.claims)
}

/// Generate a refresh token: returns (raw_token, token_hash)
pub fn generate_refresh_token() -> (String, String) {
    let raw = uuid::Uuid::new_v4().to_string();
    let hash = hash_refresh_token(&raw);
    (raw, hash)
}

/// Hash a refresh token using SHA256
pub fn hash_refresh_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Lowercased, trimmed form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify_correct() {
        let password = "my-secure-password";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_password_verify_wrong() {
        let hash = hash_password("correct-password").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_password_different_salts() {
        let hash1 = hash_password("same-password").unwrap();
        let hash2 = hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_against_garbage_hash_errors() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_jwt_create_and_validate() {
        let secret = "test-jwt-secret";
        let token = create_access_token("user-123", "test@example.com", secret, 3600).unwrap();
        let claims = validate_access_token(&token, secret).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_jwt_wrong_secret_fails() {
        let token = create_access_token("user-123", "test@example.com", "secret-1", 3600).unwrap();
        assert!(validate_access_token(&token, "secret-2").is_err());
    }

    #[test]
    fn test_jwt_expired_fails() {
        // Well past the default 60s leeway
        let token = create_access_token("user-123", "test@example.com", "s", -600).unwrap();
        assert!(validate_access_token(&token, "s").is_err());
    }

    #[test]
    fn test_refresh_token_uniqueness() {
        let (raw1, hash1) = generate_refresh_token();
        let (raw2, hash2) = generate_refresh_token();
        assert_ne!(raw1, raw2);
        assert_ne!(hash1, hash2);
        assert_eq!(hash_refresh_token(&raw1), hash1);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.lk"));
        assert!(!is_valid_email("ann"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("ann@.com"));
        assert!(!is_valid_email("an n@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }
}
