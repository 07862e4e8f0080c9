//! Admin authentication
//!
//! A single admin identified by three configured values (email, password,
//! keyword). A successful login issues an opaque bearer token that stays
//! valid until logout or process restart.

use std::collections::HashSet;
use std::sync::RwLock;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::{AdminUser, LoginRequest, LoginResponse};

/// Error types for authentication
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Admin credentials are not configured
    #[error("Admin login is not configured")]
    NotConfigured,

    /// Missing or unknown session token
    #[error("Invalid or expired session")]
    InvalidToken,
}

/// Admin credential check and session tokens
pub struct AdminAuth {
    config: AuthConfig,
    tokens: RwLock<HashSet<String>>,
}

impl AdminAuth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            tokens: RwLock::new(HashSet::new()),
        }
    }

    /// True when all three admin credentials are configured
    pub fn is_configured(&self) -> bool {
        non_empty(&self.config.admin_email).is_some()
            && non_empty(&self.config.admin_password).is_some()
            && non_empty(&self.config.admin_keyword).is_some()
    }

    /// Check the three factors and issue a token
    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse, AuthError> {
        let (Some(email), Some(password), Some(keyword)) = (
            non_empty(&self.config.admin_email),
            non_empty(&self.config.admin_password),
            non_empty(&self.config.admin_keyword),
        ) else {
            tracing::warn!("Login attempt while admin credentials are not configured");
            return Err(AuthError::NotConfigured);
        };

        let matches = request.email.trim() == email
            && request.password == password
            && request.keyword == keyword;
        if !matches {
            tracing::warn!("Failed admin login for '{}'", request.email.trim());
            return Err(AuthError::InvalidCredentials);
        }

        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.clone());

        tracing::info!("Admin logged in");
        Ok(LoginResponse {
            user: AdminUser {
                email: email.to_string(),
                authenticated: true,
            },
            token,
        })
    }

    /// Resolve a bearer token to the admin user
    pub fn validate(&self, token: &str) -> Result<AdminUser, AuthError> {
        let known = self
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token);
        if !known {
            return Err(AuthError::InvalidToken);
        }
        Ok(AdminUser {
            email: self.config.admin_email.clone().unwrap_or_default(),
            authenticated: true,
        })
    }

    /// Invalidate a token; returns whether it was active
    pub fn logout(&self, token: &str) -> bool {
        let removed = self
            .tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token);
        if removed {
            tracing::info!("Admin logged out");
        }
        removed
    }

    /// Number of active sessions
    pub fn session_count(&self) -> usize {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AdminAuth {
        AdminAuth::new(AuthConfig {
            admin_email: Some("admin@example.org".to_string()),
            admin_password: Some("s3cret".to_string()),
            admin_keyword: Some("info2024".to_string()),
        })
    }

    fn request(email: &str, password: &str, keyword: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            keyword: keyword.to_string(),
        }
    }

    #[test]
    fn test_login_success() {
        let auth = configured();
        let response = auth
            .login(&request("admin@example.org", "s3cret", "info2024"))
            .unwrap();

        assert!(response.user.authenticated);
        assert_eq!(response.user.email, "admin@example.org");
        assert_eq!(response.token.len(), 32);
        assert_eq!(auth.validate(&response.token).unwrap(), response.user);
    }

    #[test]
    fn test_login_trims_email_only() {
        let auth = configured();
        assert!(auth
            .login(&request(" admin@example.org ", "s3cret", "info2024"))
            .is_ok());
        assert!(auth
            .login(&request("admin@example.org", " s3cret", "info2024"))
            .is_err());
    }

    #[test]
    fn test_login_requires_every_factor() {
        let auth = configured();
        for (email, password, keyword) in [
            ("other@example.org", "s3cret", "info2024"),
            ("Admin@Example.org", "s3cret", "info2024"),
            ("admin@example.org", "wrong", "info2024"),
            ("admin@example.org", "s3cret", "wrong"),
            ("admin@example.org", "S3CRET", "info2024"),
            ("", "", ""),
        ] {
            assert_eq!(
                auth.login(&request(email, password, keyword)).unwrap_err(),
                AuthError::InvalidCredentials
            );
        }
        assert_eq!(auth.session_count(), 0);
    }

    #[test]
    fn test_login_refused_when_not_configured() {
        let auth = AdminAuth::new(AuthConfig::default());
        assert!(!auth.is_configured());
        assert_eq!(
            auth.login(&request("", "", "")).unwrap_err(),
            AuthError::NotConfigured
        );

        let partial = AdminAuth::new(AuthConfig {
            admin_email: Some("a@b.c".to_string()),
            admin_password: Some("p".to_string()),
            admin_keyword: Some(String::new()),
        });
        assert_eq!(
            partial.login(&request("a@b.c", "p", "")).unwrap_err(),
            AuthError::NotConfigured
        );
    }

    #[test]
    fn test_logout_invalidates_token() {
        let auth = configured();
        let token = auth
            .login(&request("admin@example.org", "s3cret", "info2024"))
            .unwrap()
            .token;

        assert!(auth.logout(&token));
        assert!(!auth.logout(&token));
        assert_eq!(auth.validate(&token).unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_tokens_are_unique_per_login() {
        let auth = configured();
        let creds = request("admin@example.org", "s3cret", "info2024");
        let a = auth.login(&creds).unwrap().token;
        let b = auth.login(&creds).unwrap().token;

        assert_ne!(a, b);
        assert_eq!(auth.session_count(), 2);
        assert!(auth.validate("unknown").is_err());
    }
}
