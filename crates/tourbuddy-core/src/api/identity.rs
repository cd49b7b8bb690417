//! Firebase Authentication client (email + password).

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::SessionData;

/// Base URL for Firebase Auth REST endpoints
const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Firebase ID tokens live for an hour unless the response says otherwise.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    EmailExists,

    #[error("Password is too weak: {0}")]
    WeakPassword(String),

    #[error("Too many attempts - please wait before retrying")]
    TooManyAttempts,

    #[error("Authentication rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl IdentityError {
    /// Map a Firebase Auth error message such as `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    fn from_message(message: &str) -> Self {
        let (code, detail) = match message.split_once(" : ") {
            Some((code, detail)) => (code.trim(), detail.trim()),
            None => (message.trim(), ""),
        };
        match code {
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL" => {
                IdentityError::InvalidCredentials
            }
            "EMAIL_EXISTS" => IdentityError::EmailExists,
            "WEAK_PASSWORD" => IdentityError::WeakPassword(detail.to_string()),
            c if c.starts_with("TOO_MANY_ATTEMPTS_TRY_LATER") => IdentityError::TooManyAttempts,
            _ => IdentityError::Rejected(message.to_string()),
        }
    }
}

/// Sign-up form as entered by the user.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    /// Local checks made before anything is sent.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.password != self.confirm_password {
            return Err(IdentityError::PasswordMismatch);
        }
        check_credentials(&self.email, &self.password)
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), IdentityError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(IdentityError::MissingCredentials);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

impl AuthResponse {
    fn into_session(self, email: &str) -> SessionData {
        let expires_in_secs = self
            .expires_in
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        SessionData {
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            user_id: self.local_id,
            email: self.email.unwrap_or_else(|| email.to_string()),
            expires_in_secs,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl IdentityClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: IDENTITY_BASE_URL.to_string(),
        })
    }

    /// Point at a different endpoint, e.g. the Firebase Auth emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionData, IdentityError> {
        check_credentials(email, password)?;
        let session = self.call("accounts:signInWithPassword", email, password).await?;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SessionData, IdentityError> {
        form.validate()?;
        let session = self.call("accounts:signUp", &form.email, &form.password).await?;
        info!(user_id = %session.user_id, "Account created");
        Ok(session)
    }

    async fn call(&self, endpoint: &str, email: &str, password: &str) -> Result<SessionData, IdentityError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(endpoint, %status, "Auth response received");

        if !status.is_success() {
            return Err(parse_error(&text));
        }
        let auth: AuthResponse = serde_json::from_str(&text)
            .map_err(|e| IdentityError::Rejected(format!("Unexpected auth response: {}", e)))?;
        Ok(auth.into_session(email))
    }
}

fn parse_error(body: &str) -> IdentityError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => IdentityError::from_message(&envelope.error.message),
        Err(_) => IdentityError::Rejected(body.chars().take(200).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_rejects_mismatched_passwords() {
        let form = SignUpForm {
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret2".into(),
        };
        assert!(matches!(form.validate(), Err(IdentityError::PasswordMismatch)));
    }

    #[test]
    fn test_sign_up_requires_email() {
        let form = SignUpForm {
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            ..Default::default()
        };
        assert!(matches!(form.validate(), Err(IdentityError::MissingCredentials)));
    }

    #[test]
    fn test_parse_firebase_errors() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_LOGIN_CREDENTIALS", "errors": []}}"#;
        assert!(matches!(parse_error(body), IdentityError::InvalidCredentials));

        let body = r#"{"error": {"code": 400, "message": "WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
        match parse_error(body) {
            IdentityError::WeakPassword(detail) => assert_eq!(detail, "Password should be at least 6 characters"),
            other => panic!("unexpected: {other:?}"),
        }

        let body = r#"{"error": {"code": 400, "message": "TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"}}"#;
        assert!(matches!(parse_error(body), IdentityError::TooManyAttempts));

        assert!(matches!(parse_error("<html>bad gateway</html>"), IdentityError::Rejected(_)));
    }

    #[test]
    fn test_auth_response_into_session() {
        let json = r#"{
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "Xy12",
            "email": "asha@example.com",
            "idToken": "id.token.value",
            "registered": true,
            "refreshToken": "refresh-value",
            "expiresIn": "3600"
        }"#;
        let auth: AuthResponse = serde_json::from_str(json).unwrap();
        let session = auth.into_session("ignored@example.com");
        assert_eq!(session.user_id, "Xy12");
        assert_eq!(session.email, "asha@example.com");
        assert_eq!(session.expires_in_secs, 3600);
        assert!(!session.is_expired());
    }
}
