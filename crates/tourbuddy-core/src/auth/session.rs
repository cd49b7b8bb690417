use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AuthProvider;

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// Re-authenticate this long before the ID token actually expires.
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id_token: String,
    pub refresh_token: String,
    /// Firebase user id; owner of every user-scoped record.
    pub user_id: String,
    pub email: String,
    pub expires_in_secs: i64,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in_secs)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the token will expire soon and should be renewed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() > self.expires_at() - Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES)
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

/// The signed-in user's session, persisted between runs.
pub struct Session {
    dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, data: None }
    }

    /// Load the session from disk. Returns whether a usable session was found;
    /// expired sessions are ignored.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            debug!(email = %data.email, "Stored session has expired");
            return Ok(false);
        }
        self.data = Some(data);
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let Some(ref data) = self.data else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(self.session_path(), contents).context("Failed to write session file")?;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// The bearer token, if the session is still valid
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.id_token.as_str())
    }

    pub fn email(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.email.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_expired())
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl AuthProvider for Session {
    fn current_user(&self) -> Option<String> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.user_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDir;

    fn session_data(created_at: DateTime<Utc>) -> SessionData {
        SessionData {
            id_token: "token".into(),
            refresh_token: "refresh".into(),
            user_id: "u-1".into(),
            email: "asha@example.com".into(),
            expires_in_secs: 3600,
            created_at,
        }
    }


    #[test]
    fn test_expiry_and_refresh_window() {
        let fresh = session_data(Utc::now());
        assert!(!fresh.is_expired());
        assert!(!fresh.needs_refresh());

        let nearly = session_data(Utc::now() - Duration::minutes(57));
        assert!(!nearly.is_expired());
        assert!(nearly.needs_refresh());

        let old = session_data(Utc::now() - Duration::minutes(61));
        assert!(old.is_expired());
        assert_eq!(old.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_current_user_requires_valid_session() {
        let dir = TempDir::new("session-current");
        let mut session = Session::new(dir.path().to_path_buf());
        assert_eq!(session.current_user(), None);

        session.update(session_data(Utc::now()));
        assert_eq!(session.current_user().as_deref(), Some("u-1"));

        session.update(session_data(Utc::now() - Duration::hours(2)));
        assert_eq!(session.current_user(), None);
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new("session-roundtrip");
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(session_data(Utc::now()));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.email(), Some("asha@example.com"));

        reloaded.clear().unwrap();
        let mut empty = Session::new(dir.path().to_path_buf());
        assert!(!empty.load().unwrap());
    }
}
