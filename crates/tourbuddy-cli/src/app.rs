use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use tourbuddy_core::api::{FirestoreClient, IdentityClient, SignUpForm};
use tourbuddy_core::auth::{AuthProvider, CredentialStore, Session, SessionData};
use tourbuddy_core::cache::CacheManager;
use tourbuddy_core::config::Config;
use tourbuddy_core::notify::ReminderQueue;
use tourbuddy_core::RemoteStore;

/// Environment variable holding a password for non-interactive sign-in
const PASSWORD_ENV: &str = "TOURBUDDY_PASSWORD";

pub struct App {
    pub config: Config,
    session: Session,
    credentials: CredentialStore,
    cache_dir: PathBuf,
}

impl App {
    pub fn new(config: Config) -> Self {
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let mut session = Session::new(cache_dir.clone());
        match session.load() {
            Ok(found) => debug!(found, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to load session"),
        }

        Self {
            config,
            session,
            credentials: CredentialStore::default(),
            cache_dir,
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    fn identity(&self) -> Result<IdentityClient> {
        Ok(IdentityClient::new(self.config.api_key()?)?)
    }

    pub async fn login_interactive(&mut self) -> Result<()> {
        println!("\n=== Tour Buddy Login ===\n");

        let email = match self.config.last_email.clone() {
            Some(last) => {
                let input = prompt(&format!("Email [{}]: ", last))?;
                if input.is_empty() { last } else { input }
            }
            None => prompt("Email: ")?,
        };

        let password = match env_password() {
            Some(password) => password,
            None => {
                let stored = self.credentials.recall(&email).unwrap_or_else(|e| {
                    debug!(error = %e, "Keychain unavailable");
                    None
                });
                match stored {
                    Some(stored) if prompt("Use stored password? [Y/n]: ")?.to_lowercase() != "n" => stored,
                    _ => rpassword::prompt_password("Password: ")?,
                }
            }
        };

        println!("\nSigning in...");
        let data = self.identity()?.sign_in(&email, &password).await?;
        self.finish_sign_in(data, &password);
        println!("Welcome back, {}!\n", email);
        Ok(())
    }

    pub async fn signup_interactive(&mut self) -> Result<()> {
        println!("\n=== Create a Tour Buddy account ===\n");

        let form = SignUpForm {
            full_name: prompt("Full name: ")?,
            email: prompt("Email: ")?,
            password: rpassword::prompt_password("Password: ")?,
            confirm_password: rpassword::prompt_password("Confirm password: ")?,
        };

        let data = self.identity()?.sign_up(&form).await?;
        self.finish_sign_in(data, &form.password);
        println!("Account created. You are signed in as {}.\n", form.email);
        Ok(())
    }

    /// Persist a fresh session. Storage failures are logged; the sign-in
    /// itself already succeeded.
    fn finish_sign_in(&mut self, data: SessionData, password: &str) {
        if let Err(e) = self.credentials.remember(&data.email, password) {
            warn!(error = %e, "Failed to store credentials");
        }

        self.config.last_email = Some(data.email.clone());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.session.update(data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }
        info!("Login successful");
    }

    pub fn logout(&mut self) -> Result<()> {
        let email = self
            .session
            .email()
            .map(str::to_string)
            .or_else(|| self.config.last_email.clone());
        if let Some(email) = email {
            self.credentials.forget(&email)?;
        }
        self.session.clear()?;
        println!("Signed out.");
        Ok(())
    }

    /// Make sure a usable session exists, renewing it silently from the
    /// keychain when the token has expired or is about to.
    pub async fn ensure_signed_in(&mut self) -> Result<()> {
        let fresh = self.session.data.as_ref().is_some_and(|d| !d.needs_refresh());
        if fresh {
            return Ok(());
        }

        let email = self
            .session
            .email()
            .map(str::to_string)
            .or_else(|| self.config.last_email.clone())
            .ok_or_else(|| anyhow!("Not signed in. Run `tourbuddy login` first."))?;
        let password = match env_password() {
            Some(password) => password,
            None => self
                .credentials
                .recall(&email)?
                .ok_or_else(|| anyhow!("Session expired. Run `tourbuddy login` again."))?,
        };

        debug!(email = %email, "Renewing session");
        let data = self
            .identity()?
            .sign_in(&email, &password)
            .await
            .context("Session renewal failed. Run `tourbuddy login` again.")?;
        self.session.update(data);
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }
        Ok(())
    }

    /// The signed-in user's id.
    pub fn owner(&self) -> Option<String> {
        self.session.current_user()
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// The record store for the signed-in user.
    pub fn store(&self) -> Result<Arc<dyn RemoteStore>> {
        let token = self
            .session
            .token()
            .ok_or_else(|| anyhow!("Not signed in. Run `tourbuddy login` first."))?;
        let mut client = FirestoreClient::new(self.config.project_id()?)?;
        if let Some(host) = self.config.firestore_emulator_host.as_deref() {
            debug!(host, "Using Firestore emulator");
            client = client.with_base_url(format!("http://{}/v1", host));
        }
        client.set_token(token.to_string());
        Ok(Arc::new(client))
    }

    /// Snapshot storage for the signed-in user.
    pub fn user_cache(&self) -> Result<CacheManager> {
        let Some(user_id) = self.owner() else {
            bail!("Not signed in. Run `tourbuddy login` first.");
        };
        CacheManager::new(self.cache_dir.join(user_id))
    }

    pub fn reminders(&self) -> Result<ReminderQueue> {
        Ok(ReminderQueue::new(self.user_cache()?))
    }

    /// Print reminders that fell due since the last run.
    pub async fn announce_due_reminders(&self) {
        if self.owner().is_none() {
            return;
        }
        let due = match self.reminders() {
            Ok(queue) => queue.take_due(Utc::now()).await,
            Err(e) => Err(e),
        };
        match due {
            Ok(due) => {
                for reminder in due {
                    println!("🔔 {}: {}", reminder.title, reminder.message);
                }
            }
            Err(e) => warn!(error = %e, "Failed to read reminders"),
        }
    }
}

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn env_password() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}
