//! Authentication state for the signed-in user.
//!
//! This module provides:
//! - `Session`: the Firebase ID token and user id, persisted to disk
//! - `CredentialStore`: OS keychain storage for silent re-login
//! - `AuthProvider`: who is signed in right now
//!
//! Record managers never look up the current user themselves; callers ask
//! an `AuthProvider` and pass the owner id into each operation.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};

pub trait AuthProvider {
    /// The signed-in user's id, or None when nobody is signed in.
    fn current_user(&self) -> Option<String>;
}
