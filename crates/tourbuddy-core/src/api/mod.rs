//! HTTP clients for the hosted services Tour Buddy talks to.
//!
//! - `FirestoreClient`: the document database holding every record
//! - `IdentityClient`: Firebase Authentication (email + password)
//! - `SearchClient`: destination ideas from SerpAPI
//!
//! Firestore requests authenticate with the signed-in user's ID token,
//! obtained from `IdentityClient` and kept in the `auth::Session`.

pub mod firestore;
pub mod identity;
pub mod search;

pub use firestore::FirestoreClient;
pub use identity::{IdentityClient, IdentityError, SignUpForm};
pub use search::{Destination, DestinationKind, SearchClient};
