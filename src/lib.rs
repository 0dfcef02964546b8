//! Multi-project Firebase configuration and service registration.
//!
//! A [`Registrar`] reads the `projects` configuration and registers, for every named project, a
//! private [`ProjectFactory`] and one lazily-built client per Firebase capability. At most one
//! project is the default, whose clients can also be fetched by type alone.
//!
//! ```rust
//! use firebase_projects::{Container, Registrar};
//!
//! let mut container = Container::new();
//! Registrar::new()
//!     .load(
//!         &[serde_json::json!({
//!             "projects": {
//!                 "app": { "credentials": "/path/to/credentials.json", "default": true },
//!                 "analytics": { "credentials": "/path/to/other.json", "public": false },
//!             }
//!         })],
//!         &mut container,
//!     )
//!     .unwrap();
//!
//! assert!(container.has("firebase.app.auth"));
//! assert!(!container.has("firebase.analytics.auth"));
//! ```

pub mod app_check;
pub mod auth;
pub mod cache;
pub mod config;
pub mod core;
pub mod database;
pub mod factory;
pub mod firestore;
pub mod http;
pub mod messaging;
pub mod registrar;
pub mod registry;
pub mod remote_config;
pub mod storage;

#[cfg(test)]
mod testing;

pub use app_check::FirebaseAppCheck;
pub use auth::FirebaseAuth;
pub use cache::{Cache, CacheItemPool, SimpleCache};
pub use config::{ConfigurationError, Credentials, FirebaseConfig, ProjectConfig};
pub use core::ConstructionError;
pub use database::FirebaseDatabase;
pub use factory::{ProjectFactory, ProjectFactoryConfig};
pub use firestore::FirebaseFirestore;
pub use http::HttpClientOptions;
pub use messaging::FirebaseMessaging;
pub use registrar::{Capability, Registrar};
pub use registry::{Container, Registry, ResolveError};
pub use remote_config::FirebaseRemoteConfig;
pub use storage::FirebaseStorage;
