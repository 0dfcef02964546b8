//! Registers the services of every configured project.
//!
//! For a project `foo` the registrar defines, under the alias `firebase`:
//!
//! | id                                | provides |
//! |-----------------------------------|----------|
//! | `firebase.foo.project_factory`    | [`ProjectFactory`] (always private) |
//! | `firebase.foo.database`           | [`FirebaseDatabase`] |
//! | `firebase.foo.auth`               | [`FirebaseAuth`] |
//! | `firebase.foo.storage`            | [`FirebaseStorage`] |
//! | `firebase.foo.remote_config`      | [`FirebaseRemoteConfig`] |
//! | `firebase.foo.messaging`          | [`FirebaseMessaging`] |
//! | `firebase.foo.firestore`          | [`FirebaseFirestore`] |
//! | `firebase.foo.app_check`          | [`FirebaseAppCheck`] |
//!
//! Each service is also reachable by its argument name (`fooAuth`, `fooRemoteConfig`, ...) and,
//! when `foo` is the default project, by its type alone.
//!
//! ```rust
//! # use firebase_projects::registrar::Registrar;
//! # use firebase_projects::registry::Container;
//! # use firebase_projects::auth::FirebaseAuth;
//! let mut container = Container::new();
//! Registrar::new()
//!     .load(&[serde_json::json!({ "projects": { "foo": {}, "bar": {} } })], &mut container)
//!     .unwrap();
//!
//! assert!(container.has_definition("firebase.foo.auth"));
//! assert!(container.has_definition("firebase.bar.auth"));
//! // Neither project was marked as default.
//! assert!(container.get_default::<FirebaseAuth>().is_err());
//! ```

use crate::app_check::FirebaseAppCheck;
use crate::auth::FirebaseAuth;
use crate::config::{self, ConfigurationError, FirebaseConfig, ProjectConfig};
use crate::database::FirebaseDatabase;
use crate::factory::{ProjectFactory, ProjectFactoryConfig};
use crate::firestore::FirebaseFirestore;
use crate::messaging::FirebaseMessaging;
use crate::registry::{Contract, Definition, Registry};
use crate::remote_config::FirebaseRemoteConfig;
use crate::storage::FirebaseStorage;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};


pub const DEFAULT_ALIAS: &str = "firebase";

/// The services registered for every project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Database,
    Auth,
    Storage,
    RemoteConfig,
    Messaging,
    Firestore,
    AppCheck,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Database,
        Capability::Auth,
        Capability::Storage,
        Capability::RemoteConfig,
        Capability::Messaging,
        Capability::Firestore,
        Capability::AppCheck,
    ];

    /// Last segment of the service id.
    pub fn postfix(self) -> &'static str {
        match self {
            Capability::Database => "database",
            Capability::Auth => "auth",
            Capability::Storage => "storage",
            Capability::RemoteConfig => "remote_config",
            Capability::Messaging => "messaging",
            Capability::Firestore => "firestore",
            Capability::AppCheck => "app_check",
        }
    }

    pub fn contract(self) -> Contract {
        match self {
            Capability::Database => Contract::of::<FirebaseDatabase>(),
            Capability::Auth => Contract::of::<FirebaseAuth>(),
            Capability::Storage => Contract::of::<FirebaseStorage>(),
            Capability::RemoteConfig => Contract::of::<FirebaseRemoteConfig>(),
            Capability::Messaging => Contract::of::<FirebaseMessaging>(),
            Capability::Firestore => Contract::of::<FirebaseFirestore>(),
            Capability::AppCheck => Contract::of::<FirebaseAppCheck>(),
        }
    }

    /// A lazy binding calling the matching `create_*` method of the project factory `factory_id`.
    fn definition(self, factory_id: String, config: ProjectConfig) -> Definition {
        let argument = config.clone();
        let definition = match self {
            Capability::Database => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_database(&config))
            }
            Capability::Auth => Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_auth(&config)),
            Capability::Storage => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_storage(&config))
            }
            Capability::RemoteConfig => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_remote_config(&config))
            }
            Capability::Messaging => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_messaging(&config))
            }
            Capability::Firestore => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_firestore(&config))
            }
            Capability::AppCheck => {
                Definition::lazy(move |r| r.get::<ProjectFactory>(&factory_id)?.create_app_check(&config))
            }
        };
        definition.with_argument(argument)
    }
}

/// Turns the `projects` configuration into registry bindings.
#[derive(Debug, Clone)]
pub struct Registrar {
    alias: String,
}

impl Default for Registrar {
    fn default() -> Self {
        Self {
            alias: DEFAULT_ALIAS.to_string(),
        }
    }
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `alias` as the first segment of every service id.
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self { alias: alias.into() }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn service_id(&self, project: &str, capability: Capability) -> String {
        format!("{}.{}.{}", self.alias, project, capability.postfix())
    }

    pub fn project_factory_id(&self, project: &str) -> String {
        format!("{}.{}.project_factory", self.alias, project)
    }

    /// Validates `configs` and registers every project.
    ///
    /// Nothing is registered when the configuration is invalid. A lone project without an
    /// explicit `default` becomes the default project.
    pub fn load<R: Registry + ?Sized>(&self, configs: &[Value], registry: &mut R) -> Result<FirebaseConfig, ConfigurationError> {
        let config = config::process(configs)?;
        assert_single_default(&config.projects)?;

        let single = config.projects.len() == 1;
        for (name, project) in &config.projects {
            if single && project.default.is_none() {
                let project = ProjectConfig {
                    default: Some(true),
                    ..project.clone()
                };
                self.register_project(name, &project, registry);
            } else {
                self.register_project(name, project, registry);
            }
        }

        debug!(projects = config.projects.len(), alias = %self.alias, "firebase configuration loaded");
        Ok(config)
    }

    /// Registers the project factory and the services of one project.
    pub fn register_project<R: Registry + ?Sized>(&self, name: &str, config: &ProjectConfig, registry: &mut R) {
        let factory_id = self.register_project_factory(name, config, registry);

        for capability in Capability::ALL {
            self.register_service(name, capability, config, &factory_id, registry);
        }

        info!(project = name, default = config.is_default(), public = config.public, "firebase project registered");
    }

    fn register_project_factory<R: Registry + ?Sized>(&self, name: &str, config: &ProjectConfig, registry: &mut R) -> String {
        let id = self.project_factory_id(name);
        let factory_config = ProjectFactoryConfig::from_project(config);

        let captured = factory_config.clone();
        let definition = Definition::lazy(move |r| ProjectFactory::from_config(&captured, r))
            .with_argument(factory_config)
            .with_public(false);
        registry.define(&id, definition);

        id
    }

    fn register_service<R: Registry + ?Sized>(
        &self,
        name: &str,
        capability: Capability,
        config: &ProjectConfig,
        factory_id: &str,
        registry: &mut R,
    ) {
        let id = self.service_id(name, capability);
        let definition = capability
            .definition(factory_id.to_string(), config.clone())
            .with_public(config.public);
        registry.define(&id, definition);

        if config.is_default() {
            registry.set_alias(capability.contract(), &id, config.public);
        }

        registry.register_alias_for_argument(&id, capability.contract(), &format!("{}_{}", name, capability.postfix()));
    }
}

/// Fails on the second project marked as default.
pub fn assert_single_default(projects: &BTreeMap<String, ProjectConfig>) -> Result<(), ConfigurationError> {
    let mut count = 0;
    for project in projects.values() {
        if project.is_default() {
            count += 1;
        }
        if count > 1 {
            return Err(ConfigurationError::MultipleDefaults);
        }
    }
    Ok(())
}
