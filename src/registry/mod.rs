//! Composition registry.
//!
//! [`Registry`] is the minimal set of primitives the registrar needs from a dependency container:
//! define a lazy binding, toggle its visibility, alias an abstract type to it and give it an
//! additional argument name. [`Container`] is the implementation shipped with the crate.
//!
//! Every binding of a [`Container`] is constructed at most once, on first resolution, even when
//! several threads resolve it concurrently. A failed construction is reported to the caller and
//! not memoized. A binding that depends on itself, directly or through other bindings, fails
//! with [`ResolveError::CircularReference`].

use crate::core::ConstructionError;
use once_cell::sync::OnceCell;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};


type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ConstructionError> + Send + Sync>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("You have requested a non-existent service \"{0}\".")]
    NotFound(String),
    #[error("The \"{0}\" service or alias is private, it can only be injected.")]
    Private(String),
    #[error("Service \"{id}\" is not a {expected}.")]
    TypeMismatch { id: String, expected: &'static str },
    #[error("Circular reference detected for service \"{id}\", path: \"{path}\".")]
    CircularReference { id: String, path: String },
    #[error("Unable to construct service \"{id}\": {source}")]
    Construction {
        id: String,
        source: Box<ConstructionError>,
    },
}

/// The abstract type a binding is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contract {
    type_id: TypeId,
    name: &'static str,
}

impl Contract {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A reference to another service by id, resolved when the referencing binding is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference(String);

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lazily-constructed binding: the contract it provides, how to build it and whether it can be
/// fetched from the container directly.
#[derive(Clone)]
pub struct Definition {
    contract: Contract,
    factory: Factory,
    arguments: Vec<Instance>,
    public: bool,
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("contract", &self.contract.name)
            .field("arguments", &self.arguments.len())
            .field("public", &self.public)
            .finish()
    }
}

impl Definition {
    /// A public binding built by `factory` on first resolution.
    pub fn lazy<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Resolver<'_>) -> Result<T, ConstructionError> + Send + Sync + 'static,
    {
        Self {
            contract: Contract::of::<T>(),
            factory: Arc::new(move |resolver: &Resolver<'_>| factory(resolver).map(|value| Arc::new(value) as Instance)),
            arguments: Vec::new(),
            public: true,
        }
    }

    /// Records an argument of the factory so that the definition can be inspected.
    pub fn with_argument<A: Any + Send + Sync>(mut self, argument: A) -> Self {
        self.arguments.push(Arc::new(argument));
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn contract(&self) -> Contract {
        self.contract
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    /// The first recorded argument of type `A`.
    pub fn argument<A: Any>(&self) -> Option<&A> {
        self.arguments.iter().find_map(|argument| argument.downcast_ref::<A>())
    }
}

/// Registration primitives used by the [`Registrar`](crate::registrar::Registrar).
pub trait Registry {
    /// Defines (or replaces) the binding `id`.
    fn define(&mut self, id: &str, definition: Definition);

    fn set_public(&mut self, id: &str, public: bool) -> Result<(), ResolveError>;

    /// Makes `contract` resolve to the binding `id`.
    fn set_alias(&mut self, contract: Contract, id: &str, public: bool);

    /// Makes the binding `id` reachable as `contract` under the argument name `name`. The alias
    /// shares the visibility of the binding.
    ///
    /// The name is normalized with [`parse_argument_name`], which is also returned. Registering a
    /// name twice for the same contract keeps the last binding.
    fn register_alias_for_argument(&mut self, id: &str, contract: Contract, name: &str) -> String;
}

/// Camel-cases an argument name: `foo.remote_config` and `fooRemote_config` both become
/// `fooRemoteConfig`.
pub fn parse_argument_name(name: &str) -> String {
    let camel: String = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => camel,
    }
}

#[derive(Debug, Clone)]
struct Alias {
    id: String,
    public: bool,
}

struct Service {
    definition: Definition,
    instance: OnceCell<Instance>,
}

/// An in-process [`Registry`] with lazy, construct-once bindings.
#[derive(Default)]
pub struct Container {
    services: HashMap<String, Service>,
    aliases: HashMap<TypeId, Alias>,
    argument_aliases: HashMap<(TypeId, String), String>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.services.keys().collect();
        ids.sort();
        f.debug_struct("Container")
            .field("services", &ids)
            .field("aliases", &self.aliases.len())
            .field("argument_aliases", &self.argument_aliases.len())
            .finish()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already built, public service such as a cache or HTTP options instance.
    pub fn set<T: Any + Send + Sync>(&mut self, id: &str, service: T) {
        let instance: Instance = Arc::new(service);
        let shared = instance.clone();
        let definition = Definition {
            contract: Contract::of::<T>(),
            factory: Arc::new(move |_: &Resolver<'_>| Ok(shared.clone())),
            arguments: Vec::new(),
            public: true,
        };
        self.services.insert(
            id.to_string(),
            Service {
                definition,
                instance: OnceCell::with_value(instance),
            },
        );
    }

    /// Fetches a public service by id.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, ResolveError> {
        let service = self.service(id)?;
        if !service.definition.public {
            return Err(ResolveError::Private(id.to_string()));
        }
        self.resolver().get(id)
    }

    /// Fetches the service `T` is aliased to.
    pub fn get_default<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        let alias = self
            .aliases
            .get(&TypeId::of::<T>())
            .ok_or_else(|| ResolveError::NotFound(type_name::<T>().to_string()))?;
        if !alias.public {
            return Err(ResolveError::Private(type_name::<T>().to_string()));
        }
        self.resolver().get(&alias.id)
    }

    /// Fetches a service through its argument name, e.g. `fooAuth`.
    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
        let id = self.argument_alias::<T>(name)?;
        if !self.has(id) {
            return Err(ResolveError::Private(format!("{} ${}", type_name::<T>(), name)));
        }
        self.resolver().get(id)
    }

    /// Whether `id` exists and can be fetched directly.
    pub fn has(&self, id: &str) -> bool {
        self.services.get(id).is_some_and(|service| service.definition.public)
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn has_alias(&self, contract: Contract) -> bool {
        self.aliases.contains_key(&contract.type_id)
    }

    pub fn has_argument_alias(&self, contract: Contract, name: &str) -> bool {
        self.argument_aliases
            .contains_key(&(contract.type_id, parse_argument_name(name)))
    }

    /// The id the alias of `contract` points to.
    pub fn alias_target(&self, contract: Contract) -> Option<&str> {
        self.aliases.get(&contract.type_id).map(|alias| alias.id.as_str())
    }

    pub fn definition(&self, id: &str) -> Option<&Definition> {
        self.services.get(id).map(|service| &service.definition)
    }

    /// Whether the binding `id` has been constructed.
    pub fn is_initialized(&self, id: &str) -> bool {
        self.services.get(id).is_some_and(|service| service.instance.get().is_some())
    }

    pub fn service_ids(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Resolution that ignores visibility, as used for injection.
    pub(crate) fn resolver(&self) -> Resolver<'_> {
        Resolver {
            container: self,
            building: None,
        }
    }

    fn service(&self, id: &str) -> Result<&Service, ResolveError> {
        self.services
            .get(id)
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))
    }

    fn argument_alias<T: Any>(&self, name: &str) -> Result<&str, ResolveError> {
        self.argument_aliases
            .get(&(TypeId::of::<T>(), parse_argument_name(name)))
            .map(String::as_str)
            .ok_or_else(|| ResolveError::NotFound(format!("{} ${}", type_name::<T>(), name)))
    }

    fn instantiate(&self, id: &str, resolver: &Resolver<'_>) -> Result<Instance, ResolveError> {
        let service = self.service(id)?;
        if let Some(instance) = service.instance.get() {
            return Ok(instance.clone());
        }

        // Re-entering a cell that is being initialized on this thread never returns.
        if resolver.is_building(id) {
            let mut path = resolver.path();
            path.push(id);
            return Err(ResolveError::CircularReference {
                id: id.to_string(),
                path: path.join(" -> "),
            });
        }

        service
            .instance
            .get_or_try_init(|| {
                debug!(service = id, contract = service.definition.contract.name, "constructing service");
                let nested = Resolver {
                    container: self,
                    building: Some((id, resolver)),
                };
                (service.definition.factory)(&nested)
            })
            .cloned()
            .map_err(|source| ResolveError::Construction {
                id: id.to_string(),
                source: Box::new(source),
            })
    }
}

impl Registry for Container {
    fn define(&mut self, id: &str, definition: Definition) {
        self.services.insert(
            id.to_string(),
            Service {
                definition,
                instance: OnceCell::new(),
            },
        );
    }

    fn set_public(&mut self, id: &str, public: bool) -> Result<(), ResolveError> {
        let service = self
            .services
            .get_mut(id)
            .ok_or_else(|| ResolveError::NotFound(id.to_string()))?;
        service.definition.public = public;
        Ok(())
    }

    fn set_alias(&mut self, contract: Contract, id: &str, public: bool) {
        self.aliases.insert(
            contract.type_id,
            Alias {
                id: id.to_string(),
                public,
            },
        );
    }

    fn register_alias_for_argument(&mut self, id: &str, contract: Contract, name: &str) -> String {
        let name = parse_argument_name(name);
        let previous = self
            .argument_aliases
            .insert((contract.type_id, name.clone()), id.to_string());
        if let Some(previous) = previous.filter(|previous| previous != id) {
            warn!(
                argument = %name,
                contract = contract.name,
                previous = %previous,
                service = id,
                "argument alias replaced"
            );
        }
        name
    }
}

/// Resolves services from inside a factory, regardless of their visibility.
///
/// A resolver handed to a factory remembers which bindings are being constructed above it.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    container: &'a Container,
    building: Option<(&'a str, &'a Resolver<'a>)>,
}

impl<'a> Resolver<'a> {
    fn is_building(&self, id: &str) -> bool {
        let mut current = self.building;
        while let Some((building, parent)) = current {
            if building == id {
                return true;
            }
            current = parent.building;
        }
        false
    }

    /// Ids under construction, outermost first.
    fn path(&self) -> Vec<&'a str> {
        let mut path = Vec::new();
        let mut current = self.building;
        while let Some((building, parent)) = current {
            path.push(building);
            current = parent.building;
        }
        path.reverse();
        path
    }

    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>, ResolveError> {
        let service = self.container.service(id)?;
        if service.definition.contract.type_id != TypeId::of::<T>() {
            return Err(ResolveError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            });
        }
        self.container
            .instantiate(id, self)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                id: id.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// The service `id` without any type expectation.
    pub fn get_any(&self, id: &str) -> Result<Arc<dyn Any + Send + Sync>, ResolveError> {
        self.container.instantiate(id, self)
    }

    pub fn get_default<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        let alias = self
            .container
            .aliases
            .get(&TypeId::of::<T>())
            .ok_or_else(|| ResolveError::NotFound(type_name::<T>().to_string()))?;
        self.get(&alias.id)
    }

    pub fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
        let id = self.container.argument_alias::<T>(name)?;
        self.get(id)
    }
}
