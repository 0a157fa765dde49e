//! Registration table: which implementations satisfy which contracts.
//!
//! The registry is append-only. Registering a contract twice keeps both
//! entries; single resolution picks the last one, collection resolution
//! returns all of them in registration order.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sanad_support::rendering::suggest_similar;

use crate::constructor::{Activator, Constructor, Erased, Implements, Injectable, Instance};
use crate::error::{ContractMismatchError, Result, SanadError};
use crate::graph::GraphValidator;
use crate::key::{ContractKey, TypeKey};
use crate::lifetime::Lifetime;
use crate::provider::Provider;

/// Turns a type-erased implementation instance into a boxed `Arc<C>`.
type UpcastFn = fn(Instance) -> Option<Erased>;

fn upcast_to<C, I>(instance: Instance) -> Option<Erased>
where
    C: ?Sized + Send + Sync + 'static,
    I: Implements<C>,
{
    let concrete = instance.downcast::<I>().ok()?;
    let contract: std::sync::Arc<C> = <I as Implements<C>>::upcast(concrete);
    Some(Box::new(contract))
}

/// One contract → implementation binding.
#[derive(Clone)]
pub struct Registration {
    contract: TypeKey,
    lifetime: Lifetime,
    pub(crate) activator: Activator,
    upcast: UpcastFn,
}

impl Registration {
    /// The contract this registration satisfies.
    pub fn contract(&self) -> TypeKey {
        self.contract
    }

    /// The concrete type that gets constructed.
    pub fn implementation(&self) -> TypeKey {
        self.activator.implementation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Parameter lists of every constructor the implementation offers.
    pub fn constructors(&self) -> Vec<Vec<ContractKey>> {
        self.activator
            .constructors
            .iter()
            .map(|c| c.parameters.clone())
            .collect()
    }

    /// Views a built implementation instance as this registration's contract.
    pub(crate) fn upcast(&self, instance: Instance) -> Result<Erased> {
        (self.upcast)(instance).ok_or_else(|| {
            SanadError::ContractMismatch(ContractMismatchError {
                contract: self.contract,
                implementation: self.implementation(),
            })
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("contract", &self.contract)
            .field("implementation", &self.activator.implementation)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Serializable summary of a registration, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInfo {
    pub contract: String,
    pub implementation: String,
    pub lifetime: Lifetime,
    /// One entry per constructor, each listing its parameters.
    pub constructors: Vec<Vec<String>>,
}

/// Stores all registrations in the order they were made.
///
/// Hand it to [`Resolver::new`](crate::resolver::Resolver::new) once
/// populated; the resolver works on its own snapshot.
#[derive(Clone, Default)]
pub struct Registry {
    registrations: Vec<Registration>,
    // contract -> positions in `registrations`, ascending
    index: HashMap<TypeKey, Vec<usize>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers implementation `I` for contract `C`.
    ///
    /// `I` is built through [`Injectable::constructors`]. The
    /// `I: Implements<C>` bound is the contract check; a type that does not
    /// satisfy `C` cannot be registered for it.
    ///
    /// ```rust
    /// use sanad_container::prelude::*;
    ///
    /// trait Clock: Send + Sync {}
    /// struct SystemClock;
    /// impl Clock for SystemClock {}
    /// implements!(SystemClock: dyn Clock);
    ///
    /// impl Injectable for SystemClock {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(|_| Ok(SystemClock))]
    ///     }
    /// }
    ///
    /// let mut registry = Registry::new();
    /// registry.register::<dyn Clock, SystemClock>(Lifetime::Singleton);
    /// assert!(registry.contains(&TypeKey::of::<dyn Clock>()));
    /// ```
    pub fn register<C, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Implements<C>,
    {
        self.register_with::<C, I>(lifetime, I::constructors())
    }

    /// Registers `I` as its own contract.
    pub fn register_self<I: Injectable>(&mut self, lifetime: Lifetime) -> &mut Self {
        self.register::<I, I>(lifetime)
    }

    /// Registers implementation `I` for contract `C` with explicit constructors.
    ///
    /// For types that do not (or cannot) implement [`Injectable`].
    pub fn register_with<C, I>(
        &mut self,
        lifetime: Lifetime,
        constructors: Vec<Constructor<I>>,
    ) -> &mut Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Implements<C>,
    {
        let registration = Registration {
            contract: TypeKey::of::<C>(),
            lifetime,
            activator: Activator::new(constructors),
            upcast: upcast_to::<C, I>,
        };
        self.push(registration);
        self
    }

    /// Lets a [`Provider`] add its registrations.
    pub fn add_provider(&mut self, provider: &dyn Provider) -> &mut Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(self);
        self
    }

    /// All registrations for `contract`, in registration order.
    pub fn lookup(&self, contract: &TypeKey) -> Vec<&Registration> {
        self.positions(contract)
            .iter()
            .map(|&i| &self.registrations[i])
            .collect()
    }

    /// The registration single resolution uses: the last one made.
    pub fn active(&self, contract: &TypeKey) -> Option<&Registration> {
        self.positions(contract)
            .last()
            .map(|&i| &self.registrations[i])
    }

    /// Positions of `contract`'s registrations, ascending.
    pub(crate) fn positions(&self, contract: &TypeKey) -> &[usize] {
        self.index.get(contract).map(Vec::as_slice).unwrap_or_default()
    }

    /// The registration at `position`, as returned by [`Registry::positions`].
    pub(crate) fn at(&self, position: usize) -> &Registration {
        &self.registrations[position]
    }

    pub fn contains(&self, contract: &TypeKey) -> bool {
        self.index.contains_key(contract)
    }

    /// Returns the number of registrations (not distinct contracts).
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Distinct contracts, in order of their first registration.
    pub fn contracts(&self) -> Vec<TypeKey> {
        let mut seen = Vec::with_capacity(self.index.len());
        for registration in &self.registrations {
            if !seen.contains(&registration.contract) {
                seen.push(registration.contract);
            }
        }
        seen
    }

    /// Iterates over every registration in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.registrations.iter()
    }

    /// Summarises every registration in registration order.
    pub fn describe(&self) -> Vec<RegistrationInfo> {
        self.registrations
            .iter()
            .map(|r| RegistrationInfo {
                contract: r.contract.type_name().to_string(),
                implementation: r.implementation().type_name().to_string(),
                lifetime: r.lifetime,
                constructors: r
                    .constructors()
                    .iter()
                    .map(|params| params.iter().map(ToString::to_string).collect())
                    .collect(),
            })
            .collect()
    }

    /// Checks the whole graph without constructing anything.
    ///
    /// # Errors
    /// - [`SanadError::NotRegistered`]: a constructor needs an unregistered contract
    /// - [`SanadError::CircularDependency`]: constructors form a cycle
    /// - [`SanadError::AmbiguousConstructor`] / [`SanadError::MissingConstructor`]
    pub fn validate(&self) -> Result<()> {
        GraphValidator::new(self).validate()
    }

    /// Registered contracts whose names resemble `requested`.
    pub(crate) fn suggestions_for(&self, requested: TypeKey) -> Vec<String> {
        let names: Vec<&str> = self.contracts().iter().map(TypeKey::type_name).collect();
        suggest_similar(requested.type_name(), &names, 3)
    }

    fn push(&mut self, registration: Registration) {
        debug!(
            contract = %registration.contract,
            implementation = %registration.implementation(),
            lifetime = %registration.lifetime,
            "Registered implementation"
        );
        let position = self.registrations.len();
        self.index
            .entry(registration.contract)
            .or_default()
            .push(position);
        self.registrations.push(registration);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registrations", &self.registrations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Sender: Send + Sync {}

    struct Smtp;
    impl Sender for Smtp {}
    crate::implements!(Smtp: dyn Sender);

    struct Sendmail;
    impl Sender for Sendmail {}
    crate::implements!(Sendmail: dyn Sender);

    impl Injectable for Smtp {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|_| Ok(Smtp))]
        }
    }

    impl Injectable for Sendmail {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|_| Ok(Sendmail))]
        }
    }

    #[test]
    fn lookup_keeps_registration_order() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register::<dyn Sender, Sendmail>(Lifetime::PerRequest);

        let found = registry.lookup(&TypeKey::of::<dyn Sender>());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].implementation(), TypeKey::of::<Smtp>());
        assert_eq!(found[1].implementation(), TypeKey::of::<Sendmail>());
        assert_eq!(found[1].lifetime(), Lifetime::PerRequest);
    }

    #[test]
    fn lookup_unknown_is_empty() {
        let registry = Registry::new();
        assert!(registry.lookup(&TypeKey::of::<dyn Sender>()).is_empty());
        assert!(registry.active(&TypeKey::of::<dyn Sender>()).is_none());
    }

    #[test]
    fn last_registration_is_active() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register::<dyn Sender, Sendmail>(Lifetime::Singleton);

        let active = registry.active(&TypeKey::of::<dyn Sender>()).unwrap();
        assert_eq!(active.implementation(), TypeKey::of::<Sendmail>());
    }

    #[test]
    fn self_registration() {
        let mut registry = Registry::new();
        registry.register_self::<Smtp>(Lifetime::PerRequest);

        let active = registry.active(&TypeKey::of::<Smtp>()).unwrap();
        assert_eq!(active.contract(), active.implementation());
    }

    #[test]
    fn contracts_are_distinct_and_ordered() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register_self::<Smtp>(Lifetime::Singleton)
            .register::<dyn Sender, Sendmail>(Lifetime::Singleton);

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.contracts(),
            vec![TypeKey::of::<dyn Sender>(), TypeKey::of::<Smtp>()]
        );
    }

    #[test]
    fn describe_lists_constructor_parameters() {
        let mut registry = Registry::new();
        registry.register_with::<dyn Sender, Smtp>(
            Lifetime::Singleton,
            vec![Constructor::new(|_| Ok(Smtp)).collection::<dyn Sender>()],
        );

        let info = &registry.describe()[0];
        assert!(info.contract.contains("Sender"));
        assert!(info.implementation.ends_with("Smtp"));
        assert_eq!(info.lifetime, Lifetime::Singleton);
        assert_eq!(info.constructors.len(), 1);
        assert!(info.constructors[0][0].starts_with("Collection<"));
    }

    #[test]
    fn upcast_checks_concrete_type() {
        let mut registry = Registry::new();
        registry.register::<dyn Sender, Smtp>(Lifetime::Singleton);
        let registration = registry.active(&TypeKey::of::<dyn Sender>()).unwrap();

        assert!(registration.upcast(std::sync::Arc::new(Smtp)).is_ok());
        assert!(matches!(
            registration.upcast(std::sync::Arc::new(Sendmail)),
            Err(SanadError::ContractMismatch(_))
        ));
    }
}
