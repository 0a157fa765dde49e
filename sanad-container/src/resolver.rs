//! # The Resolver, heart of Sanad
//!
//! Turns a contract request into a fully constructed object graph.
//!
//! # Architecture
//! ```text
//! Registry  ──Resolver::new()──>  Resolver (snapshot + singleton cache)
//!                                    │
//!                              resolve::<C>()
//!                                    │
//!                 last registration for C ──> constructor parameters
//!                                    │            │
//!                                    │      resolve / resolve_all (recursive)
//!                                    ▼
//!                               Arc<C>
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use sanad_container::prelude::*;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//! implements!(ConsoleLogger: dyn Logger);
//!
//! impl Injectable for ConsoleLogger {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|_| Ok(ConsoleLogger))]
//!     }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Injectable for UserService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|args| Ok(UserService { logger: args.single()? }))
//!             .param::<dyn Logger>()]
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)
//!     .register_self::<UserService>(Lifetime::PerRequest);
//!
//! let resolver = Resolver::new(&registry);
//! let service: Arc<UserService> = resolver.resolve().expect("Failed to resolve");
//! service.logger.log("ready");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::constructor::{Activator, Arguments, Erased, Instance, Resolved};
use crate::error::{
    CircularDependencyError, ContractMismatchError, NotRegisteredError, Result, SanadError,
};
use crate::key::{ContractKey, TypeKey};
use crate::registry::{Registration, Registry};

type Slot = Arc<OnceCell<Instance>>;

/// Singleton bookkeeping shared by every thread using one resolver.
///
/// Only the thread recorded in `building` writes a slot; other threads
/// record what they wait for in `waiting`. Following `waiting` through
/// `building` finds waits that can never finish.
#[derive(Default)]
struct Singletons {
    // implementation type -> its singleton slot
    slots: HashMap<TypeKey, Slot>,
    building: HashMap<TypeKey, ThreadId>,
    waiting: HashMap<ThreadId, TypeKey>,
}

impl Singletons {
    fn slot(&mut self, implementation: TypeKey) -> Slot {
        Arc::clone(self.slots.entry(implementation).or_default())
    }

    /// The cycle closed if `thread` waited for `wanted`, if any.
    ///
    /// Starts and ends with the implementation `thread` is building.
    fn wait_cycle(&self, thread: ThreadId, wanted: TypeKey) -> Option<Vec<TypeKey>> {
        let mut path = Vec::new();
        let mut current = wanted;

        while path.len() <= self.building.len() {
            let owner = *self.building.get(&current)?;
            path.push(current);
            if owner == thread {
                let mut cycle = Vec::with_capacity(path.len() + 1);
                cycle.push(current);
                cycle.extend(path);
                return Some(cycle);
            }
            current = *self.waiting.get(&owner)?;
        }

        None
    }
}

enum Claimed<'r> {
    Cached(Instance),
    Build(Slot, Claim<'r>),
}

/// Releases a singleton claim, even if the constructor panics.
struct Claim<'r> {
    resolver: &'r Resolver,
    implementation: TypeKey,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.resolver
            .singletons
            .lock()
            .building
            .remove(&self.implementation);
        self.resolver.released.notify_all();
    }
}

/// Builds instances from a snapshot of a [`Registry`].
///
/// The resolver is `Send + Sync`; share it behind an `Arc` to resolve from
/// several threads. Each singleton implementation is constructed at most
/// once, even when first requested concurrently. Threads that would wait on
/// each other's singletons forever get [`SanadError::CircularDependency`]
/// instead.
pub struct Resolver {
    registry: Arc<Registry>,
    singletons: Mutex<Singletons>,
    // signalled whenever a singleton claim is released
    released: Condvar,
}

impl Resolver {
    /// Binds a resolver to a snapshot of `registry`.
    ///
    /// Registrations made on `registry` afterwards are not seen.
    pub fn new(registry: &Registry) -> Self {
        debug!(registrations = registry.len(), "Creating resolver");
        Self {
            registry: Arc::new(registry.clone()),
            singletons: Mutex::new(Singletons::default()),
            released: Condvar::new(),
        }
    }

    /// Like [`Resolver::new`], but validates the dependency graph first.
    ///
    /// # Errors
    /// Whatever [`Registry::validate`] reports.
    pub fn validated(registry: &Registry) -> Result<Self> {
        registry.validate()?;
        Ok(Self::new(registry))
    }

    /// The snapshot this resolver works from.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolves one instance of contract `C` from its last registration.
    ///
    /// ```rust,ignore
    /// let mailer: Arc<dyn Mailer> = resolver.resolve()?;
    /// ```
    pub fn resolve<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>> {
        let contract = TypeKey::of::<C>();
        self.resolve_key(&ContractKey::Single(contract))?
            .into_single::<C>()
            .ok_or_else(|| self.mismatch(contract))
    }

    /// Resolves every registration of contract `C`, in registration order.
    ///
    /// A contract with no registrations yields an empty `Vec`.
    pub fn resolve_all<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<C>>> {
        let contract = TypeKey::of::<C>();
        self.resolve_key(&ContractKey::Collection(contract))?
            .into_collection::<C>()
            .ok_or_else(|| self.mismatch(contract))
    }

    /// Type-erased entry point behind [`resolve`](Self::resolve) and
    /// [`resolve_all`](Self::resolve_all).
    pub fn resolve_key(&self, key: &ContractKey) -> Result<Resolved> {
        let mut chain = Vec::new();
        self.resolve_in(key, &mut chain)
    }

    /// Returns `true` if contract `C` has at least one registration.
    pub fn is_registered<C: ?Sized + 'static>(&self) -> bool {
        self.registry.contains(&TypeKey::of::<C>())
    }

    /// Number of singleton implementations constructed so far.
    pub fn cached_singletons(&self) -> usize {
        self.singletons
            .lock()
            .slots
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    // `chain` holds the implementations under construction on this call stack.
    fn resolve_in(&self, key: &ContractKey, chain: &mut Vec<TypeKey>) -> Result<Resolved> {
        trace!(contract = %key, depth = chain.len(), "Resolving");

        match key {
            ContractKey::Single(contract) => {
                let registration = self.registry.active(contract).ok_or_else(|| {
                    SanadError::NotRegistered(NotRegisteredError {
                        requested: *contract,
                        required_by: chain.last().copied(),
                        suggestions: self.registry.suggestions_for(*contract),
                    })
                })?;
                self.produce(registration, chain).map(Resolved::One)
            }
            ContractKey::Collection(contract) => self
                .registry
                .lookup(contract)
                .into_iter()
                .map(|registration| self.produce(registration, chain))
                .collect::<Result<Vec<_>>>()
                .map(Resolved::Many),
        }
    }

    /// Builds or fetches the instance for one registration, viewed as its contract.
    fn produce(&self, registration: &Registration, chain: &mut Vec<TypeKey>) -> Result<Erased> {
        let instance = if registration.lifetime().is_cached() {
            self.singleton(registration, chain)?
        } else {
            self.construct(&registration.activator, chain)?
        };
        registration.upcast(instance)
    }

    fn singleton(&self, registration: &Registration, chain: &mut Vec<TypeKey>) -> Result<Instance> {
        let implementation = registration.implementation();
        let (slot, _claim) = match self.claim(implementation, chain)? {
            Claimed::Cached(instance) => return Ok(instance),
            Claimed::Build(slot, claim) => (slot, claim),
        };

        let instance = slot
            .get_or_try_init(|| self.construct(&registration.activator, chain))?
            .clone();
        debug!(implementation = %implementation, "Created singleton");
        Ok(instance)
    }

    /// Returns the cached singleton, or makes this thread its builder.
    ///
    /// Blocks while another thread builds it, unless that wait would close a
    /// cycle of threads waiting on each other.
    fn claim(&self, implementation: TypeKey, chain: &[TypeKey]) -> Result<Claimed<'_>> {
        let me = thread::current().id();
        let mut state = self.singletons.lock();

        loop {
            let slot = state.slot(implementation);
            if let Some(instance) = slot.get() {
                trace!(implementation = %implementation, "Reusing singleton");
                return Ok(Claimed::Cached(Arc::clone(instance)));
            }

            check_cycle(implementation, chain)?;

            if !state.building.contains_key(&implementation) {
                state.building.insert(implementation, me);
                let claim = Claim {
                    resolver: self,
                    implementation,
                };
                return Ok(Claimed::Build(slot, claim));
            }

            if let Some(cycle) = state.wait_cycle(me, implementation) {
                warn!(cycle = ?cycle, "Circular dependency across threads detected!");
                return Err(SanadError::CircularDependency(CircularDependencyError {
                    chain: cycle,
                }));
            }

            trace!(implementation = %implementation, "Waiting for singleton");
            state.waiting.insert(me, implementation);
            self.released.wait(&mut state);
            state.waiting.remove(&me);
        }
    }

    fn construct(&self, activator: &Activator, chain: &mut Vec<TypeKey>) -> Result<Instance> {
        let implementation = activator.implementation;
        check_cycle(implementation, chain)?;

        let constructor = activator.constructor()?;

        chain.push(implementation);
        let arguments = constructor
            .parameters
            .iter()
            .map(|parameter| -> Result<(ContractKey, Resolved)> {
                Ok((*parameter, self.resolve_in(parameter, chain)?))
            })
            .collect::<Result<Vec<_>>>();
        chain.pop();

        let mut arguments = Arguments::new(implementation, arguments?);
        let instance = (constructor.build)(&mut arguments)?;

        if arguments.remaining() > 0 {
            debug!(
                implementation = %implementation,
                unused = arguments.remaining(),
                "Constructor left resolved arguments unused"
            );
        }

        trace!(implementation = %implementation, "Constructed");
        Ok(instance)
    }

    fn mismatch(&self, contract: TypeKey) -> SanadError {
        let implementation = self
            .registry
            .active(&contract)
            .map_or(contract, Registration::implementation);
        SanadError::ContractMismatch(ContractMismatchError {
            contract,
            implementation,
        })
    }
}

fn check_cycle(implementation: TypeKey, chain: &[TypeKey]) -> Result<()> {
    let Some(start) = chain.iter().position(|k| *k == implementation) else {
        return Ok(());
    };

    let mut cycle = chain[start..].to_vec();
    cycle.push(implementation);
    warn!(cycle = ?cycle, "Circular dependency detected!");
    Err(SanadError::CircularDependency(CircularDependencyError { chain: cycle }))
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registered", &self.registry.len())
            .field("singletons", &self.cached_singletons())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::{Constructor, Injectable};
    use crate::lifetime::Lifetime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::time::Duration;

    trait Sender: Send + Sync {
        fn name(&self) -> &'static str;
    }

    struct Smtp;
    impl Sender for Smtp {
        fn name(&self) -> &'static str {
            "smtp"
        }
    }
    crate::implements!(Smtp: dyn Sender);

    struct Sendmail;
    impl Sender for Sendmail {
        fn name(&self) -> &'static str {
            "sendmail"
        }
    }
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

    struct Outbox {
        primary: Arc<dyn Sender>,
        all: Vec<Arc<dyn Sender>>,
    }

    impl Injectable for Outbox {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|args| {
                Ok(Outbox {
                    primary: args.single()?,
                    all: args.collection()?,
                })
            })
            .param::<dyn Sender>()
            .collection::<dyn Sender>()]
        }
    }

    fn same<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
    }

    #[test]
    fn resolve_not_registered() {
        let resolver = Resolver::new(&Registry::new());

        let Err(err) = resolver.resolve::<dyn Sender>() else {
            panic!("Expected resolution to fail");
        };
        match err {
            SanadError::NotRegistered(e) => {
                assert_eq!(e.requested, TypeKey::of::<dyn Sender>());
                assert!(e.required_by.is_none());
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn missing_parameter_names_consumer() {
        let mut registry = Registry::new();
        registry.register_self::<Outbox>(Lifetime::PerRequest);
        let resolver = Resolver::new(&registry);

        let Err(err) = resolver.resolve::<Outbox>() else {
            panic!("Expected resolution to fail");
        };
        match err {
            SanadError::NotRegistered(e) => {
                assert_eq!(e.requested, TypeKey::of::<dyn Sender>());
                assert_eq!(e.required_by, Some(TypeKey::of::<Outbox>()));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn singleton_is_shared() {
        let mut registry = Registry::new();
        registry.register::<dyn Sender, Smtp>(Lifetime::Singleton);
        let resolver = Resolver::new(&registry);

        let a = resolver.resolve::<dyn Sender>().unwrap();
        let b = resolver.resolve::<dyn Sender>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(resolver.cached_singletons(), 1);
    }

    #[test]
    fn per_request_is_fresh() {
        let mut registry = Registry::new();
        registry.register::<dyn Sender, Smtp>(Lifetime::PerRequest);
        let resolver = Resolver::new(&registry);

        let a = resolver.resolve::<dyn Sender>().unwrap();
        let b = resolver.resolve::<dyn Sender>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(resolver.cached_singletons(), 0);
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::PerRequest)
            .register::<dyn Sender, Sendmail>(Lifetime::PerRequest);
        let resolver = Resolver::new(&registry);

        assert_eq!(resolver.resolve::<dyn Sender>().unwrap().name(), "sendmail");
    }

    #[test]
    fn resolve_all_in_registration_order() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register::<dyn Sender, Sendmail>(Lifetime::PerRequest);
        let resolver = Resolver::new(&registry);

        let names: Vec<_> = resolver
            .resolve_all::<dyn Sender>()
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, ["smtp", "sendmail"]);
    }

    #[test]
    fn resolve_all_unregistered_is_empty() {
        let resolver = Resolver::new(&Registry::new());
        assert!(resolver.resolve_all::<dyn Sender>().unwrap().is_empty());
    }

    #[test]
    fn collection_parameter_receives_every_implementation() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register::<dyn Sender, Sendmail>(Lifetime::Singleton)
            .register_self::<Outbox>(Lifetime::PerRequest);
        let resolver = Resolver::new(&registry);

        let outbox = resolver.resolve::<Outbox>().unwrap();
        assert_eq!(outbox.primary.name(), "sendmail");
        assert_eq!(outbox.all.len(), 2);
        assert_eq!(outbox.all[0].name(), "smtp");
        assert!(same(&outbox.primary, &outbox.all[1]));
    }

    #[test]
    fn singleton_identity_is_per_implementation() {
        let mut registry = Registry::new();
        registry
            .register::<dyn Sender, Smtp>(Lifetime::Singleton)
            .register_self::<Smtp>(Lifetime::Singleton);
        let resolver = Resolver::new(&registry);

        let via_trait = resolver.resolve::<dyn Sender>().unwrap();
        let via_self = resolver.resolve::<Smtp>().unwrap();
        assert!(same(&via_trait, &via_self));
    }

    #[test]
    fn snapshot_ignores_later_registrations() {
        let mut registry = Registry::new();
        let resolver = Resolver::new(&registry);
        registry.register::<dyn Sender, Smtp>(Lifetime::Singleton);

        assert!(!resolver.is_registered::<dyn Sender>());
        assert!(resolver.resolve::<dyn Sender>().is_err());
        assert!(Resolver::new(&registry).resolve::<dyn Sender>().is_ok());
    }

    #[test]
    fn detect_cycle_at_resolution() {
        struct Ping;
        struct Pong;

        let mut registry = Registry::new();
        registry
            .register_with::<Ping, Ping>(
                Lifetime::Singleton,
                vec![Constructor::new(|_| Ok(Ping)).param::<Pong>()],
            )
            .register_with::<Pong, Pong>(
                Lifetime::PerRequest,
                vec![Constructor::new(|_| Ok(Pong)).param::<Ping>()],
            );
        let resolver = Resolver::new(&registry);

        let Err(err) = resolver.resolve::<Ping>() else {
            panic!("Expected resolution to fail");
        };
        match err {
            SanadError::CircularDependency(e) => {
                assert_eq!(
                    e.chain,
                    vec![TypeKey::of::<Ping>(), TypeKey::of::<Pong>(), TypeKey::of::<Ping>()]
                );
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
        // The failed singleton stays unbuilt.
        assert_eq!(resolver.cached_singletons(), 0);
    }

    #[test]
    fn singleton_cycle_across_threads_fails() {
        struct Ping;
        struct Pong;
        struct SlowPing;
        struct SlowPong;

        fn slow<T>(value: T) -> Result<T> {
            std::thread::sleep(Duration::from_millis(200));
            Ok(value)
        }

        // Each thread claims its own singleton, then waits for the other's.
        fn race<C: ?Sized + Send + Sync + 'static>(
            resolver: &Arc<Resolver>,
            start: &Arc<Barrier>,
            done: &mpsc::Sender<bool>,
        ) {
            let resolver = Arc::clone(resolver);
            let start = Arc::clone(start);
            let done = done.clone();
            std::thread::spawn(move || {
                start.wait();
                let cyclic = matches!(
                    resolver.resolve::<C>(),
                    Err(SanadError::CircularDependency(_))
                );
                let _ = done.send(cyclic);
            });
        }

        let mut registry = Registry::new();
        registry
            .register_with::<SlowPing, SlowPing>(
                Lifetime::PerRequest,
                vec![Constructor::new(|_| slow(SlowPing))],
            )
            .register_with::<SlowPong, SlowPong>(
                Lifetime::PerRequest,
                vec![Constructor::new(|_| slow(SlowPong))],
            )
            .register_with::<Ping, Ping>(
                Lifetime::Singleton,
                vec![Constructor::new(|_| Ok(Ping)).param::<SlowPing>().param::<Pong>()],
            )
            .register_with::<Pong, Pong>(
                Lifetime::Singleton,
                vec![Constructor::new(|_| Ok(Pong)).param::<SlowPong>().param::<Ping>()],
            );
        let resolver = Arc::new(Resolver::new(&registry));
        let start = Arc::new(Barrier::new(2));
        let (done, results) = mpsc::channel();

        race::<Ping>(&resolver, &start, &done);
        race::<Pong>(&resolver, &start, &done);

        for _ in 0..2 {
            let cyclic = results
                .recv_timeout(Duration::from_secs(5))
                .expect("Resolution should finish instead of deadlocking");
            assert!(cyclic, "Expected CircularDependency");
        }
        assert_eq!(resolver.cached_singletons(), 0);
    }

    #[test]
    fn ambiguous_constructor_at_resolution() {
        let mut registry = Registry::new();
        registry.register_with::<dyn Sender, Smtp>(
            Lifetime::PerRequest,
            vec![Constructor::new(|_| Ok(Smtp)), Constructor::new(|_| Ok(Smtp))],
        );
        let resolver = Resolver::new(&registry);

        assert!(matches!(
            resolver.resolve::<dyn Sender>(),
            Err(SanadError::AmbiguousConstructor(_))
        ));
    }

    #[test]
    fn constructor_error_propagates() {
        let mut registry = Registry::new();
        registry.register_with::<dyn Sender, Smtp>(
            Lifetime::Singleton,
            vec![Constructor::new(|_| {
                Err(SanadError::construction(TypeKey::of::<Smtp>(), "no route to host"))
            })],
        );
        let resolver = Resolver::new(&registry);

        let Err(err) = resolver.resolve::<dyn Sender>() else {
            panic!("Expected construction to fail");
        };
        assert!(err.to_string().contains("no route to host"));
    }

    #[test]
    fn singleton_built_once_across_threads() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        struct Pool;

        let mut registry = Registry::new();
        registry.register_with::<Pool, Pool>(
            Lifetime::Singleton,
            vec![Constructor::new(|_| {
                BUILT.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(10));
                Ok(Pool)
            })],
        );
        let resolver = Arc::new(Resolver::new(&registry));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.resolve::<Pool>().unwrap())
            })
            .collect();
        let pools: Vec<Arc<Pool>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(pools.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn debug_display() {
        let mut registry = Registry::new();
        registry.register::<dyn Sender, Smtp>(Lifetime::Singleton);
        let resolver = Resolver::new(&registry);

        let debug = format!("{resolver:?}");
        assert!(debug.contains("Resolver"));
        assert!(debug.contains("registered: 1"));
    }
}
