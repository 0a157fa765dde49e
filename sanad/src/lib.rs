//! # Sanad: constructor-driven IoC container for Rust
//!
//! Register which implementation satisfies which contract, then let the
//! [`Resolver`] build the whole object graph from constructor metadata.
//!
//! ```rust
//! use std::sync::Arc;
//! use sanad::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Injectable)]
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//! implements!(FixedClock: dyn Clock);
//!
//! #[derive(Injectable)]
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register::<dyn Clock, FixedClock>(Lifetime::Singleton)
//!     .register_self::<Scheduler>(Lifetime::PerRequest);
//!
//! let resolver = Resolver::validated(&registry)?;
//! let scheduler: Arc<Scheduler> = resolver.resolve()?;
//! assert_eq!(scheduler.clock.now(), 42);
//! # Ok::<(), sanad::SanadError>(())
//! ```

pub use sanad_container::*;
pub use sanad_derive::*;
pub use sanad_support::*;

pub mod prelude {
    pub use sanad_container::prelude::*;
    pub use sanad_derive::Injectable;
}
