//! Core container implementation for Sanad.

pub mod constructor;
pub mod error;
pub mod graph;
pub mod key;
pub mod lifetime;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use constructor::{Arguments, Constructor, Implements, Injectable};
pub use error::{Result, SanadError};
pub use key::{ContractKey, TypeKey};
pub use lifetime::Lifetime;
pub use provider::Provider;
pub use registry::{Registration, RegistrationInfo, Registry};
pub use resolver::Resolver;

pub mod prelude {
    pub use crate::constructor::{Arguments, Constructor, Implements, Injectable};
    pub use crate::error::{Result, SanadError};
    pub use crate::implements;
    pub use crate::key::{ContractKey, TypeKey};
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::Provider;
    pub use crate::registry::Registry;
    pub use crate::resolver::Resolver;
}
