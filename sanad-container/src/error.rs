//! Error types for resolution.
//!
//! Every failure names the types involved and carries a hint on how to fix
//! the registration, since the registration graph is static and retrying
//! never helps.

use std::fmt;

use sanad_support::rendering::{render_chain, render_list, shorten_type_name};

use crate::key::{ContractKey, TypeKey};

/// Main error type for all Sanad operations.
#[derive(Debug, thiserror::Error)]
pub enum SanadError {
    /// No registration exists for the requested contract.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// The implementation offers more than one constructor.
    #[error("{}", .0)]
    AmbiguousConstructor(AmbiguousConstructorError),

    /// The implementation offers no constructor at all.
    #[error("No constructor for {}\n  Hint: Return at least one Constructor from Injectable::constructors()", .0)]
    MissingConstructor(TypeKey),

    /// Resolution revisited a type that is still being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A constructed instance could not be handed out as the contract type.
    #[error("{}", .0)]
    ContractMismatch(ContractMismatchError),

    /// The implementation's constructor returned an error.
    #[error("Failed to construct {implementation}: {source}")]
    ConstructionFailed {
        implementation: TypeKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SanadError {
    /// Wraps any error raised inside a constructor.
    pub fn construction(
        implementation: TypeKey,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SanadError::ConstructionFailed {
            implementation,
            source: source.into(),
        }
    }
}

/// Error when a contract has no registration.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The contract that was requested.
    pub requested: TypeKey,
    /// The implementation whose constructor asked for it, if any.
    pub required_by: Option<TypeKey>,
    /// Registered contracts with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contract not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:\n{}", render_list(&self.suggestions, 4))?;
        }

        write!(
            f,
            "\n  Hint: Did you forget to call .register::<{}, _>()?",
            shorten_type_name(self.requested.type_name())
        )
    }
}

/// Error when an implementation has several constructors.
#[derive(Debug)]
pub struct AmbiguousConstructorError {
    pub implementation: TypeKey,
    /// Parameter lists of every candidate constructor.
    pub candidates: Vec<Vec<ContractKey>>,
}

impl fmt::Display for AmbiguousConstructorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous constructor for {}: {} candidates",
            self.implementation,
            self.candidates.len()
        )?;

        for params in &self.candidates {
            let names: Vec<String> = params
                .iter()
                .map(|p| shorten_type_name(&p.to_string()))
                .collect();
            write!(f, "\n    - ({})", names.join(", "))?;
        }

        write!(f, "\n  Hint: Expose exactly one constructor")
    }
}

/// Error when a dependency cycle is found.
///
/// `chain` starts and ends with the same implementation type.
#[derive(Debug)]
pub struct CircularDependencyError {
    pub chain: Vec<TypeKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain.iter().map(TypeKey::type_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: Break the cycle by moving the shared part into its own contract"
        )
    }
}

/// Error when an instance cannot be viewed as the requested contract.
#[derive(Debug)]
pub struct ContractMismatchError {
    pub contract: TypeKey,
    pub implementation: TypeKey,
}

impl fmt::Display for ContractMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Contract mismatch: {} does not satisfy {}",
            self.implementation, self.contract
        )
    }
}

/// Convenient Result type for Sanad operations.
pub type Result<T> = std::result::Result<T, SanadError>;
