//! Type and contract identification keys.
//!
//! [`TypeKey`] identifies a Rust type (a contract such as `dyn Mailer`, or an
//! implementation such as `SmtpMailer`). [`ContractKey`] is what a
//! constructor parameter asks for: a single instance of a contract, or the
//! collection of every implementation registered for it.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a type in the container.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried along
/// for error messages.
///
/// # Examples
/// ```
/// use sanad_container::key::TypeKey;
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key, TypeKey::of::<String>());
/// assert_ne!(key, TypeKey::of::<u8>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a key for type `T`. Works for unsized contracts like `dyn Trait`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of this type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// What a constructor parameter (or a top-level request) asks for.
///
/// # Examples
/// ```
/// use sanad_container::key::{ContractKey, TypeKey};
///
/// trait Sender: Send + Sync {}
///
/// let one = ContractKey::single::<dyn Sender>();
/// let all = ContractKey::collection::<dyn Sender>();
/// assert_ne!(one, all);
/// assert_eq!(one.contract(), all.contract());
/// assert!(all.is_collection());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKey {
    /// Exactly one instance: the last registration for the contract.
    Single(TypeKey),
    /// Every registration for the contract, in registration order.
    Collection(TypeKey),
}

impl ContractKey {
    #[inline]
    pub fn single<T: ?Sized + 'static>() -> Self {
        ContractKey::Single(TypeKey::of::<T>())
    }

    #[inline]
    pub fn collection<T: ?Sized + 'static>() -> Self {
        ContractKey::Collection(TypeKey::of::<T>())
    }

    /// The contract type, with the collection marker stripped.
    #[inline]
    pub fn contract(&self) -> TypeKey {
        match self {
            ContractKey::Single(key) | ContractKey::Collection(key) => *key,
        }
    }

    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(self, ContractKey::Collection(_))
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKey::Single(key) => write!(f, "Single({})", key.type_name()),
            ContractKey::Collection(key) => write!(f, "Collection({})", key.type_name()),
        }
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKey::Single(key) => write!(f, "{key}"),
            ContractKey::Collection(key) => write!(f, "Collection<{key}>"),
        }
    }
}
