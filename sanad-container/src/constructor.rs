//! Constructor metadata: how the container learns to build a type.
//!
//! Rust has no runtime reflection, so every implementation describes its
//! constructor explicitly: the ordered list of contracts it needs, and a
//! build function that receives them resolved. [`Injectable`] is usually
//! derived (`#[derive(Injectable)]` in the `sanad` crate), but can be written
//! by hand:
//!
//! ```rust
//! use std::sync::Arc;
//! use sanad_container::constructor::{Constructor, Injectable};
//!
//! trait Transport: Send + Sync {}
//!
//! struct Mailer {
//!     transport: Arc<dyn Transport>,
//! }
//!
//! impl Injectable for Mailer {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|args| {
//!             Ok(Mailer { transport: args.single()? })
//!         })
//!         .param::<dyn Transport>()]
//!     }
//! }
//!
//! assert_eq!(Mailer::constructors()[0].parameters().len(), 1);
//! ```

use std::any::{Any, type_name};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SanadError};
use crate::key::{ContractKey, TypeKey};

/// A type-erased instance as held by the resolver.
///
/// For a freshly built implementation `I` this wraps an `Arc<I>`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A type-erased `Arc<C>` for some contract `C`.
pub type Erased = Box<dyn Any + Send + Sync>;

/// The outcome of resolving a [`ContractKey`], before it is typed again.
pub enum Resolved {
    /// One `Arc<C>`.
    One(Erased),
    /// One `Arc<C>` per registration, in registration order.
    Many(Vec<Erased>),
}

impl Resolved {
    /// Recovers the single instance as `Arc<C>`.
    pub fn into_single<C: ?Sized + Send + Sync + 'static>(self) -> Option<Arc<C>> {
        match self {
            Resolved::One(erased) => erased.downcast::<Arc<C>>().ok().map(|b| *b),
            Resolved::Many(_) => None,
        }
    }

    /// Recovers the collection as `Vec<Arc<C>>`.
    pub fn into_collection<C: ?Sized + Send + Sync + 'static>(self) -> Option<Vec<Arc<C>>> {
        match self {
            Resolved::Many(items) => items
                .into_iter()
                .map(|erased| erased.downcast::<Arc<C>>().ok().map(|b| *b))
                .collect(),
            Resolved::One(_) => None,
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::One(_) => f.write_str("Resolved::One"),
            Resolved::Many(items) => write!(f, "Resolved::Many({})", items.len()),
        }
    }
}

type BuildFn<T> = Arc<dyn Fn(&mut Arguments) -> Result<T> + Send + Sync>;

/// A type the container can construct.
///
/// Exactly one constructor must be returned; zero or several make
/// resolution fail.
pub trait Injectable: Sized + Send + Sync + 'static {
    fn constructors() -> Vec<Constructor<Self>>;
}

/// Declares that `Arc<Self>` can be handed out as `Arc<C>`.
///
/// Every type implements its own contract. Trait contracts are declared with
/// [`implements!`](crate::implements).
pub trait Implements<C: ?Sized + 'static>: Send + Sync + 'static {
    fn upcast(self: Arc<Self>) -> Arc<C>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    #[inline]
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implements [`Implements`] for trait-object contracts.
///
/// ```rust
/// use sanad_container::implements;
///
/// trait Transport: Send + Sync {}
/// trait Named: Send + Sync {}
///
/// struct Smtp;
/// impl Transport for Smtp {}
/// impl Named for Smtp {}
///
/// implements!(Smtp: dyn Transport, dyn Named);
/// ```
#[macro_export]
macro_rules! implements {
    ($implementation:ty : $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::constructor::Implements<$contract> for $implementation {
                #[inline]
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$contract> {
                    self
                }
            }
        )+
    };
}

/// One way of building `T`: its parameter list plus a build function.
pub struct Constructor<T> {
    parameters: Vec<ContractKey>,
    build: BuildFn<T>,
}

impl<T: Send + Sync + 'static> Constructor<T> {
    /// Creates a constructor with no parameters yet.
    ///
    /// Declare parameters with [`param`](Self::param) and
    /// [`collection`](Self::collection) in the order `build` consumes them.
    pub fn new(build: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            parameters: Vec::new(),
            build: Arc::new(build),
        }
    }

    /// Appends a parameter satisfied by one instance of contract `C`.
    pub fn param<C: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.parameters.push(ContractKey::single::<C>());
        self
    }

    /// Appends a parameter satisfied by every implementation of `C`.
    pub fn collection<C: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.parameters.push(ContractKey::collection::<C>());
        self
    }

    /// The declared parameters, in order.
    pub fn parameters(&self) -> &[ContractKey] {
        &self.parameters
    }

    pub(crate) fn erase(self) -> ErasedConstructor {
        let build = self.build;
        ErasedConstructor {
            parameters: self.parameters,
            build: Arc::new(move |args: &mut Arguments| {
                let value = build(args)?;
                Ok(Arc::new(value) as Instance)
            }),
        }
    }
}

impl<T> fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type", &type_name::<T>())
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// A constructor with its output erased to [`Instance`].
#[derive(Clone)]
pub(crate) struct ErasedConstructor {
    pub parameters: Vec<ContractKey>,
    pub build: Arc<dyn Fn(&mut Arguments) -> Result<Instance> + Send + Sync>,
}

impl fmt::Debug for ErasedConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedConstructor")
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// The implementation side of a registration: which type, and how to build it.
#[derive(Clone)]
pub(crate) struct Activator {
    pub implementation: TypeKey,
    pub constructors: Arc<[ErasedConstructor]>,
}

impl Activator {
    pub fn new<I: Send + Sync + 'static>(constructors: Vec<Constructor<I>>) -> Self {
        Self {
            implementation: TypeKey::of::<I>(),
            constructors: constructors.into_iter().map(Constructor::erase).collect(),
        }
    }

    /// Picks the single usable constructor.
    pub fn constructor(&self) -> Result<&ErasedConstructor> {
        match &*self.constructors {
            [only] => Ok(only),
            [] => Err(SanadError::MissingConstructor(self.implementation)),
            many => Err(SanadError::AmbiguousConstructor(
                crate::error::AmbiguousConstructorError {
                    implementation: self.implementation,
                    candidates: many.iter().map(|c| c.parameters.clone()).collect(),
                },
            )),
        }
    }
}

impl fmt::Debug for Activator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activator")
            .field("implementation", &self.implementation)
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

/// Resolved constructor arguments, consumed front to back.
pub struct Arguments {
    implementation: TypeKey,
    values: VecDeque<(ContractKey, Resolved)>,
    position: usize,
}

impl Arguments {
    pub(crate) fn new(implementation: TypeKey, values: Vec<(ContractKey, Resolved)>) -> Self {
        Self {
            implementation,
            values: values.into(),
            position: 0,
        }
    }

    /// Takes the next argument as a single instance of `C`.
    pub fn single<C: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<C>> {
        let (position, resolved) = self.take(ContractKey::single::<C>())?;
        resolved
            .into_single::<C>()
            .ok_or_else(|| self.not_holding(position, type_name::<Arc<C>>()))
    }

    /// Takes the next argument as every implementation of `C`.
    pub fn collection<C: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<C>>> {
        let (position, resolved) = self.take(ContractKey::collection::<C>())?;
        resolved
            .into_collection::<C>()
            .ok_or_else(|| self.not_holding(position, type_name::<Vec<Arc<C>>>()))
    }

    /// Number of arguments not yet taken.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn take(&mut self, expected: ContractKey) -> Result<(usize, Resolved)> {
        let position = self.position;
        let (declared, value) = self.values.pop_front().ok_or_else(|| {
            SanadError::construction(
                self.implementation,
                format!("argument {position} ({expected}) was not declared as a parameter"),
            )
        })?;
        self.position += 1;

        if declared != expected {
            return Err(SanadError::construction(
                self.implementation,
                format!("argument {position} was declared as {declared} but taken as {expected}"),
            ));
        }

        Ok((position, value))
    }

    fn not_holding(&self, position: usize, expected: &str) -> SanadError {
        SanadError::construction(
            self.implementation,
            format!("argument {position} does not hold {expected}"),
        )
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("implementation", &self.implementation)
            .field("remaining", &self.values.len())
            .finish()
    }
}
