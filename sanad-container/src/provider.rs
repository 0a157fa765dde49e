//! Provider trait: a module of related registrations.
//!
//! # Examples
//! ```rust,ignore
//! struct MailProvider;
//!
//! impl Provider for MailProvider {
//!     fn register(&self, registry: &mut Registry) {
//!         registry
//!             .register::<dyn Transport, Smtp>(Lifetime::Singleton)
//!             .register::<dyn Mailer, QueuedMailer>(Lifetime::PerRequest);
//!     }
//! }
//!
//! registry.add_provider(&MailProvider);
//! ```

use crate::registry::Registry;

/// Groups the registrations of one area of an application.
///
/// Split registrations by concern and add each provider with
/// [`Registry::add_provider`] instead of one long registration block.
pub trait Provider: Send + Sync {
    /// Adds this module's registrations.
    fn register(&self, registry: &mut Registry);

    /// Human-readable name, used in log events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
