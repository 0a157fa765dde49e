//! Dependency graph validation.
//!
//! Walks every registration's constructor without building anything:
//! - every single parameter has a registration
//! - every implementation exposes exactly one constructor
//! - no implementation depends on itself, directly or transitively
//!
//! A Singleton that captures a PerRequest dependency is legal but almost
//! always a mistake, so it is reported as a `warn!` event.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use crate::error::{CircularDependencyError, NotRegisteredError, Result, SanadError};
use crate::key::{ContractKey, TypeKey};
use crate::registry::{Registration, Registry};

/// Depth-first validator over registrations.
///
/// `visiting` holds the implementations on the current DFS path; meeting one
/// again is a cycle. `validated` caches finished registrations by position,
/// so an implementation registered twice has each constructor list checked.
pub(crate) struct GraphValidator<'a> {
    registry: &'a Registry,
    visiting: HashSet<TypeKey>,
    validated: HashSet<usize>,
    path: Vec<TypeKey>,
}

impl<'a> GraphValidator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<()> {
        debug!(
            registrations = self.registry.len(),
            "Starting dependency graph validation"
        );

        for position in 0..self.registry.len() {
            self.visit(position)?;
        }

        debug!("Dependency graph validation passed ✓");
        Ok(())
    }

    fn visit(&mut self, position: usize) -> Result<()> {
        if self.validated.contains(&position) {
            return Ok(());
        }

        let registry = self.registry;
        let registration = registry.at(position);
        let implementation = registration.implementation();

        if self.visiting.contains(&implementation) {
            let start = self
                .path
                .iter()
                .position(|k| *k == implementation)
                .unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(implementation);

            warn!(cycle = ?chain, "Circular dependency detected!");
            return Err(SanadError::CircularDependency(CircularDependencyError { chain }));
        }

        let parameters = &registration.activator.constructor()?.parameters;

        self.visiting.insert(implementation);
        self.path.push(implementation);

        for parameter in parameters {
            for &dependency in self.dependencies_of(implementation, parameter)? {
                check_lifetimes(registration, registry.at(dependency));
                self.visit(dependency)?;
            }
        }

        self.path.pop();
        self.visiting.remove(&implementation);
        self.validated.insert(position);

        Ok(())
    }

    /// Positions of the registrations a parameter pulls in. An empty
    /// collection is fine.
    fn dependencies_of(
        &self,
        consumer: TypeKey,
        parameter: &ContractKey,
    ) -> Result<&'a [usize]> {
        let registry = self.registry;
        let positions = registry.positions(&parameter.contract());

        match parameter {
            ContractKey::Single(contract) => {
                if positions.is_empty() {
                    return Err(SanadError::NotRegistered(NotRegisteredError {
                        requested: *contract,
                        required_by: Some(consumer),
                        suggestions: registry.suggestions_for(*contract),
                    }));
                }
                Ok(&positions[positions.len() - 1..])
            }
            ContractKey::Collection(_) => Ok(positions),
        }
    }
}

fn check_lifetimes(consumer: &Registration, dependency: &Registration) {
    if consumer.lifetime() > dependency.lifetime() {
        warn!(
            consumer = %consumer.implementation(),
            consumer_lifetime = %consumer.lifetime(),
            dependency = %dependency.implementation(),
            dependency_lifetime = %dependency.lifetime(),
            "Longer-lived registration captures a shorter-lived dependency"
        );
    }
}
