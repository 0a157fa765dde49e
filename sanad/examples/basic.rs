//! Basic example of the Sanad container.

use std::sync::Arc;

use sanad::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

#[derive(Injectable)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}
implements!(ConsoleLogger: dyn Logger);

trait AuditSink: Send + Sync {
    fn record(&self, event: &str);
}

#[derive(Injectable)]
struct StdoutAudit;

impl AuditSink for StdoutAudit {
    fn record(&self, event: &str) {
        println!("[AUDIT stdout] {event}");
    }
}
implements!(StdoutAudit: dyn AuditSink);

#[derive(Injectable)]
struct LoggerAudit {
    logger: Arc<dyn Logger>,
}

impl AuditSink for LoggerAudit {
    fn record(&self, event: &str) {
        self.logger.log(&format!("audit: {event}"));
    }
}
implements!(LoggerAudit: dyn AuditSink);

#[derive(Injectable)]
struct Database {
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        "1 row".to_string()
    }
}

#[derive(Injectable)]
struct UserService {
    db: Arc<Database>,
    audit: Vec<Arc<dyn AuditSink>>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        for sink in &self.audit {
            sink.record(&format!("read user {id}"));
        }
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

struct DataProvider;

impl Provider for DataProvider {
    fn register(&self, registry: &mut Registry) {
        registry
            .register_self::<Database>(Lifetime::Singleton)
            .register_self::<UserService>(Lifetime::PerRequest);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("sanad_container=debug")
        .init();

    let mut registry = Registry::new();
    registry
        .register::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)
        .register::<dyn AuditSink, StdoutAudit>(Lifetime::Singleton)
        .register::<dyn AuditSink, LoggerAudit>(Lifetime::PerRequest)
        .add_provider(&DataProvider);

    for info in registry.describe() {
        println!("{} -> {} ({})", info.contract, info.implementation, info.lifetime);
    }

    let resolver = Resolver::validated(&registry)?;
    println!("{resolver:?}");

    let service: Arc<UserService> = resolver.resolve()?;
    println!("{}", service.get_user(42));

    // New UserService, same Database singleton.
    let again: Arc<UserService> = resolver.resolve()?;
    assert!(!Arc::ptr_eq(&service, &again));
    assert!(Arc::ptr_eq(&service.db, &again.db));

    tracing::info!(singletons = resolver.cached_singletons(), "Done");
    Ok(())
}
