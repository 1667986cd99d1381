//! Builder assembling a service from configuration and injected seams.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::bail;
use parking_lot::Mutex;

use crate::config::ServiceConfig;
use crate::core::audit::AuditSink;
use crate::core::error::AppResult;
use crate::core::matchmaker::Matchmaker;
use crate::core::service::{QueueComparator, Service, ServiceParts};
use crate::core::unit::Unit;
use crate::util::clock::{Clock, SystemClock};
use crate::util::id::{IdSource, UuidIdSource};

/// Builds a [`Service`] with constructor-injected dependencies; defaults
/// are the system clock, UUIDv4 IDs, name-equality matching, FIFO
/// prioritization, and no audit sink.
pub struct ServiceBuilder {
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    matchmaker: Matchmaker,
    priority: Option<QueueComparator>,
    audit: Option<Arc<Mutex<dyn AuditSink>>>,
}

impl ServiceBuilder {
    /// Start from a configuration.
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdSource),
            matchmaker: Matchmaker::default(),
            priority: None,
            audit: None,
        }
    }

    /// Inject a time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Inject an ID generator.
    pub fn with_id_source(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    /// Inject a matchmaker (e.g. one with a query-aware predicate).
    pub fn with_matchmaker(mut self, matchmaker: Matchmaker) -> Self {
        self.matchmaker = matchmaker;
        self
    }

    /// Inject a queue prioritization comparator; FIFO when absent.
    pub fn with_priority(mut self, comparator: QueueComparator) -> Self {
        self.priority = Some(comparator);
        self
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, audit: Arc<Mutex<dyn AuditSink>>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate the configuration and build the service in its `Starting`
    /// phase. The caller is responsible for spawning the background tasks
    /// ([`crate::runtime::tasks::spawn_background`]).
    pub fn build(self) -> AppResult<Service> {
        if let Err(reason) = self.config.validate() {
            bail!("config invalid: {reason}");
        }
        let mut units = BTreeMap::new();
        for unit_cfg in &self.config.units {
            let name = unit_cfg.topology.name.clone();
            units.insert(name, Unit::new(unit_cfg.topology.clone()));
        }
        Ok(Service::from_parts(ServiceParts {
            units,
            queue_refresh: self.config.queue_refresh(),
            allocation_refresh: self.config.allocation_refresh(),
            janitor_interval: self.config.janitor_interval(),
            adoption_duration: self.config.adoption_duration(),
            clock: self.clock,
            ids: self.ids,
            matchmaker: self.matchmaker,
            priority: self.priority,
            audit: self.audit,
        }))
    }
}
