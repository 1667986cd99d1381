//! Background tasks driving the service's time-based behavior.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::service::Service;

/// Spawn the fixed-interval janitor loop.
pub fn spawn_janitor(service: Arc<Service>) -> JoinHandle<()> {
    let period = service.janitor_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            service.janitor_tick();
        }
    })
}

/// Spawn the one-shot timer that ends the adoption window.
pub fn spawn_adoption_timer(service: Arc<Service>) -> JoinHandle<()> {
    let window = service.adoption_duration();
    tokio::spawn(async move {
        tokio::time::sleep(window).await;
        service.finish_adoption();
    })
}

/// Spawn both background tasks. The janitor handle never resolves on its
/// own; abort it on shutdown.
pub fn spawn_background(service: &Arc<Service>) -> (JoinHandle<()>, JoinHandle<()>) {
    (
        spawn_janitor(Arc::clone(service)),
        spawn_adoption_timer(Arc::clone(service)),
    )
}
