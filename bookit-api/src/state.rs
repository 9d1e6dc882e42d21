use std::sync::Arc;

use bookit_core::cooldown::CooldownGate;
use bookit_core::locks::{LockManager, LockPolicy};
use bookit_core::notify::BookingNotifier;
use bookit_core::repository::{
    ExpiringStore, InventoryStore, LockLedger, ReservationStore, UserDirectory,
};
use bookit_core::reservation::ReservationCommitter;
use bookit_core::search::AvailabilitySearch;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage and notification backends the handlers run against.
pub struct Backends {
    pub users: Arc<dyn UserDirectory>,
    pub inventory: Arc<dyn InventoryStore>,
    pub ledger: Arc<dyn LockLedger>,
    pub reservations: Arc<dyn ReservationStore>,
    pub cooldowns: Arc<dyn ExpiringStore>,
    pub notifier: Arc<dyn BookingNotifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub locks: Arc<LockManager>,
    pub committer: Arc<ReservationCommitter>,
    pub search: Arc<AvailabilitySearch>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(backends: Backends, policy: LockPolicy, auth: AuthConfig) -> Self {
        let locks = LockManager::new(
            backends.ledger,
            backends.users,
            CooldownGate::new(backends.cooldowns),
            backends.notifier.clone(),
            policy,
        );
        let committer = ReservationCommitter::new(
            backends.inventory.clone(),
            backends.reservations.clone(),
            backends.notifier,
        );
        let search = AvailabilitySearch::new(backends.inventory, backends.reservations);

        Self {
            locks: Arc::new(locks),
            committer: Arc::new(committer),
            search: Arc::new(search),
            auth,
        }
    }
}
