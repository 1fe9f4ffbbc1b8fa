//! Application services: slot ledger, checkout, settlement, catalog

pub mod catalog;
pub mod checkout;
pub mod expiry;
pub mod ledger;
pub mod settlement;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use catalog::{start_slot_window_task, CatalogConfig, CatalogService};
pub use checkout::{
    CheckoutConfig, CheckoutError, CheckoutItem, CheckoutReceipt, InFlightCheckouts,
    ReservationCoordinator,
};
pub use expiry::start_hold_expiry_task;
pub use ledger::{LedgerConfig, LedgerError, SlotLedger};
pub use settlement::{AppliedOutcome, NotificationError, SettlementReconciler};

use crate::domain::{PaymentGateway, RepositoryProvider};

/// Every service the transport layer and background tasks need, wired once.
#[derive(Clone)]
pub struct BookingServices {
    pub repos: Arc<dyn RepositoryProvider>,
    pub ledger: Arc<SlotLedger>,
    pub checkout: Arc<ReservationCoordinator>,
    pub settlement: Arc<SettlementReconciler>,
    pub catalog: Arc<CatalogService>,
}

impl BookingServices {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        ledger_config: LedgerConfig,
        checkout_config: CheckoutConfig,
        catalog_config: CatalogConfig,
    ) -> Self {
        let ledger = Arc::new(SlotLedger::new(repos.clone(), ledger_config));
        let checkout = Arc::new(ReservationCoordinator::new(
            repos.clone(),
            ledger.clone(),
            gateway,
            checkout_config,
        ));
        let settlement = Arc::new(SettlementReconciler::new(
            repos.clone(),
            ledger.clone(),
            checkout.in_flight(),
            ledger_config.operation_timeout,
        ));
        let catalog = Arc::new(CatalogService::new(repos.clone(), catalog_config));

        Self {
            repos,
            ledger,
            checkout,
            settlement,
            catalog,
        }
    }
}
