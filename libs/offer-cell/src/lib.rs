pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::create_offer_router;
pub use services::alerts::OperatorAlertService;
pub use services::booking::{AppointmentBooking, HttpBookingClient};
pub use services::engine::WaitlistEngineService;
pub use services::ledger::OfferLedgerService;
pub use services::scheduler::OfferSchedulerService;
