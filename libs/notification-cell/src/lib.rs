pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::create_preference_router;
pub use services::dispatch::{DispatchRouter, HttpGatewayDispatch, NotificationDispatch};
pub use services::inapp::InAppNotificationService;
pub use services::preferences::PreferenceStoreService;
