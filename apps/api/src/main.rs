use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use cancellation_cell::CancellationFeedService;
use matching_cell::MatcherService;
use notification_cell::{
    DispatchRouter, HttpGatewayDispatch, InAppNotificationService, NotificationDispatch,
    PreferenceStoreService,
};
use offer_cell::{
    AppointmentBooking, HttpBookingClient, OfferLedgerService, OfferSchedulerService,
    OperatorAlertService, WaitlistEngineService,
};
use shared_config::AppConfig;
use waitlist_cell::WaitlistStoreService;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Careline waitlist engine");

    // Load configuration
    let config = AppConfig::from_env();

    // Core stores
    let waitlist = Arc::new(WaitlistStoreService::new());
    let feed = Arc::new(CancellationFeedService::new());
    let ledger = Arc::new(OfferLedgerService::new());
    let preferences = Arc::new(PreferenceStoreService::new());

    // Notification transports
    let in_app = Arc::new(InAppNotificationService::new());
    let dispatch: Arc<dyn NotificationDispatch> = Arc::new(DispatchRouter::new(
        HttpGatewayDispatch::new(&config),
        Arc::clone(&in_app),
    ));

    // Engine graph
    let matcher = Arc::new(
        MatcherService::new(&config).expect("scoring weights in configuration are invalid"),
    );
    let scheduler = Arc::new(OfferSchedulerService::new(
        &config,
        Arc::clone(&ledger),
        Arc::clone(&waitlist),
        Arc::clone(&feed),
        Arc::clone(&preferences),
        dispatch,
    ));
    let booking: Arc<dyn AppointmentBooking> = Arc::new(HttpBookingClient::new(&config));
    let alerts = Arc::new(OperatorAlertService::new());
    let engine = Arc::new(WaitlistEngineService::new(
        &config,
        Arc::clone(&waitlist),
        Arc::clone(&feed),
        Arc::clone(&ledger),
        scheduler,
        matcher,
        booking,
        alerts,
    ));

    // Run the match and sweep loops in the background
    let background_engine = Arc::clone(&engine);
    tokio::spawn(async move {
        if let Err(e) = background_engine.start().await {
            error!("Waitlist engine stopped: {}", e);
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(waitlist, feed, preferences, engine)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .await
        .unwrap();
}
