//! API router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::BookingServices;
use crate::interfaces::http::common::ApiResponse;
use crate::interfaces::http::modules::{
    bookings, courts, health, metrics as metrics_module, payments, request_id,
};

/// Transport settings that are not part of the booking services
#[derive(Clone, Default)]
pub struct ApiOptions {
    /// Pinged by `/health`; `None` on the in-memory store
    pub db: Option<DatabaseConnection>,
    /// Allowed browser origins; empty or `*` allows any
    pub cors_origins: Vec<String>,
    pub verify_signature: bool,
    pub server_key: String,
    /// Serves `/metrics` when set
    pub metrics: Option<PrometheusHandle>,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        courts::list_courts,
        courts::list_slots,
        bookings::checkout,
        bookings::list_bookings,
        bookings::get_booking,
        payments::payment_notification,
    ),
    components(
        schemas(
            ApiResponse<String>,
            health::HealthResponse,
            health::ComponentHealth,
            courts::CourtDto,
            courts::CourtImageDto,
            courts::SlotDto,
            bookings::CheckoutRequest,
            bookings::CheckoutItemRequest,
            bookings::CheckoutResponse,
            bookings::BookingDto,
            bookings::BookingItemDto,
            payments::NotificationPayload,
            payments::NotificationAck,
        )
    ),
    tags(
        (name = "Health", description = "Service and database health"),
        (name = "Courts", description = "Courts and their bookable slots"),
        (name = "Bookings", description = "Checkout and booking lookups"),
        (name = "Payments", description = "Payment provider notifications"),
    ),
    info(
        title = "Court Booking API",
        version = "0.1.0",
        description = "Slot reservation and payment settlement for sports courts.\n\n\
            Compatibility: every body is wrapped as `{success, data}`. Clients that read \
            `redirect` at the top level or expect bare arrays from `/courts` and `/bookings` \
            must read `data.redirect` and `data` instead."
    )
)]
pub struct ApiDoc;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

/// Build the full HTTP router.
pub fn create_api_router(services: BookingServices, options: ApiOptions) -> Router {
    let health_state = health::HealthState {
        db: options.db.clone(),
        started_at: Arc::new(Instant::now()),
    };
    let courts_state = courts::CourtsState {
        catalog: services.catalog.clone(),
    };
    let bookings_state = bookings::BookingsState {
        catalog: services.catalog.clone(),
        checkout: services.checkout.clone(),
    };
    let payments_state = payments::PaymentsState {
        settlement: services.settlement.clone(),
        verify_signature: options.verify_signature,
        server_key: options.server_key.clone(),
    };

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let court_routes = Router::new()
        .route("/courts", get(courts::list_courts))
        .route("/courts/{id}/slots", get(courts::list_slots))
        .with_state(courts_state);

    let booking_routes = Router::new()
        .route("/checkout", post(bookings::checkout))
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/{code}", get(bookings::get_booking))
        .with_state(bookings_state);

    let payment_routes = Router::new()
        .route("/notification", post(payments::payment_notification))
        .with_state(payments_state);

    let mut router = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(health_routes)
        .merge(court_routes)
        .merge(booking_routes)
        .merge(payment_routes);

    if let Some(handle) = options.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_module::prometheus_metrics))
                .with_state(metrics_module::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics_module::http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors_layer(&options.cors_origins))
}
