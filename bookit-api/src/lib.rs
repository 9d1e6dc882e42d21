use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod extract;
pub mod locks;
pub mod middleware;
pub mod reservations;
pub mod rooms;
pub mod state;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let authenticated = Router::new()
        .route("/reservation-api/lock-rooms/", post(locks::lock_rooms))
        .route("/reservation-api/unlock-rooms/", post(locks::unlock_rooms))
        .route("/reservation-api/locks/", get(locks::my_locks))
        .route("/reservation-api/reserve/", post(reservations::reserve))
        .route("/reservation-api/reservation/", get(reservations::my_reservations))
        .route(
            "/reservation-api/reservation/{id}/cancel/",
            post(reservations::cancel_reservation),
        )
        .route(
            "/reservation-api/all-hotel-reservations/",
            get(reservations::hotel_reservations),
        )
        .route("/room-api/all-rooms/", post(rooms::search_rooms))
        .route_layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(authenticated)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
