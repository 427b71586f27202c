use axum::{extract::State, http::Method, response::IntoResponse, Router};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod airports;
pub mod bookings;
pub mod error;
pub mod flights;
pub mod middleware;
pub mod miles;
pub mod state;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let public_routes = Router::new()
        .merge(flights::routes())
        .merge(airports::routes());

    let user_routes = Router::new()
        .merge(bookings::routes())
        .merge(miles::user_routes())
        .route_layer(axum::middleware::from_fn(
            middleware::auth::gateway_auth_middleware,
        ));

    let admin_routes = Router::new()
        .merge(flights::admin_routes())
        .merge(airports::admin_routes())
        .merge(miles::admin_routes())
        .route_layer(axum::middleware::from_fn(
            middleware::auth::admin_auth_middleware,
        ));

    let partner_routes = miles::partner_routes().route_layer(
        axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::airline_auth_middleware,
        ),
    );

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .merge(partner_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    axum::extract::ConnectInfo(addr): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let ip = addr.ip().to_string();
    let key = format!("ratelimit:{}", ip);

    match state.redis.check_rate_limit(&key, 100, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((axum::http::StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
