use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use skylane_core::airport::{normalize_iata, Airport};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/airports", get(list_airports))
        .route("/airports/{code}", get(get_airport))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/airports", post(create_airport))
        .route("/admin/airports/{code}", put(update_airport).delete(delete_airport))
        .route("/admin/airports/cache/warm", post(warm_cache))
        .route("/admin/airports/cache", delete(clear_cache))
}

#[derive(Debug, Serialize)]
struct AirportResponse {
    airport: Airport,
    cached: bool,
}

#[derive(Debug, Serialize)]
struct AirportListResponse {
    airports: Vec<Airport>,
    cached: bool,
}

/// GET /airports/{code}
///
/// Read-through: a cache miss falls back to the database and repopulates the
/// entry. Cache failures degrade to a miss; misses themselves are not cached.
async fn get_airport(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<AirportResponse>, AppError> {
    let code = normalize_iata(&code)?;

    if let Ok(Some(payload)) = state.redis.get_airport(&code).await {
        if let Ok(airport) = serde_json::from_str::<Airport>(&payload) {
            return Ok(Json(AirportResponse {
                airport,
                cached: true,
            }));
        }
    }

    let airport = state
        .airports
        .find(&code)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("Airport not found: {}", code)))?;

    if let Ok(payload) = serde_json::to_string(&airport) {
        if let Err(err) = state
            .redis
            .set_airport(&code, &payload, state.cache.airport_ttl_seconds)
            .await
        {
            warn!("Failed to cache airport {}: {}", code, err);
        }
    }

    Ok(Json(AirportResponse {
        airport,
        cached: false,
    }))
}

/// GET /airports
///
/// The listing key holds the code list; the entries themselves come back in
/// one batch get. Any miss falls through to the database and refreshes both,
/// with the shorter listing TTL.
async fn list_airports(
    State(state): State<AppState>,
) -> Result<Json<AirportListResponse>, AppError> {
    if let Some(airports) = cached_listing(&state).await {
        return Ok(Json(AirportListResponse {
            airports,
            cached: true,
        }));
    }

    let airports = state.airports.list().await.map_err(AppError::internal)?;

    match listing_cache_entries(&airports) {
        Ok((entries, codes)) => {
            let ttl = state.cache.listing_ttl_seconds;
            if let Err(err) = state.redis.set_airports(&entries, ttl).await {
                warn!("Failed to cache airport entries: {}", err);
            } else if let Err(err) = state.redis.set_airport_list(&codes, ttl).await {
                warn!("Failed to cache airport code list: {}", err);
            }
        }
        Err(err) => warn!("Failed to serialize airport listing: {}", err),
    }

    Ok(Json(AirportListResponse {
        airports,
        cached: false,
    }))
}

/// Assembles the listing from cache alone: the code list plus a batch get of
/// the per-airport entries. Any gap or decode failure counts as a miss.
async fn cached_listing(state: &AppState) -> Option<Vec<Airport>> {
    let codes_payload = state.redis.get_airport_list().await.ok().flatten()?;
    let codes: Vec<String> = serde_json::from_str(&codes_payload).ok()?;

    let payloads = state.redis.get_airports(&codes).await.ok()?;
    let mut airports = Vec::with_capacity(codes.len());
    for payload in payloads {
        let airport: Airport = serde_json::from_str(&payload?).ok()?;
        airports.push(airport);
    }
    Some(airports)
}

type ListingEntries = (Vec<(String, String)>, String);

fn listing_cache_entries(airports: &[Airport]) -> Result<ListingEntries, serde_json::Error> {
    let mut entries = Vec::with_capacity(airports.len());
    for airport in airports {
        entries.push((airport.code.clone(), serde_json::to_string(airport)?));
    }
    let codes: Vec<&str> = airports.iter().map(|a| a.code.as_str()).collect();
    Ok((entries, serde_json::to_string(&codes)?))
}

#[derive(Debug, Deserialize)]
pub struct AirportRequest {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

/// POST /admin/airports
async fn create_airport(
    State(state): State<AppState>,
    Json(req): Json<AirportRequest>,
) -> Result<(StatusCode, Json<Airport>), AppError> {
    let airport = Airport {
        code: normalize_iata(&req.code)?,
        name: req.name,
        city: req.city,
        country: req.country,
    };

    let created = state
        .airports
        .create(&airport)
        .await
        .map_err(AppError::internal)?;
    if !created {
        return Err(AppError::Conflict(format!(
            "Airport already exists: {}",
            airport.code
        )));
    }

    invalidate(&state, &airport.code).await;
    Ok((StatusCode::CREATED, Json(airport)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAirportRequest {
    pub name: String,
    pub city: String,
    pub country: String,
}

/// PUT /admin/airports/{code}
async fn update_airport(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UpdateAirportRequest>,
) -> Result<Json<Airport>, AppError> {
    let airport = Airport {
        code: normalize_iata(&code)?,
        name: req.name,
        city: req.city,
        country: req.country,
    };

    let updated = state
        .airports
        .update(&airport)
        .await
        .map_err(AppError::internal)?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "Airport not found: {}",
            airport.code
        )));
    }

    invalidate(&state, &airport.code).await;
    Ok(Json(airport))
}

/// DELETE /admin/airports/{code}
async fn delete_airport(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    let code = normalize_iata(&code)?;

    let deleted = state
        .airports
        .delete(&code)
        .await
        .map_err(AppError::internal)?;
    if !deleted {
        return Err(AppError::NotFound(format!("Airport not found: {}", code)));
    }

    invalidate(&state, &code).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct WarmCacheResponse {
    warmed: usize,
}

/// POST /admin/airports/cache/warm
async fn warm_cache(State(state): State<AppState>) -> Result<Json<WarmCacheResponse>, AppError> {
    let airports = state.airports.list().await.map_err(AppError::internal)?;
    let (entries, codes) = listing_cache_entries(&airports).map_err(AppError::internal)?;

    // Warm-up entries get the full single-airport TTL; only the code list
    // carries the shorter listing TTL.
    state
        .redis
        .set_airports(&entries, state.cache.airport_ttl_seconds)
        .await
        .map_err(AppError::internal)?;
    state
        .redis
        .set_airport_list(&codes, state.cache.listing_ttl_seconds)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(WarmCacheResponse {
        warmed: entries.len(),
    }))
}

#[derive(Debug, Serialize)]
struct ClearCacheResponse {
    cleared: u64,
}

/// DELETE /admin/airports/cache
async fn clear_cache(State(state): State<AppState>) -> Result<Json<ClearCacheResponse>, AppError> {
    let cleared = state
        .redis
        .clear_airport_cache()
        .await
        .map_err(AppError::internal)?;
    Ok(Json(ClearCacheResponse { cleared }))
}

async fn invalidate(state: &AppState, code: &str) {
    if let Err(err) = state.redis.invalidate_airport(code).await {
        warn!("Failed to invalidate airport cache for {}: {}", code, err);
    }
}
