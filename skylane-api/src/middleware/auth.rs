use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::state::AppState;

// ============================================================================
// Trusted gateway headers
// ============================================================================

// The upstream gateway terminates authentication and injects the verified
// identity; this service trusts these headers as-is.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

pub const AIRLINE_CODE_HEADER: &str = "x-airline-code";
pub const AIRLINE_KEY_HEADER: &str = "x-api-key";

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone)]
pub struct GatewayUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct AirlinePartner {
    pub code: String,
}

pub fn parse_gateway_user(headers: &HeaderMap) -> Option<GatewayUser> {
    let id = headers.get(USER_ID_HEADER)?.to_str().ok()?;
    let id = Uuid::parse_str(id).ok()?;
    let email = headers.get(USER_EMAIL_HEADER)?.to_str().ok()?.to_string();
    let full_name = headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("user")
        .to_string();

    Some(GatewayUser {
        id,
        email,
        full_name,
        role,
    })
}

// ============================================================================
// Middleware
// ============================================================================

pub async fn gateway_auth_middleware(
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = parse_gateway_user(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user = parse_gateway_user(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    if user.role != ADMIN_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Partner airlines authenticate with a code + API key header pair checked
/// against configuration.
pub async fn airline_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let code = req
        .headers()
        .get(AIRLINE_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_uppercase())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let key = req
        .headers()
        .get(AIRLINE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.airline_api_keys.get(&code) {
        Some(expected) if expected == key => {
            req.extensions_mut().insert(AirlinePartner { code });
            Ok(next.run(req).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(entries: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_parse_gateway_user() {
        let id = Uuid::new_v4();
        let map = headers(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_EMAIL_HEADER, "ayse@example.com"),
            (USER_ROLE_HEADER, "admin"),
        ]);
        let user = parse_gateway_user(&map).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "ayse@example.com");
        // No explicit name header: falls back to the mailbox name.
        assert_eq!(user.full_name, "ayse");
        assert_eq!(user.role, "admin");
    }

    #[test]
    fn test_parse_gateway_user_defaults_role() {
        let id = Uuid::new_v4();
        let map = headers(&[
            (USER_ID_HEADER, &id.to_string()),
            (USER_EMAIL_HEADER, "pax@example.com"),
        ]);
        let user = parse_gateway_user(&map).unwrap();
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_parse_gateway_user_rejects_bad_headers() {
        assert!(parse_gateway_user(&headers(&[])).is_none());
        assert!(parse_gateway_user(&headers(&[
            (USER_ID_HEADER, "not-a-uuid"),
            (USER_EMAIL_HEADER, "pax@example.com"),
        ]))
        .is_none());
        let id = Uuid::new_v4();
        assert!(parse_gateway_user(&headers(&[(USER_ID_HEADER, &id.to_string())])).is_none());
    }
}
