//! Request handlers

mod evaluations;
mod health;
mod proposals;
mod workflow;

pub use evaluations::*;
pub use health::*;
pub use proposals::*;
pub use workflow::*;

use crate::error::ApiError;
use axum::http::HeaderMap;
use linden_types::{Actor, FacultyId, Role, UserId};

/// Resolve the acting user from gateway-forwarded headers.
///
/// The gateway authenticates the session and forwards identity as
/// `x-actor-id`, `x-actor-name`, `x-actor-role` and (optional)
/// `x-actor-faculty`. Nothing here grants permissions — the engine
/// authorizes every action against the proposal itself.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let header = |name: &str| -> Result<String, ApiError> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::Unauthenticated(format!("missing {name} header")))
    };

    let id = header("x-actor-id")?;
    let name = header("x-actor-name").unwrap_or_else(|_| id.clone());
    let role: Role = header("x-actor-role")?
        .parse()
        .map_err(ApiError::Unauthenticated)?;

    let mut actor = Actor::new(UserId::new(id), name, role);
    if let Some(faculty) = headers.get("x-actor-faculty").and_then(|v| v.to_str().ok()) {
        actor = actor.with_faculty(FacultyId::new(faculty));
    }
    Ok(actor)
}

/// Parse the `Idempotency-Key` header required on every mutation.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Result<uuid::Uuid, ApiError> {
    let raw = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing Idempotency-Key header".into()))?;
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Idempotency-Key must be a UUID".into()))
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
    fn test_actor_parsing() {
        let map = headers(&[
            ("x-actor-id", "u1"),
            ("x-actor-name", "A"),
            ("x-actor-role", "QUAN_LY_KHOA"),
            ("x-actor-faculty", "f1"),
        ]);
        let actor = actor_from_headers(&map).unwrap();
        assert_eq!(actor.role, Role::QuanLyKhoa);
        assert_eq!(actor.faculty_id, Some(FacultyId::new("f1")));
    }

    #[test]
    fn test_missing_actor_is_unauthenticated() {
        let err = actor_from_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));

        let map = headers(&[("x-actor-id", "u1"), ("x-actor-role", "SUPERADMIN")]);
        assert!(matches!(
            actor_from_headers(&map).unwrap_err(),
            ApiError::Unauthenticated(_)
        ));
    }

    #[test]
    fn test_idempotency_key_parsing() {
        let key = uuid::Uuid::new_v4();
        let map = headers(&[("idempotency-key", &key.to_string())]);
        assert_eq!(idempotency_key(&map).unwrap(), key);

        assert!(idempotency_key(&HeaderMap::new()).is_err());
        let bad = headers(&[("idempotency-key", "not-a-uuid")]);
        assert!(idempotency_key(&bad).is_err());
    }
}
