//! Bearer-token authentication
//!
//! Every content route requires `Authorization: Bearer <token>`, where
//! the token maps to a row in the users table. Authorization is
//! two-level: any known user may author and refine content; admin
//! routes additionally require the `admin` role.

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sqlx::SqlitePool;

use crate::db::users::{self, User};
use crate::error::ApiError;

/// The authenticated caller, resolved from the bearer token.
/// Use as a handler argument; a missing or unknown token rejects the
/// request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Admin-role gate for admin-only handlers
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Admin privileges required".to_string(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let pool = SqlitePool::from_ref(state);
        let user = users::find_by_token(&pool, token)
            .await
            .map_err(ApiError::Common)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_string()))?;

        Ok(CurrentUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/books");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123"));
    }

    #[test]
    fn test_missing_header() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_empty_token_rejected() {
        let parts = parts_with_auth(Some("Bearer   "));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser(User {
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
        });
        assert!(admin.require_admin().is_ok());

        let author = CurrentUser(User {
            email: "author@example.com".to_string(),
            role: "author".to_string(),
        });
        assert!(matches!(
            author.require_admin(),
            Err(ApiError::Forbidden(_))
        ));
    }
}
