use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::database::models::Teacher;
use crate::error::ApiError;
use crate::services::auth::AuthService;

/// The authenticated, active teacher behind the request
#[derive(Clone, Debug)]
pub struct AuthTeacher(pub Teacher);

impl std::ops::Deref for AuthTeacher {
    type Target = Teacher;

    fn deref(&self) -> &Teacher {
        &self.0
    }
}

/// Validates the bearer token and loads the teacher it names
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    let teacher = AuthService::new(&state).authenticate(&token).await?;
    tracing::debug!("Authenticated teacher {}", teacher.id);

    request.extensions_mut().insert(AuthTeacher(teacher));
    Ok(next.run(request).await)
}

/// Runs after `jwt_auth_middleware`; lets only admins through
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let teacher = request
        .extensions()
        .get::<AuthTeacher>()
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    if !teacher.is_admin() {
        tracing::warn!("Teacher {} attempted an admin operation", teacher.id);
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "No token, authorization denied".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("No token, authorization denied".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_required() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }
}
