use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::auth::{error::AuthError, jwt::TokenService};

/// Paths reachable without a token. Matched exactly.
pub const PUBLIC_PATHS: &[&str] = &["/register", "/login", "/health"];

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Pulls `<token>` out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Runs before every handler. Rejections are all the same generic 401;
/// the reason only goes to the debug log.
pub async fn require_auth(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path();
    if is_public(path) {
        return Ok(next.run(req).await);
    }

    let Some(token) = bearer_token(req.headers()) else {
        debug!(path = %path, "missing or malformed Authorization header");
        return Err(AuthError::Unauthorized);
    };

    let identity = match tokens.validate(token) {
        Ok(identity) => identity,
        Err(e) => {
            debug!(path = %path, reason = %e, "token rejected");
            return Err(AuthError::Unauthorized);
        }
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Extension, Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::claims::Identity;
    use crate::state::AppState;

    fn headers_with(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, value.parse().unwrap());
        h
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn exemption_list_is_exact() {
        assert!(is_public("/register"));
        assert!(is_public("/login"));
        assert!(is_public("/health"));
        assert!(!is_public("/me"));
        assert!(!is_public("/register/extra"));
        assert!(!is_public("/"));
    }

    fn gated(state: AppState) -> Router {
        Router::new()
            .route("/login", post(|| async { "public" }))
            .route(
                "/whoami",
                get(|Extension(id): Extension<Identity>| async move { id.user_id.to_string() }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn call(app: Router, path: &str, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = HttpRequest::builder().uri(path);
        if path == "/login" {
            req = req.method("POST");
        }
        if let Some(v) = auth {
            req = req.header(header::AUTHORIZATION, v);
        }
        let res = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn public_path_passes_without_token() {
        let fake = AppState::fake();
        let (status, body) = call(gated(fake.state), "/login", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "public");
    }

    #[tokio::test]
    async fn valid_token_attaches_identity() {
        let fake = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = fake.state.tokens.issue(user_id).unwrap();
        let auth = format!("Bearer {token}");
        let (status, body) = call(gated(fake.state), "/whoami", Some(&auth)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, user_id.to_string());
    }

    #[tokio::test]
    async fn every_rejection_looks_the_same() {
        let fake = AppState::fake();
        let token = fake.state.tokens.issue(Uuid::new_v4()).unwrap();
        let expired = format!("Bearer {token}");
        fake.clock.advance(3601);

        let cases = [
            None,
            Some("Basic dXNlcjpwYXNz".to_string()),
            Some("Bearer not.a.jwt".to_string()),
            Some("Bearer garbage".to_string()),
            Some(expired),
        ];
        let mut bodies = Vec::new();
        for auth in cases {
            let (status, body) = call(gated(fake.state.clone()), "/whoami", auth.as_deref()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            bodies.push(body);
        }
        assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    }
}
