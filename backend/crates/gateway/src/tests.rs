//! End-to-end tests for the gateway middleware
//! Drives a real axum router through the layer with a scripted auth provider

#[cfg(test)]
mod gateway_tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderName, Request, Response, StatusCode, header};
    use axum::routing::get;
    use chrono::Utc;
    use kernel::id::UserId;
    use platform::crypto::to_base64url;
    use tower::ServiceExt;

    use crate::application::config::{GatewayConfig, RefreshPolicy};
    use crate::domain::entity::session::{Session, SessionUser};
    use crate::domain::repository::AuthProvider;
    use crate::error::{SessionError, SessionResult};
    use crate::infra::CookieSessionStorage;
    use crate::presentation::headers::{X_AUTH_HUB, X_USER_EMAIL, X_USER_ID, X_USER_ROLE};
    use crate::presentation::middleware::GatewayState;
    use crate::presentation::router::with_auth_gateway_generic;

    const COOKIE_NAME: &str = "sb-gtyvdircfhmdjiaelqkg-auth-token";
    const CANONICAL: &str = "auth.autamedica.com";

    #[derive(Clone)]
    enum Outcome {
        Refreshed(Session),
        Rejected,
        Unavailable,
    }

    struct FakeProvider {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AuthProvider for Arc<FakeProvider> {
        async fn refresh_session(&self, _refresh_token: &str) -> SessionResult<Session> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Refreshed(session) => Ok(session.clone()),
                Outcome::Rejected => Err(SessionError::Invalid(
                    "Invalid Refresh Token: Already Used".to_string(),
                )),
                Outcome::Unavailable => Err(SessionError::Provider("status 503".to_string())),
            }
        }
    }

    fn session(access_token: &str, refresh_token: &str, expires_in: i64) -> Session {
        Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in,
            expires_at: Some(Utc::now().timestamp() + expires_in),
            user: SessionUser {
                id: UserId::new(),
                email: Some("ana@autamedica.com".to_string()),
                role: Some("authenticated".to_string()),
                extra: serde_json::json!({ "user_metadata": { "role": "patient" } })
                    .as_object()
                    .cloned()
                    .unwrap(),
            },
        }
    }

    fn cookie_value(session: &Session) -> String {
        let json = serde_json::to_string(session).unwrap();
        format!("base64-{}", to_base64url(json.as_bytes()))
    }

    /// Echoes what the downstream handler saw: forwarded cookies and identity
    async fn echo(req: Request<Body>) -> String {
        let value = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        let identity = match value(X_USER_ID) {
            id if id.is_empty() => "none".to_string(),
            id => format!("{}|{}|{}", id, value(X_USER_ROLE), value(X_USER_EMAIL)),
        };
        format!("{}\n{}", value(header::COOKIE), identity)
    }

    fn app(provider: Arc<FakeProvider>, config: GatewayConfig) -> Router {
        let storage = CookieSessionStorage::new(&config.session_cookie);
        let routes = Router::new()
            .route("/", get(echo))
            .route("/profile", get(echo))
            .route("/auth/login", get(echo))
            .route("/api/session-sync", get(echo))
            .route("/_next/static/app.js", get(echo));
        with_auth_gateway_generic(routes, GatewayState::new(provider, storage, config))
    }

    fn request(host: &str, target: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(target).header(header::HOST, host);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn set_cookies(response: &Response<Body>) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_wrong_host_gets_permanent_redirect() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request("autamedica-auth.pages.dev", "/profile?tab=2", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://auth.autamedica.com/profile?tab=2"
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_localhost_is_not_redirected() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider, GatewayConfig::default())
            .oneshot(request("localhost:3005", "/auth/login", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_public_path_passes_without_session() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/auth/login", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(response.headers()[X_AUTH_HUB], "true");
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(set_cookies(&response).is_empty());
        assert_eq!(body_text(response).await, "\nnone");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_protected_path_without_session_redirects_to_select_role() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile?tab=2", Some("theme=dark")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://auth.autamedica.com/auth/select-role?returnTo=%2Fprofile"
        );
        assert!(set_cookies(&response).is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_redirect_uses_request_origin() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider, GatewayConfig::development())
            .oneshot(request("localhost:3005", "/", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:3005/auth/select-role?returnTo=%2F"
        );
    }

    #[tokio::test]
    async fn test_valid_session_is_refreshed_and_forwarded() {
        let current = session("access-old", "refresh-old", 3600);
        let rotated = Session {
            user: current.user.clone(),
            ..session("access-new", "refresh-new", 3600)
        };
        let provider = Arc::new(FakeProvider::new(Outcome::Refreshed(rotated.clone())));

        let cookie = format!("theme=dark; {}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let written = set_cookies(&response);
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with(&format!("{}={}", COOKIE_NAME, cookie_value(&rotated))));
        assert!(written[0].contains("Domain=.autamedica.com"));
        assert_eq!(response.headers()[X_AUTH_HUB], "true");

        let body = body_text(response).await;
        let (forwarded, context) = body.split_once('\n').unwrap();
        assert!(forwarded.contains("theme=dark"));
        assert!(forwarded.contains(&format!("{}={}", COOKIE_NAME, cookie_value(&rotated))));
        assert!(!forwarded.contains(&cookie_value(&current)));
        assert_eq!(
            context,
            format!("{}|patient|ana@autamedica.com", current.user.id)
        );
    }

    #[tokio::test]
    async fn test_same_cookie_gives_same_response() {
        let current = session("access-1", "refresh-1", 3600);
        let rotated = session("access-2", "refresh-2", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Refreshed(rotated)));
        let router = app(provider.clone(), GatewayConfig::default());

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let mut responses = Vec::new();
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let headers = response.headers().clone();
            responses.push((headers, body_text(response).await));
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(responses[0].0.get_all(header::SET_COOKIE).iter().count(), 1);
        assert_eq!(responses[0], responses[1]);
    }

    #[tokio::test]
    async fn test_rejected_refresh_redirects() {
        let current = session("access", "refresh-used", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://auth.autamedica.com/auth/select-role?returnTo=%2Fprofile"
        );
        assert!(set_cookies(&response).is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_outage_redirects() {
        let current = session("access", "refresh", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Unavailable));

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider, GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_already_expired_refresh_result_redirects() {
        let current = session("access", "refresh", 3600);
        let mut stale = session("access-new", "refresh-new", 0);
        stale.expires_at = Some(Utc::now().timestamp() - 60);
        let provider = Arc::new(FakeProvider::new(Outcome::Refreshed(stale)));

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider, GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cookie_redirects() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let cookie = format!("{}=base64-***", COOKIE_NAME);
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_within_margin_skips_refresh_for_fresh_session() {
        let current = session("access", "refresh", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let config = GatewayConfig {
            refresh: RefreshPolicy::WithinMargin(Duration::from_secs(60)),
            ..GatewayConfig::default()
        };

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider.clone(), config)
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let body = body_text(response).await;
        let (forwarded, context) = body.split_once('\n').unwrap();
        assert_eq!(forwarded, cookie);
        assert!(context.starts_with(&current.user.id.to_string()));
    }

    #[tokio::test]
    async fn test_within_margin_refreshes_expiring_session() {
        let current = session("access", "refresh", 30);
        let rotated = session("access-new", "refresh-new", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Refreshed(rotated)));
        let config = GatewayConfig {
            refresh: RefreshPolicy::WithinMargin(Duration::from_secs(60)),
            ..GatewayConfig::default()
        };

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider.clone(), config)
            .oneshot(request(CANONICAL, "/profile", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookies(&response).len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_api_path_skips_framing_csp_and_cors() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let req = Request::builder()
            .uri("/api/session-sync")
            .header(header::HOST, CANONICAL)
            .header(header::ORIGIN, "https://patients.autamedica.com")
            .body(Body::empty())
            .unwrap();
        let response = app(provider, GatewayConfig::default())
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(!headers.contains_key(header::X_FRAME_OPTIONS));
        assert!(!headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[X_AUTH_HUB], "true");
    }

    #[tokio::test]
    async fn test_cors_for_allowed_origin_on_page() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let req = Request::builder()
            .uri("/auth/login")
            .header(header::HOST, CANONICAL)
            .header(header::ORIGIN, "https://doctors.autamedica.com")
            .body(Body::empty())
            .unwrap();
        let response = app(provider, GatewayConfig::default())
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://doctors.autamedica.com"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn test_static_assets_pass_untouched() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request("wrong-host.example", "/_next/static/app.js", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(X_AUTH_HUB));
        assert!(!response.headers().contains_key(header::X_FRAME_OPTIONS));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_public_path_ignores_session_cookie() {
        let current = session("access", "refresh", 3600);
        let provider = Arc::new(FakeProvider::new(Outcome::Unavailable));

        let cookie = format!("{}={}", COOKIE_NAME, cookie_value(&current));
        let response = app(provider.clone(), GatewayConfig::default())
            .oneshot(request(CANONICAL, "/auth/login", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookies(&response).is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let body = body_text(response).await;
        assert_eq!(body, format!("{cookie}\nnone"));
    }

    #[tokio::test]
    async fn test_forwarded_host_is_ignored_by_default() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let req = Request::builder()
            .uri("/auth/login")
            .header(header::HOST, "other-host.com")
            .header("x-forwarded-host", CANONICAL)
            .body(Body::empty())
            .unwrap();
        let response = app(provider, GatewayConfig::default())
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://auth.autamedica.com/auth/login"
        );
    }

    #[tokio::test]
    async fn test_forwarded_host_is_honored_when_trusted() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let config = GatewayConfig {
            trust_forwarded_headers: true,
            ..GatewayConfig::default()
        };
        let req = Request::builder()
            .uri("/auth/login")
            .header(header::HOST, "10.0.0.7:8787")
            .header("x-forwarded-host", CANONICAL)
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        let response = app(provider, config).oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_client_identity_headers_are_stripped() {
        let provider = Arc::new(FakeProvider::new(Outcome::Rejected));
        let req = Request::builder()
            .uri("/auth/login")
            .header(header::HOST, CANONICAL)
            .header("x-user-id", "8d2f0c4e-6b1a-4f4e-9c7a-2b3d4e5f6a7b")
            .header("x-user-role", "admin")
            .header("x-user-email", "mallory@example.com")
            .body(Body::empty())
            .unwrap();
        let response = app(provider, GatewayConfig::default())
            .oneshot(req)
            .await
            .unwrap();

        assert_eq!(body_text(response).await, "\nnone");
    }
}
