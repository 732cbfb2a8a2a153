//! HTTP routes for the application.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::{self, AppState, routes};
use crate::pages::{admin, home, library};

/// Builds the router. Every route runs behind the request gate; files under
/// `/public` are served from `public_dir`.
pub fn router(state: Arc<AppState>, public_dir: &str) -> Router {
    Router::new()
        .route("/health", get(home::health))
        .route("/", get(home::home))
        .route("/about", get(home::about))
        .route("/book", get(home::featured_books))
        .route("/api/me", get(home::me))
        // Auth routes
        .route("/sign-in", get(routes::sign_in_page).post(routes::sign_in))
        .route("/sign-up", get(routes::sign_up_page).post(routes::sign_up))
        .route(
            "/forgot-password",
            get(routes::forgot_password_page).post(routes::forgot_password),
        )
        .route("/sign-out", post(routes::sign_out))
        .route("/auth/google", get(routes::google_start))
        .route("/auth/callback", get(routes::callback))
        .route("/api/auth/callback", get(routes::callback))
        // Library and reader
        .route("/dashboard", get(library::dashboard))
        .route(
            "/dashboard/reset-password",
            get(routes::reset_password_page).post(routes::reset_password),
        )
        .route("/read/{id}", get(library::read))
        .route("/read/{id}/progress", post(library::save_progress))
        // Catalog management
        .route("/dashboard/ebooks", post(admin::create_ebook))
        .route("/dashboard/ebooks/update", post(admin::update_ebook))
        .route("/dashboard/ebooks/delete", post(admin::delete_ebook))
        .route("/dashboard/page-content", post(admin::update_page_content))
        .route("/dashboard/promote", post(admin::promote_self))
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(middleware::from_fn_with_state(state.clone(), auth::gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use ebookdes_catalog::{CatalogStore, testing::MemoryStore};
    use ebookdes_core::UserId;
    use ebookdes_platform_access::{
        IdentityProviderConfig, User,
        testing::{FakeIdentityProvider, TEST_SECRET, mint_access_token},
    };
    use tower::ServiceExt;

    use crate::config::SessionConfig;

    struct Harness {
        provider: Arc<FakeIdentityProvider>,
        store: Arc<MemoryStore>,
        app: Router,
    }

    impl Harness {
        fn new() -> Self {
            let provider = Arc::new(FakeIdentityProvider::new());
            let store = Arc::new(MemoryStore::new());
            let auth_config = IdentityProviderConfig::new(
                "https://id.test".to_string(),
                "anon".to_string(),
                TEST_SECRET.to_string(),
                "http://localhost:3000".to_string(),
            );
            let state = Arc::new(AppState::new(
                auth_config,
                SessionConfig::default(),
                provider.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ));
            Self {
                provider,
                store,
                app: router(state, "public"),
            }
        }

        fn reader(&self) -> User {
            User::new(UserId::new()).with_email("reader@example.com")
        }

        fn admin(&self) -> User {
            let user = User::new(UserId::new()).with_email("admin@example.com");
            self.store.set_role(user.id(), "admin");
            user
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.app.clone().oneshot(request).await.expect("response")
        }
    }

    fn session_cookie(user: &User) -> String {
        format!(
            "sb-access-token={}; sb-refresh-token=r",
            mint_access_token(TEST_SECRET, user, 3600)
        )
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn json_post(uri: &str, cookie: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn protected_path_without_session_redirects_to_sign_in() {
        let h = Harness::new();
        for path in ["/dashboard", "/read/abc", "/dashboard/ebooks"] {
            let response = h.send(get(path, None)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&response), "/sign-in");
        }
    }

    #[tokio::test]
    async fn similar_prefix_is_not_protected() {
        let h = Harness::new();
        let response = h.send(get("/reader", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_refresh_on_auth_page_clears_cookies_without_redirect() {
        let h = Harness::new();
        let expired = mint_access_token(TEST_SECRET, &h.reader(), -120);
        let cookie = format!(
            "sb-access-token={expired}; sb-refresh-token=gone; supabase-auth-token=old"
        );
        let response = h.send(get("/sign-in", Some(&cookie))).await;

        assert_eq!(response.status(), StatusCode::OK);
        let cleared = set_cookies(&response);
        for name in ["sb-access-token", "sb-refresh-token", "supabase-auth-token"] {
            assert!(
                cleared
                    .iter()
                    .any(|c| c.starts_with(&format!("{name}=")) && c.contains("Max-Age=0")),
                "{name} not cleared: {cleared:?}"
            );
        }
    }

    #[tokio::test]
    async fn invalid_refresh_on_protected_page_redirects_and_clears() {
        let h = Harness::new();
        let expired = mint_access_token(TEST_SECRET, &h.reader(), -120);
        let cookie = format!("sb-access-token={expired}; sb-refresh-token=gone");
        let response = h.send(get("/dashboard", Some(&cookie))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/sign-in");
        assert_eq!(set_cookies(&response).len(), 3);
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_once_and_written_back() {
        let h = Harness::new();
        let reader = h.reader();
        h.provider.allow_refresh("r1", &reader);
        let expired = mint_access_token(TEST_SECRET, &reader, -120);
        let cookie = format!("sb-access-token={expired}; sb-refresh-token=r1");

        let response = h.send(get("/dashboard", Some(&cookie))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.provider.refresh_calls(), 1);
        let written = set_cookies(&response);
        assert!(
            written
                .iter()
                .any(|c| c.starts_with("sb-access-token=") && !c.contains(&expired))
        );
        let body = json_body(response).await;
        assert_eq!(body["user"]["id"], reader.id().to_string());
    }

    #[tokio::test]
    async fn non_admin_create_is_denied_and_writes_nothing() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        let response = h
            .send(form_post(
                "/dashboard/ebooks",
                &cookie,
                "title=Laskar+Pelangi&author=Andrea+Hirata&link=https%3A%2F%2Fcdn.example.com%2Flp.pdf",
            ))
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/dashboard?status=error&message=Akses+ditolak"));
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn admin_create_writes_once_and_is_listed() {
        let h = Harness::new();
        let cookie = session_cookie(&h.admin());
        let response = h
            .send(form_post(
                "/dashboard/ebooks",
                &cookie,
                "title=Laskar+Pelangi&author=Andrea+Hirata&link=https%3A%2F%2Fcdn.example.com%2Flp.pdf",
            ))
            .await;

        assert_eq!(
            location(&response),
            "/dashboard?status=success&message=eBook+berhasil+ditambahkan."
        );
        assert_eq!(h.store.writes(), 1);

        let body = json_body(h.send(get("/book", None)).await).await;
        assert_eq!(body["ebooks"][0]["title"], "Laskar Pelangi");
        assert_eq!(body["ebooks"][0]["author"], "Andrea Hirata");
        assert_eq!(
            body["ebooks"][0]["pdf_url"],
            "https://cdn.example.com/lp.pdf"
        );
    }

    #[tokio::test]
    async fn promote_self_is_always_denied() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        for _ in 0..2 {
            let response = h.send(form_post("/dashboard/promote", &cookie, "")).await;
            assert!(location(&response).starts_with("/dashboard?status=error&message=Fitur"));
        }
        assert_eq!(h.store.writes(), 0);
        assert_eq!(h.store.role_lookups(), 0);
    }

    #[tokio::test]
    async fn unknown_book_redirects_to_dashboard() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        let uri = format!("/read/{}", UserId::new());
        let response = h.send(get(&uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn progress_upserted_twice_keeps_last_page() {
        let h = Harness::new();
        let admin = h.admin();
        let book = h
            .store
            .insert_ebook(
                &ebookdes_catalog::NewEbook {
                    title: "Bumi Manusia".to_string(),
                    author: "Pramoedya Ananta Toer".to_string(),
                    description: None,
                    genre: None,
                    cover_image_url: None,
                    pdf_url: "https://cdn.example.com/bm.pdf".to_string(),
                },
                admin.id(),
            )
            .await
            .expect("insert");
        let reader = h.reader();
        let cookie = session_cookie(&reader);
        let uri = format!("/read/{}/progress", book.id);

        for page in [3, 7] {
            let response = h
                .send(json_post(
                    &uri,
                    &cookie,
                    serde_json::json!({ "currentPage": page, "totalPages": 10 }),
                ))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let entries = h.store.progress_for_user(reader.id()).await.expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].progress.current_page, 7);

        let body = json_body(h.send(get(&format!("/read/{}", book.id), Some(&cookie))).await).await;
        assert_eq!(body["progress"]["current_page"], 7);
        assert_eq!(body["percent"], 70);
    }

    #[tokio::test]
    async fn progress_for_anonymous_caller_is_redirected_by_gate() {
        let h = Harness::new();
        let response = h
            .send(
                Request::post(format!("/read/{}/progress", UserId::new()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn password_sign_in_sets_cookies_and_mirrors_profile() {
        let h = Harness::new();
        let reader = h.reader();
        h.provider.add_account("reader@example.com", "rahasia123", &reader);

        let response = h
            .send(
                Request::post("/sign-in")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=reader%40example.com&password=rahasia123"))
                    .expect("request"),
            )
            .await;

        assert_eq!(location(&response), "/dashboard");
        let written = set_cookies(&response);
        assert!(written.iter().any(|c| c.starts_with("sb-access-token=")));
        assert!(written.iter().any(|c| c.starts_with("sb-refresh-token=")));
        assert!(h.store.profile(reader.id()).is_some());
    }

    #[tokio::test]
    async fn wrong_password_redirects_with_message() {
        let h = Harness::new();
        let response = h
            .send(
                Request::post("/sign-in")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=nobody%40example.com&password=x"))
                    .expect("request"),
            )
            .await;
        assert_eq!(
            location(&response),
            "/sign-in?status=error&message=Gagal+masuk.+Cek+email%2Fpassword."
        );
    }

    #[tokio::test]
    async fn oauth_error_maps_to_localized_message() {
        let h = Harness::new();
        let response = h
            .send(get("/auth/callback?error=access_denied", None))
            .await;
        assert_eq!(
            location(&response),
            "/sign-in?error=Akses+ditolak.+Silakan+coba+lagi."
        );
    }

    #[tokio::test]
    async fn oauth_callback_exchanges_code_and_follows_next() {
        let h = Harness::new();
        let reader = h.reader();
        h.provider.allow_oauth_code("c1", &reader);
        let cookie = "ebookdes-pkce-verifier=v1; ebookdes-auth-next=%2Fread%2Fx";

        let response = h
            .send(get("/auth/callback?code=c1&next=/read/x", Some(cookie)))
            .await;

        assert_eq!(location(&response), "/read/x");
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("sb-access-token="))
        );
        assert!(h.store.profile(reader.id()).is_some());
    }

    #[tokio::test]
    async fn oauth_exchange_with_disabled_provider_reports_configuration() {
        let h = Harness::new();
        h.provider.disable_oauth();
        let response = h
            .send(get("/api/auth/callback?code=c1", Some("ebookdes-pkce-verifier=v1")))
            .await;
        assert!(location(&response).starts_with("/sign-in?error=Google+Sign-In+belum"));
    }

    #[tokio::test]
    async fn off_site_next_falls_back_to_dashboard() {
        let h = Harness::new();
        let reader = h.reader();
        h.provider.allow_oauth_code("c2", &reader);
        let response = h
            .send(get(
                "/auth/callback?code=c2&next=https://evil.example",
                Some("ebookdes-pkce-verifier=v1"),
            ))
            .await;
        assert_eq!(location(&response), "/dashboard");
    }

    #[tokio::test]
    async fn google_start_sets_verifier_cookie() {
        let h = Harness::new();
        let response = h.send(get("/auth/google?next=/read/x", None)).await;
        assert!(location(&response).starts_with("https://id.test/auth/v1/authorize"));
        let written = set_cookies(&response);
        assert!(written.iter().any(|c| c.starts_with("ebookdes-pkce-verifier=")));
        assert!(written.iter().any(|c| c.starts_with("ebookdes-auth-next=")));
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        let response = h.send(form_post("/sign-out", &cookie, "")).await;
        assert_eq!(location(&response), "/sign-in");
        assert_eq!(h.provider.sign_out_calls(), 1);
        assert!(
            set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("sb-access-token=") && c.contains("Max-Age=0"))
        );
    }

    #[tokio::test]
    async fn sign_out_by_get_is_refused() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        let response = h.send(get("/sign-out", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(h.provider.sign_out_calls(), 0);
        assert!(
            !set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("sb-access-token="))
        );
    }

    #[tokio::test]
    async fn reset_password_checks_confirmation() {
        let h = Harness::new();
        let cookie = session_cookie(&h.reader());
        let response = h
            .send(form_post(
                "/dashboard/reset-password",
                &cookie,
                "password=rahasia123&confirmPassword=lain",
            ))
            .await;
        assert_eq!(
            location(&response),
            "/dashboard/reset-password?status=error&message=Password+tidak+cocok."
        );
        assert_eq!(h.provider.password_updates(), 0);

        let response = h
            .send(form_post(
                "/dashboard/reset-password",
                &cookie,
                "password=rahasia123&confirmPassword=rahasia123",
            ))
            .await;
        assert!(location(&response).contains("status=success"));
        assert_eq!(h.provider.password_updates(), 1);
    }

    #[tokio::test]
    async fn me_is_null_when_signed_out_and_reports_role() {
        let h = Harness::new();
        let body = json_body(h.send(get("/api/me", None)).await).await;
        assert!(body.is_null());

        let admin = h.admin();
        let body = json_body(h.send(get("/api/me", Some(&session_cookie(&admin)))).await).await;
        assert_eq!(body["role"], "admin");
        assert_eq!(body["is_admin"], true);
    }

    #[tokio::test]
    async fn homepage_falls_back_to_default_content() {
        let h = Harness::new();
        let body = json_body(h.send(get("/", None)).await).await;
        assert_eq!(body["page"]["content"]["app_name"], "EbookDes");
        assert!(body["user"].is_null());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let h = Harness::new();
        let response = h.send(get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
