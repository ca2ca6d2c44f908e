pub mod api;
pub mod redirect;
pub mod web;

#[cfg(test)]
mod tests {
    use crate::{
        config::{AppConfig, StatsFailurePolicy},
        db,
        service::{testing::StubProbe, UrlService},
        AppState,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        pool: SqlitePool,
    }

    async fn app_with(probe: Arc<StubProbe>, policy: StatsFailurePolicy) -> TestApp {
        let pool = db::memory_pool().await;
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.base_url = "https://sn.ip".into();
        config.stats_failure_policy = policy;

        let state = Arc::new(AppState {
            config,
            urls: UrlService::new(pool.clone(), probe),
        });

        TestApp {
            router: crate::router(state),
            pool,
        }
    }

    async fn app() -> TestApp {
        app_with(StubProbe::reachable(), StatsFailurePolicy::Redirect).await
    }

    impl TestApp {
        async fn send(&self, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
            let res = self.router.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let headers = res.headers().clone();
            let body = to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec();
            (status, headers, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn create_json(&self, url: &str) -> (StatusCode, Value) {
            let req = Request::post("/api/urls")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::json!({ "url": url }).to_string()))
                .unwrap();
            let (status, _, body) = self.send(req).await;
            (status, serde_json::from_slice(&body).unwrap())
        }

        async fn visit_count(&self, id: i64) -> i64 {
            db::find_by_id(&self.pool, id).await.unwrap().unwrap().visit_count
        }
    }

    fn location(headers: &axum::http::HeaderMap) -> &str {
        headers.get(header::LOCATION).unwrap().to_str().unwrap()
    }

    fn set_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|c| c.starts_with(&format!("{name}=")))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, _, _) = app().await.get("/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn api_create_returns_created_mapping() {
        let app = app().await;
        let (status, body) = app.create_json("example.com").await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["original"], "https://example.com");
        assert_eq!(body["data"]["visitCount"], 0);
        assert_eq!(body["data"]["short"].as_str().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn api_create_reports_unreachable_url() {
        let app = app_with(
            StubProbe::rejecting("URL is invalid or unreachable"),
            StatsFailurePolicy::Redirect,
        )
        .await;
        let (status, body) = app.create_json("nowhere.invalid").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "URL is invalid or unreachable");
    }

    #[tokio::test]
    async fn api_list_and_delete_renumber() {
        let app = app().await;
        for i in 0..3 {
            app.create_json(&format!("example.com/{i}")).await;
        }

        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/urls/2")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = app.get("/api/urls").await;
        assert_eq!(status, StatusCode::OK);
        let list: Value = serde_json::from_slice(&body).unwrap();
        let ids: Vec<i64> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(list[1]["original"], "https://example.com/2");
    }

    #[tokio::test]
    async fn api_delete_unknown_id_is_404() {
        let app = app().await;
        let req = Request::builder()
            .method(Method::DELETE)
            .uri("/api/urls/42")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = app.send(req).await;
        let body: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn redirect_counts_visit_and_uses_307() {
        let app = app().await;
        let (_, body) = app.create_json("example.com/landing").await;
        let short = body["data"]["short"].as_str().unwrap().to_owned();

        let (status, headers, _) = app.get(&format!("/{short}")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&headers), "https://example.com/landing");
        assert_eq!(app.visit_count(1).await, 1);
    }

    #[tokio::test]
    async fn embedded_newline_is_stripped_before_storing_and_redirecting() {
        let app = app().await;
        let (status, body) = app.create_json("https://example.com\n/landing").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["original"], "https://example.com/landing");

        let short = body["data"]["short"].as_str().unwrap().to_owned();
        let (status, headers, _) = app.get(&format!("/{short}")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&headers), "https://example.com/landing");
    }

    #[tokio::test]
    async fn stored_url_unusable_as_header_is_a_500() {
        let app = app().await;
        let now = chrono::Utc::now().naive_utc();
        let mut conn = app.pool.acquire().await.unwrap();
        db::insert_mapping(&mut conn, 1, "https://example.com\n/x", "badurl", now)
            .await
            .unwrap();
        drop(conn);

        let (status, headers, _) = app.get("/badurl").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(headers.get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn unknown_code_renders_not_found_page() {
        let app = app().await;
        let (status, _, body) = app.get("/nope42").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(String::from_utf8(body).unwrap().contains("nope42"));
    }

    async fn break_visit_updates(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TRIGGER block_visits BEFORE UPDATE OF visit_count ON urls
             BEGIN SELECT RAISE(ABORT, 'stats offline'); END",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn lost_visit_still_redirects_under_redirect_policy() {
        let app = app().await;
        let (_, body) = app.create_json("example.com").await;
        let short = body["data"]["short"].as_str().unwrap().to_owned();
        break_visit_updates(&app.pool).await;

        let (status, headers, _) = app.get(&format!("/{short}")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&headers), "https://example.com");
        assert_eq!(app.visit_count(1).await, 0);
    }

    #[tokio::test]
    async fn lost_visit_fails_under_fail_policy() {
        let app = app_with(StubProbe::reachable(), StatsFailurePolicy::Fail).await;
        let (_, body) = app.create_json("example.com").await;
        let short = body["data"]["short"].as_str().unwrap().to_owned();
        break_visit_updates(&app.pool).await;

        let (status, headers, _) = app.get(&format!("/{short}")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(headers.get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn form_create_flashes_short_link_and_dashboard_lists_it() {
        let app = app().await;
        let req = Request::post("/urls")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("url=example.com"))
            .unwrap();
        let (status, headers, _) = app.send(req).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&headers), "/");
        assert!(set_cookie(&headers, "flash_success").is_some());
        assert!(set_cookie(&headers, "last_short_url").is_some());

        let (status, _, body) = app.get("/").await;
        let html = String::from_utf8(body).unwrap();
        assert_eq!(status, StatusCode::OK);
        // askama escapes '/', so match on the host parts only.
        assert!(html.contains("example.com"));
        assert!(html.contains("sn.ip"));
        assert!(!html.contains("No URLs found."));
    }

    #[tokio::test]
    async fn dashboard_shows_last_short_url_as_a_link_once() {
        let app = app().await;
        let (_, body) = app.create_json("example.com").await;
        let short = body["data"]["short"].as_str().unwrap().to_owned();

        let req = Request::get("/")
            .header(header::COOKIE, format!("last_short_url=https://sn.ip/{short}"))
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = app.send(req).await;
        let html = String::from_utf8(body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Your short URL is: <a href="), "{html}");
        // Once in the dashboard row's link, once more in the banner.
        assert_eq!(html.matches(&format!(">{short}</a>")).count(), 1);
        assert!(html.matches(short.as_str()).count() >= 4);
        let removal = set_cookie(&headers, "last_short_url").unwrap();
        assert!(removal.contains("Max-Age=0"), "{removal}");
    }

    #[tokio::test]
    async fn form_delete_of_unknown_id_flashes_failure() {
        let app = app().await;
        let req = Request::post("/urls/9/delete").body(Body::empty()).unwrap();
        let (status, headers, _) = app.send(req).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(set_cookie(&headers, "flash_error").is_some());
        assert!(set_cookie(&headers, "last_short_url").is_none());
    }
}
