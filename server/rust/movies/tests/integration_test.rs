/// movies-server integration tests
/// インメモリリポジトリと実際のトークン検証を使って REST API のエンドツーエンド動作を検証する。
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use movies_auth::{ApiKeySettings, AuthState, AuthorizationEngine, TokenVerifier};
use movies_cache::{CacheConsistencyCoordinator, InMemoryOutputCacheStore};
use movies_server::adapter::handler::{router, AppState};
use movies_server::adapter::repository::InMemoryCatalogRepository;
use movies_server::infrastructure::cache::OutputCache;
use movies_telemetry::Metrics;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SIGNING_KEY: &[u8] = b"integration-test-signing-key";
const ISSUER: &str = "https://id.movies.test";
const AUDIENCE: &str = "https://movies.test";
const API_KEY: &str = "integration-api-key";
const SERVICE_USER: &str = "d8566de3-b1a6-4a9b-b842-8e3887a82e42";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// 既定の Claims に `extra` を上書きしたトークンを生成する。
fn token(extra: Value) -> String {
    let mut claims = json!({
        "sub": "nick@example.com",
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": now() + 3600,
        "userid": Uuid::new_v4().to_string(),
    });
    if let (Some(base), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap()
}

fn trusted_token() -> String {
    token(json!({ "trusted_member": true }))
}

fn make_app() -> Router {
    let metrics = Arc::new(Metrics::new("movies-server-test").unwrap());
    let verifier = Arc::new(TokenVerifier::new(SIGNING_KEY, ISSUER, AUDIENCE));
    let engine = Arc::new(AuthorizationEngine::with_default_policies(ApiKeySettings {
        header_name: "x-api-key".into(),
        secret: SecretString::new(API_KEY.into()),
        service_user_id: SERVICE_USER.into(),
    }));
    let coordinator = Arc::new(CacheConsistencyCoordinator::new(Arc::new(
        InMemoryOutputCacheStore::new(),
    )));
    let output_cache = Arc::new(OutputCache::with_metrics(coordinator, metrics.clone()));
    let catalog = Arc::new(InMemoryCatalogRepository::new());

    router(AppState::new(
        catalog.clone(),
        catalog,
        output_cache,
        metrics,
        AuthState { verifier, engine },
    ))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let x_cache = resp
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, x_cache, body)
}

fn json_req(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(t) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", t));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_req(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(t) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", t));
    }
    builder.body(Body::empty()).unwrap()
}

async fn create_movie(app: &Router, title: &str, year: i32) -> Value {
    let (status, _, body) = send(
        app,
        json_req(
            "POST",
            "/api/movies",
            Some(&trusted_token()),
            json!({ "title": title, "yearOfRelease": year, "genres": ["Drama"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

// ---------------------------------------------------------------------------
// health / metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_healthz_and_readyz() {
    let app = make_app();
    let (status, _, body) = send(&app, get_req("/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = send(&app, get_req("/readyz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_metrics_exposes_authorization_decisions() {
    let app = make_app();
    create_movie(&app, "Heat", 1995).await;

    let resp = app.clone().oneshot(get_req("/metrics", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("authorization_decisions_total"));
}

// ---------------------------------------------------------------------------
// policies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_anonymous_is_unauthorized() {
    let app = make_app();
    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/movies",
            None,
            json!({ "title": "Heat", "yearOfRelease": 1995, "genres": ["Crime"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MOVIES_AUTH_UNAUTHENTICATED");
}

#[tokio::test]
async fn test_create_without_trusted_claim_is_forbidden() {
    let app = make_app();
    let (status, _, _) = send(
        &app,
        json_req(
            "POST",
            "/api/movies",
            Some(&token(json!({}))),
            json!({ "title": "Heat", "yearOfRelease": 1995, "genres": ["Crime"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_returns_location_and_body() {
    let app = make_app();
    let resp = app
        .clone()
        .oneshot(json_req(
            "POST",
            "/api/movies",
            Some(&token(json!({ "admin": true }))),
            json!({ "title": "Nick the Greek", "yearOfRelease": 2023, "genres": ["Comedy"] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    assert!(location.starts_with("/api/movies/"));

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["slug"], "nick-the-greek-2023");
    assert_eq!(location, format!("/api/movies/{}", body["id"].as_str().unwrap()));
}

#[tokio::test]
async fn test_delete_requires_admin_or_api_key() {
    let app = make_app();
    let created = create_movie(&app, "Heat", 1995).await;
    let uri = format!("/api/movies/{}", created["id"].as_str().unwrap());

    // trusted member は削除できない
    let (status, _, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("authorization", format!("Bearer {}", trusted_token()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 誤った API キー
    let (status, _, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // 正しい API キーで昇格
    let (status, _, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .header("x-api-key", API_KEY)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (status, _, body) = send(&app, get_req(&uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "MOVIES_NOT_FOUND");
}

#[tokio::test]
async fn test_invalid_bearer_is_rejected() {
    let app = make_app();
    let (status, _, body) = send(&app, get_req("/api/movies", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "MOVIES_AUTH_INVALID_TOKEN");
}

// ---------------------------------------------------------------------------
// output cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_anonymous_list_is_cached_until_write() {
    let app = make_app();
    create_movie(&app, "Heat", 1995).await;

    let (status, cache, body) = send(&app, get_req("/api/movies", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["total"], 1);

    // 既定値を明示しても同じキーになる
    let (_, cache, _) = send(&app, get_req("/api/movies?page=1&pageSize=10", None)).await;
    assert_eq!(cache.as_deref(), Some("HIT"));

    create_movie(&app, "Ronin", 1998).await;

    let (_, cache, body) = send(&app, get_req("/api/movies", None)).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_title_with_query_separators_gets_its_own_cache_entry() {
    let app = make_app();
    create_movie(&app, "Xanadu", 1980).await;

    // タイトルに区切り文字を含むクエリを先にキャッシュさせる
    let (status, cache, body) =
        send(&app, get_req("/api/movies?title=x%26year%3D1980", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["total"], 0);

    let (status, cache, body) = send(&app, get_req("/api/movies?title=x&year=1980", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["slug"], "xanadu-1980");
}

#[tokio::test]
async fn test_authenticated_reads_bypass_cache() {
    let app = make_app();
    create_movie(&app, "Heat", 1995).await;

    let (status, cache, _) = send(&app, get_req("/api/movies", Some(&token(json!({}))))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cache.is_none());
}

#[tokio::test]
async fn test_single_movie_by_slug_is_cached_and_invalidated_by_update() {
    let app = make_app();
    let created = create_movie(&app, "Heat", 1995).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, cache, body) = send(&app, get_req("/api/movies/heat-1995", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["links"].as_array().map(Vec::len), Some(3));

    let (_, cache, _) = send(&app, get_req("/api/movies/heat-1995", None)).await;
    assert_eq!(cache.as_deref(), Some("HIT"));

    let (status, _, _) = send(
        &app,
        json_req(
            "PUT",
            &format!("/api/movies/{}", id),
            Some(&trusted_token()),
            json!({ "title": "Heat", "yearOfRelease": 1995, "genres": ["Crime", "Thriller"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, cache, body) = send(&app, get_req("/api/movies/heat-1995", None)).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["genres"], json!(["Crime", "Thriller"]));
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let app = make_app();
    let (status, cache, _) = send(&app, get_req("/api/movies/missing-2000", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(cache.is_none());

    create_movie(&app, "Missing", 2000).await;
    let (status, _, _) = send(&app, get_req("/api/movies/missing-2000", None)).await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_validation_failure_details() {
    let app = make_app();
    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/movies",
            Some(&trusted_token()),
            json!({ "title": "", "yearOfRelease": 1995, "genres": [] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOVIES_VALIDATION_FAILED");
    assert_eq!(body["error"]["details"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let app = make_app();
    create_movie(&app, "Heat", 1995).await;
    let (status, _, body) = send(
        &app,
        json_req(
            "POST",
            "/api/movies",
            Some(&trusted_token()),
            json!({ "title": "Heat", "yearOfRelease": 1995, "genres": ["Crime"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "MOVIES_SLUG_CONFLICT");
}

#[tokio::test]
async fn test_invalid_sort_is_bad_request() {
    let app = make_app();
    let (status, cache, _) = send(&app, get_req("/api/movies?sortBy=rating", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(cache.is_none());
}

#[tokio::test]
async fn test_batch_create() {
    let app = make_app();
    let (status, _, _) = send(
        &app,
        json_req(
            "POST",
            "/api/movies/batch",
            Some(&trusted_token()),
            json!([
                { "title": "Heat", "yearOfRelease": 1995, "genres": ["Crime"] },
                { "title": "Ronin", "yearOfRelease": 1998, "genres": ["Action"] }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, _, body) = send(&app, get_req("/api/movies?sortBy=-title", None)).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["title"], "Ronin");
}

// ---------------------------------------------------------------------------
// ratings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_rating_flow() {
    let app = make_app();
    let created = create_movie(&app, "Heat", 1995).await;
    let id = created["id"].as_str().unwrap().to_string();
    let user = Uuid::new_v4().to_string();
    let user_token = token(json!({ "userid": user }));
    let ratings_uri = format!("/api/movies/{}/ratings", id);

    // 匿名の一覧をキャッシュしておく
    let (_, cache, _) = send(&app, get_req("/api/movies", None)).await;
    assert_eq!(cache.as_deref(), Some("MISS"));

    let (status, _, _) = send(
        &app,
        json_req("PUT", &ratings_uri, Some(&user_token), json!({ "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 平均評価が変わるので一覧のキャッシュは無効化される
    let (_, cache, body) = send(&app, get_req("/api/movies", None)).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(body["items"][0]["rating"], json!(4.0));
    assert!(body["items"][0]["userRating"].is_null());

    let (_, _, body) = send(&app, get_req(&format!("/api/movies/{}", id), Some(&user_token))).await;
    assert_eq!(body["userRating"], 4);

    let (status, _, body) = send(&app, get_req("/api/ratings/me", Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["slug"], "heat-1995");
    assert_eq!(body["items"][0]["rating"], 4);

    let delete = Request::builder()
        .method("DELETE")
        .uri(&ratings_uri)
        .header("authorization", format!("Bearer {}", user_token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&app, get_req("/api/ratings/me", Some(&user_token))).await;
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn test_rating_out_of_range() {
    let app = make_app();
    let created = create_movie(&app, "Heat", 1995).await;
    let uri = format!("/api/movies/{}/ratings", created["id"].as_str().unwrap());

    let (status, _, body) = send(
        &app,
        json_req("PUT", &uri, Some(&token(json!({}))), json!({ "rating": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MOVIES_RATING_VALIDATION_FAILED");
}

#[tokio::test]
async fn test_rating_unknown_movie_is_not_found() {
    let app = make_app();
    let uri = format!("/api/movies/{}/ratings", Uuid::new_v4());
    let (status, _, body) = send(
        &app,
        json_req("PUT", &uri, Some(&token(json!({}))), json!({ "rating": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "MOVIES_RATING_NOT_FOUND");
}

#[tokio::test]
async fn test_ratings_require_authentication() {
    let app = make_app();
    let (status, _, _) = send(&app, get_req("/api/ratings/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ratings_without_user_id_claim() {
    let app = make_app();
    let (status, _, body) = send(
        &app,
        get_req("/api/ratings/me", Some(&token(json!({ "userid": null })))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MOVIES_RATING_MISSING_USER");
}

#[test]
fn test_healthz_on_blocking_runtime() {
    let app = make_app();
    let (status, _, _) = tokio_test::block_on(send(&app, get_req("/healthz", None)));
    assert_eq!(status, StatusCode::OK);
}
