//! Behavior tests for cross-cutting gateway concerns: routing, limits, CORS, health.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use farmai_tests::*;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn when_route_is_unknown_then_not_found_envelope_is_returned() {
    // Given: A gateway
    let (app, _) = gateway(FixtureHttpClient::new());

    // When: An unknown path is requested
    let (status, body) = send(&app, get("/api/harvest/schedule?field=7")).await;

    // Then: The error names the method and path
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({"success": false, "error": "Cannot GET /api/harvest/schedule?field=7"})
    );
}

#[tokio::test]
async fn when_method_is_wrong_then_not_found_envelope_is_returned() {
    // Given: A gateway
    let (app, client) = gateway(FixtureHttpClient::new());

    // When: Known paths are hit with the wrong method
    let (get_status, get_body) = send(&app, get("/api/predictions/yield")).await;
    let (post_status, post_body) =
        send(&app, post_json("/api/weather/current/1/2", &json!({}))).await;

    // Then: Both answer like an unknown route
    assert_eq!(get_status, StatusCode::NOT_FOUND);
    assert_eq!(
        get_body,
        json!({"success": false, "error": "Cannot GET /api/predictions/yield"})
    );
    assert_eq!(post_status, StatusCode::NOT_FOUND);
    assert_eq!(
        post_body,
        json!({"success": false, "error": "Cannot POST /api/weather/current/1/2"})
    );
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn when_client_exceeds_budget_then_requests_are_throttled() {
    // Given: A budget of two requests per window
    let config = ServerConfig {
        rate_limit_max: 2,
        ..configured()
    };
    let (app, client) = gateway_with(FixtureHttpClient::new(), config);

    // When: The same client sends three API requests
    let (first, _) = send(&app, get("/api/weather/current/91/0")).await;
    let (second, _) = send(&app, get("/api/weather/current/91/0")).await;
    let (third, body) = send(&app, get("/api/weather/current/51.5/-0.09")).await;

    // Then: The third is refused before reaching any provider
    assert_eq!(first, StatusCode::BAD_REQUEST);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(third, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "Too many requests from this IP, please try again later."
    );
    assert_eq!(client.request_count(), 0);

    // And: Health checks are not limited
    let (health, _) = send(&app, get("/health")).await;
    assert_eq!(health, StatusCode::OK);
}

#[tokio::test]
async fn when_health_is_checked_then_cache_activity_is_reported() {
    // Given: One cached weather lookup
    let (app, _) = gateway(FixtureHttpClient::new().respond(
        OWM_CURRENT,
        HttpResponse::ok_json(
            r#"{"weather":[{"description":"clear sky"}],"main":{"temp":20,"humidity":40},"name":"Rome"}"#,
        ),
    ));
    let _ = send(&app, get("/api/weather/current/41.9/12.5")).await;
    let _ = send(&app, get("/api/weather/current/41.9/12.5")).await;

    // When: Health is requested
    let (status, body) = send(&app, get("/health")).await;

    // Then: Status, version and cache counters are reported
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["cache"]["keys"], 1);
    assert_eq!(body["cache"]["hits"], 1);
    assert!(body["uptimeSeconds"].as_f64().expect("uptime") >= 0.0);
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn when_frontend_preflights_then_its_origin_is_allowed() {
    // Given: The default frontend origin
    let (app, _) = gateway(FixtureHttpClient::new());

    // When: The browser sends a CORS preflight
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/predictions/yield")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("valid request");
    let response = app.oneshot(request).await.expect("router is infallible");

    // Then: The origin and credentials are allowed
    let headers = response.headers();
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

#[tokio::test]
async fn when_body_exceeds_limit_then_it_is_rejected() {
    // Given: A gateway and an oversized image
    let (app, client) = gateway(FixtureHttpClient::new());
    let image = "A".repeat(farmai_server::MAX_BODY_BYTES + 1);

    // When: It is submitted for detection
    let (status, body) = send(
        &app,
        post_json("/api/predictions/disease-detection", &json!({"imageBase64": image})),
    )
    .await;

    // Then: The body is refused before any provider call
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert_eq!(client.request_count(), 0);
}
