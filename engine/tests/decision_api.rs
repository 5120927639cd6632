use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::Request,
};
use hyper::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;
use trip_engine::{
    AppState, config::EngineConfig, create_router, models::FallbackAllocationResponse,
    service::MockTripService,
};

fn test_app() -> axum::Router {
    let service = Arc::new(MockTripService::new());
    create_router(AppState::new(EngineConfig::default(), service))
}

fn post(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn transit_step(with_polyline: bool) -> Value {
    let mut step = json!({
        "instruction": "Take bus 95",
        "distance": 1800.0,
        "duration": 420,
        "travel_mode": "TRANSIT",
        "transit_details": {
            "line_name": "95",
            "departure_stop": "Kent Ridge",
            "arrival_stop": "Clementi",
            "num_stops": 4,
            "vehicle_type": "BUS"
        }
    });
    if with_polyline {
        step["polyline_points"] = json!([
            {"lng": 103.7764, "lat": 1.2966},
            {"lng": 103.7810, "lat": 1.2990}
        ]);
    }
    step
}

#[tokio::test]
async fn health_is_ok() {
    let response = test_app().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn analysis_reports_transit_with_polylines() {
    let payload = json!({
        "route_points": [{"lng": 103.7764, "lat": 1.2966}],
        "route_steps": [transit_step(true)]
    });
    let response = test_app()
        .oneshot(post("/api/route/analysis", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["analysis"]["has_transit_steps"], true);
    assert_eq!(body["analysis"]["has_step_polylines"], true);
    assert_eq!(body["tracking_mode"]["has_transit_with_polylines"], true);
    assert_eq!(body["tracking_mode"]["has_transit_fallback"], false);
}

#[tokio::test]
async fn render_plan_falls_back_without_step_polylines() {
    let points: Vec<Value> = (0..20)
        .map(|i| json!({"lng": 103.77 + i as f64 * 0.0005, "lat": 1.29}))
        .collect();
    let mut walk = transit_step(false);
    walk["travel_mode"] = json!("WALKING");
    walk["distance"] = json!(600.0);
    walk["transit_details"] = Value::Null;

    let payload = json!({
        "route_points": points,
        "route_steps": [walk, transit_step(false)]
    });
    let response = test_app()
        .oneshot(post("/api/route/render-plan", payload))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["strategy"], "proportional_fallback");
    let segments = body["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["color"], "walking");
    assert_eq!(segments[0]["dashed"], true);
    assert_eq!(segments[1]["color"], "bus");
}

#[tokio::test]
async fn fallback_allocation_covers_every_point() {
    let payload = json!({"total_points": 100, "step_distances": [500.0, 300.0, 200.0]});
    let response = test_app()
        .oneshot(post("/api/fallback/allocate", payload))
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: FallbackAllocationResponse = serde_json::from_slice(&bytes).unwrap();
    let ranges = body.ranges.unwrap();
    assert_eq!((ranges[0].start, ranges[0].end), (0, 50));
    assert_eq!((ranges[1].start, ranges[1].end), (50, 80));
    assert_eq!((ranges[2].start, ranges[2].end), (80, 100));

    let degenerate = json!({"total_points": 100, "step_distances": [0.0, 0.0]});
    let response = test_app()
        .oneshot(post("/api/fallback/allocate", degenerate))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["ranges"], Value::Null);
}

#[tokio::test]
async fn completion_without_segments_uses_selection() {
    let payload = json!({
        "segments": [],
        "ml_confidence": 0.9,
        "selected_mode": "walking",
        "distance_meters": 1000.0
    });
    let response = test_app()
        .oneshot(post("/api/trip/completion", payload))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["completion"]["detected_mode"], Value::Null);
    assert_eq!(body["completion"]["user_selected_mode"], "walk");
    assert_eq!(body["completion"]["is_green_trip"], true);
    assert_eq!(body["completion"]["carbon_saved_grams"], 150);
    assert_eq!(body["completion"]["ml_confidence"], Value::Null);
    assert_eq!(body["breakdown"], json!([]));
}

#[tokio::test]
async fn milestone_check_skips_reached_values() {
    let first = json!({"distance_meters": 1500.0, "milestones": [1000.0, 2000.0, 3000.0]});
    let body = json_body(
        test_app()
            .oneshot(post("/api/milestone/check", first))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["milestone"], 1000.0);
    assert_eq!(body["message"], "Congrats! You've traveled 1000 m");

    let again = json!({
        "distance_meters": 1500.0,
        "milestones": [1000.0, 2000.0, 3000.0],
        "reached": [1000.0]
    });
    let body = json_body(
        test_app()
            .oneshot(post("/api/milestone/check", again))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["milestone"], Value::Null);
}

#[tokio::test]
async fn trip_session_over_http() {
    let app = test_app();

    let missing_origin = app
        .clone()
        .oneshot(post("/api/trip/start", json!({})))
        .await
        .unwrap();
    assert_eq!(missing_origin.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(missing_origin).await["message"],
        "Unable to get origin location"
    );

    let started = app
        .clone()
        .oneshot(post(
            "/api/trip/start",
            json!({"origin": {"lng": 103.7764, "lat": 1.2966}, "selected_mode": "cycling"}),
        ))
        .await
        .unwrap();
    assert_eq!(started.status(), StatusCode::OK);
    assert_eq!(json_body(started).await["trip_id"], "MOCK_TRIP_1");

    let state = json_body(app.clone().oneshot(get("/api/trip/state")).await.unwrap()).await;
    assert_eq!(state["state"]["state"], "tracking");
    assert_eq!(state["ui"]["button_text"], "stop_tracking");

    let sample = app
        .clone()
        .oneshot(post(
            "/api/trip/mode",
            json!({"mode": "cycling", "confidence": 0.8, "timestamp_ms": 1000}),
        ))
        .await
        .unwrap();
    assert_eq!(sample.status(), StatusCode::NO_CONTENT);

    let stopped = app
        .clone()
        .oneshot(post(
            "/api/trip/stop",
            json!({"end_point": {"lng": 103.7810, "lat": 1.2990}, "timestamp_ms": 61000}),
        ))
        .await
        .unwrap();
    assert_eq!(stopped.status(), StatusCode::OK);
    let outcome = json_body(stopped).await;
    assert_eq!(outcome["completion"]["detected_mode"], "bike");
    assert_eq!(outcome["sync"]["status"], "saved");

    let stop_again = app
        .clone()
        .oneshot(post("/api/trip/stop", json!({})))
        .await
        .unwrap();
    assert_eq!(stop_again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn untimed_samples_and_stop_share_the_server_clock() {
    let app = test_app();
    app.clone()
        .oneshot(post(
            "/api/trip/start",
            json!({"origin": {"lng": 103.7764, "lat": 1.2966}, "selected_mode": "walking"}),
        ))
        .await
        .unwrap();

    let sample = app
        .clone()
        .oneshot(post(
            "/api/trip/mode",
            json!({"mode": "bus", "confidence": 0.7}),
        ))
        .await
        .unwrap();
    assert_eq!(sample.status(), StatusCode::NO_CONTENT);

    let stopped = app
        .clone()
        .oneshot(post(
            "/api/trip/stop",
            json!({"end_point": {"lng": 103.7810, "lat": 1.2990}}),
        ))
        .await
        .unwrap();
    assert_eq!(stopped.status(), StatusCode::OK);
    let outcome = json_body(stopped).await;
    assert_eq!(outcome["completion"]["detected_mode"], "bus");
    let seconds = outcome["payload"]["transport_modes"][0]["sub_duration"]
        .as_i64()
        .unwrap();
    assert!((0..60).contains(&seconds));
}

#[tokio::test]
async fn plan_requires_destination() {
    let response = test_app()
        .oneshot(post(
            "/api/route/plan",
            json!({"origin": {"lng": 103.7764, "lat": 1.2966}, "preference": "balanced"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Please set a destination first"
    );
}
