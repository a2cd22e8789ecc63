use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use order_dispatch::api::rest::router;
use order_dispatch::notify::push::LogNotifier;
use order_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Arc::new(LogNotifier)));
    (router(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_body(amount: f64, payment_mode: &str) -> Value {
    json!({
        "customerName": "Asha",
        "customerPhone": "9000000001",
        "items": [
            { "name": "20L can", "quantity": 2, "price": amount / 2.0 }
        ],
        "deliveryAddress": {
            "addressLine": "12 MG Road",
            "city": "Bengaluru",
            "latitude": 12.9716,
            "longitude": 77.5946
        },
        "totalAmount": amount,
        "paymentMode": payment_mode
    })
}

async fn create_order(app: &axum::Router, amount: f64, payment_mode: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/orders", order_body(amount, payment_mode)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_driver(app: &axum::Router, name: &str, phone: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({ "name": name, "phone": phone }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn claim(app: &axum::Router, order_id: &str, driver_id: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_id}/claim"),
            json!({ "driverId": driver_id }),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["connections"], 0);
    assert_eq!(body["tracking_subscribers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("connected_clients"));
    assert!(body.contains("tracking_subscribers"));
}

#[tokio::test]
async fn create_order_returns_pending_with_derived_payment_status() {
    let (app, _state) = setup();

    let order = create_order(&app, 500.0, "Cash").await;
    assert_eq!(order["deliveryStatus"], "Pending");
    assert_eq!(order["paymentStatus"], "Pending");
    assert!(order["orderId"].as_str().unwrap().starts_with("ORD-"));
    assert!(order["assignedDriver"].is_null());

    let prepaid = create_order(&app, 300.0, "Paid").await;
    assert_eq!(prepaid["paymentStatus"], "Completed");
}

#[tokio::test]
async fn create_order_with_no_items_returns_400() {
    let (app, _state) = setup();

    let mut body = order_body(500.0, "Cash");
    body["items"] = json!([]);

    let response = app
        .oneshot(json_request("POST", "/orders", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let (app, _state) = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/orders/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_claim_on_same_order_conflicts() {
    let (app, _state) = setup();

    let winner = create_driver(&app, "Ravi", "9876500001").await;
    let loser = create_driver(&app, "Sanjay", "9876500002").await;
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    let response = claim(&app, order_key, winner["id"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let claimed = body_json(response).await;
    assert_eq!(claimed["deliveryStatus"], "Assigned");
    assert_eq!(claimed["assignedDriver"]["id"], winner["id"]);
    assert_eq!(claimed["assignedDriver"]["name"], "Ravi");

    let response = claim(&app, order_key, loser["id"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error = body_json(response).await;
    assert_eq!(error["code"], "ORDER_ALREADY_ASSIGNED");

    // The loser moves on to a fresh order.
    let fresh = create_order(&app, 300.0, "Cash").await;
    let response = claim(&app, fresh["id"].as_str().unwrap(), loser["id"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn complete_stamps_delivery_and_appends_transaction() {
    let (app, state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    claim(&app, order_key, driver_id).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_key}/complete"),
            json!({
                "driverId": driver_id,
                "latitude": 12.9716,
                "longitude": 77.5946,
                "notes": "left at gate"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let delivered = body_json(response).await;
    assert_eq!(delivered["deliveryStatus"], "Delivered");
    assert_eq!(delivered["paymentStatus"], "Completed");
    assert_eq!(delivered["deliveredBy"], "Ravi");
    assert_eq!(delivered["deliveryLocation"]["latitude"], 12.9716);

    let response = app.clone().oneshot(get_request("/drivers")).await.unwrap();
    let drivers = body_json(response).await;
    assert_eq!(drivers[0]["totalDeliveries"], 1);
    assert_eq!(drivers[0]["completedDeliveries"], 1);

    let transactions = state.transactions.lock().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].amount, 500.0);
    assert_eq!(transactions[0].order_id, order["orderId"].as_str().unwrap());
}

#[tokio::test]
async fn complete_by_wrong_driver_is_forbidden() {
    let (app, _state) = setup();

    let owner = create_driver(&app, "Ravi", "9876500001").await;
    let imposter = create_driver(&app, "Sanjay", "9876500002").await;
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    claim(&app, order_key, owner["id"].as_str().unwrap()).await;

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_key}/complete"),
            json!({ "driverId": imposter["id"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error = body_json(response).await;
    assert_eq!(error["code"], "NOT_ASSIGNED_TO_CALLER");
}

#[tokio::test]
async fn cancelled_orders_reject_claims() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_key}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deliveryStatus"], "Cancelled");

    let response = claim(&app, order_key, driver["id"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    claim(&app, order_key, driver_id).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_key}/complete"),
            json!({ "driverId": driver_id }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_key}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_assign_and_unassign_round_trip() {
    let (app, _state) = setup();

    let first = create_driver(&app, "Ravi", "9876500001").await;
    let second = create_driver(&app, "Sanjay", "9876500002").await;
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_key}/assign"),
            json!({ "driverId": first["id"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assigned = body_json(response).await;
    assert_eq!(assigned["deliveryStatus"], "Assigned");
    assert_eq!(assigned["assignedDriver"]["id"], first["id"]);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_key}/unassign"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let released = body_json(response).await;
    assert_eq!(released["deliveryStatus"], "Pending");
    assert!(released["assignedDriver"].is_null());

    let response = claim(&app, order_key, second["id"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn open_orders_exclude_terminal_states() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();

    let open = create_order(&app, 100.0, "Cash").await;
    let delivered = create_order(&app, 200.0, "Cash").await;
    let cancelled = create_order(&app, 300.0, "Cash").await;

    let delivered_key = delivered["id"].as_str().unwrap();
    claim(&app, delivered_key, driver_id).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{delivered_key}/complete"),
            json!({ "driverId": driver_id }),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{}/cancel", cancelled["id"].as_str().unwrap()),
            json!({}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/driver/orders")).await.unwrap();
    let listed = body_json(response).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], open["id"]);
}

#[tokio::test]
async fn order_listing_paginates() {
    let (app, _state) = setup();

    for n in 0..3 {
        create_order(&app, 100.0 + n as f64, "Cash").await;
    }

    let response = app
        .clone()
        .oneshot(get_request("/orders?page=2&limit=2"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_request("/orders?status=Pending&limit=50"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["orders"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn low_accuracy_location_is_rejected_and_not_stored() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/drivers/{driver_id}/location"),
            json!({ "latitude": 12.9716, "longitude": 77.5946, "accuracy": 250.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "LOW_ACCURACY");

    let response = app.clone().oneshot(get_request("/drivers")).await.unwrap();
    let drivers = body_json(response).await;
    assert!(drivers[0]["lastLocation"].is_null());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/drivers/{driver_id}/location"),
            json!({ "latitude": 12.9716, "longitude": 77.5946, "accuracy": 150.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/drivers")).await.unwrap();
    let drivers = body_json(response).await;
    assert_eq!(drivers[0]["lastLocation"]["accuracy"], 150.0);
}

#[tokio::test]
async fn location_without_coordinates_is_rejected() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/drivers/{driver_id}/location"),
            json!({ "latitude": 12.9716 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MISSING_LOCATION");
}

#[tokio::test]
async fn fcm_token_registration_and_location_wake() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/drivers/{driver_id}/fcm-token"),
            json!({ "fcmToken": "token-123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The logging notifier stands in for a disabled push provider: one
    // token known, nothing actually sent.
    let response = app
        .oneshot(json_request("POST", "/admin/request-locations", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["sent"], 0);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn dashboard_reflects_orders_and_revenue() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();

    let order = create_order(&app, 500.0, "Cash").await;
    create_order(&app, 300.0, "Cash").await;

    let order_key = order["id"].as_str().unwrap();
    claim(&app, order_key, driver_id).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_key}/complete"),
            json!({ "driverId": driver_id }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/admin/dashboard")).await.unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["totalOrders"], 2);
    assert_eq!(stats["pendingOrders"], 1);
    assert_eq!(stats["deliveredOrders"], 1);
    assert_eq!(stats["totalRevenue"], 500.0);
    assert_eq!(stats["totalDrivers"], 1);
}

#[tokio::test]
async fn driver_history_lists_completed_deliveries() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();
    let order = create_order(&app, 500.0, "Cash").await;
    let order_key = order["id"].as_str().unwrap();

    claim(&app, order_key, driver_id).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/driver/orders/{order_key}/complete"),
            json!({ "driverId": driver_id }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(get_request(&format!("/drivers/{driver_id}/history")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let history = body_json(response).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], order["id"]);
    assert_eq!(history[0]["deliveryStatus"], "Delivered");
}

#[tokio::test]
async fn duplicate_driver_phone_is_rejected() {
    let (app, _state) = setup();

    create_driver(&app, "Ravi", "9876500001").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({ "name": "Sanjay", "phone": "9876500001" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_driver_cannot_claim() {
    let (app, _state) = setup();

    let driver = create_driver(&app, "Ravi", "9876500001").await;
    let driver_id = driver["id"].as_str().unwrap();
    let order = create_order(&app, 500.0, "Cash").await;

    let response = app
        .clone()
        .oneshot(delete_request(&format!("/drivers/{driver_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = claim(&app, order["id"].as_str().unwrap(), driver_id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
