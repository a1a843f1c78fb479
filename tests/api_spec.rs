use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use kitbox::Registry;
use kitbox::config::{Config, StoreKind};
use kitbox::net::http::router;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let cfg = Config {
        store: StoreKind::Memory,
        jwt_secret_key: "api-spec-secret".into(),
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..Config::default()
    };
    router(Arc::new(Registry::in_memory(Arc::new(cfg)).unwrap()))
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login_as(app: &Router, username: &str) -> String {
    let creds = json!({ "username": username, "password": "hunter2" });
    let (status, _) = call(app, Method::POST, "/api/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(app, Method::POST, "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn liveness_needs_no_token() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app();
    let creds = json!({ "username": "alice", "password": "hunter2" });

    let (status, body) = call(&app, Method::POST, "/api/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert!(body["id"].is_number());
    assert!(body.get("password_hash").is_none());

    let (status, body) = call(&app, Method::POST, "/api/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Username already exists");

    let (status, body) = call(&app, Method::POST, "/api/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = call(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn login_failures() {
    let app = app();
    login_as(&app, "alice").await;

    for creds in [
        json!({ "username": "alice", "password": "wrong" }),
        json!({ "username": "nobody", "password": "hunter2" }),
    ] {
        let (status, body) = call(&app, Method::POST, "/api/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid username or password");
    }

    for creds in [json!({ "password": "hunter2" }), json!({ "username": "alice" })] {
        let (status, body) = call(&app, Method::POST, "/api/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Username and password required");
    }

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "no_password" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_reject_missing_and_tampered_tokens() {
    let app = app();
    let token = login_as(&app, "alice").await;

    let (status, body) = call(&app, Method::GET, "/api/gear", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "unauthenticated");

    let (head, sig) = token.rsplit_once('.').unwrap();
    let flipped = if sig.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{head}.{flipped}{}", &sig[1..]);
    let (status, _) = call(&app, Method::GET, "/api/gear", Some(&tampered), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/api/gear", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn gear_crud() {
    let app = app();
    let token = login_as(&app, "alice").await;
    let t = Some(token.as_str());

    let (status, loc) = call(
        &app,
        Method::POST,
        "/api/locations",
        t,
        Some(json!({ "name": "Backpack", "type": "Container" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, rope) = call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Rope", "weight": 2.0, "cost": 1.0, "location_id": loc["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rope["location"]["name"], "Backpack");
    let id = rope["id"].as_i64().unwrap();

    let (status, fetched) = call(&app, Method::GET, &format!("/api/gear/{id}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, rope);

    // PATCH and PUT are both partial
    let (status, patched) = call(
        &app,
        Method::PATCH,
        &format!("/api/gear/{id}"),
        t,
        Some(json!({ "description": "50ft" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["description"], "50ft");
    assert_eq!(patched["cost"], 1.0);

    let (status, put) = call(
        &app,
        Method::PUT,
        &format!("/api/gear/{id}"),
        t,
        Some(json!({ "location_id": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(put["location_id"].is_null());
    assert!(put["location"].is_null());
    assert_eq!(put["description"], "50ft");

    let (status, body) = call(&app, Method::PATCH, &format!("/api/gear/{id}"), t, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "No update fields provided");

    let (status, list) = call(&app, Method::GET, "/api/gear?name=ROP&category=", t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, body) = call(&app, Method::DELETE, &format!("/api/gear/{id}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Gear item with id {id} deleted successfully"));

    let (status, body) = call(&app, Method::GET, &format!("/api/gear/{id}"), t, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");

    let (status, _) = call(&app, Method::DELETE, &format!("/api/gear/{id}"), t, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gear_input_is_validated() {
    let app = app();
    let token = login_as(&app, "alice").await;
    let t = Some(token.as_str());

    let (status, body) = call(&app, Method::POST, "/api/gear", t, Some(json!({ "name": "Rope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation_failure");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Rope", "weight": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Rope", "weight": 1, "location_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "integrity_violation");

    let (status, _) = call(&app, Method::GET, "/api/gear/not-a-number", t, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gear_validation_comes_before_location_lookup() {
    let app = app();
    let token = login_as(&app, "alice").await;
    let t = Some(token.as_str());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Anvil", "weight": -1, "location_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation_failure");

    let (_, anvil) = call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Anvil", "weight": 50 })),
    )
    .await;
    let uri = format!("/api/gear/{}", anvil["id"]);

    let (status, body) = call(
        &app,
        Method::PATCH,
        &uri,
        t,
        Some(json!({ "weight": -1, "location_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "validation_failure");

    let (status, body) = call(&app, Method::PATCH, &uri, t, Some(json!({ "location_id": 999 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "integrity_violation");

    let (_, fetched) = call(&app, Method::GET, &uri, t, None).await;
    assert_eq!(fetched, anvil);
}

#[tokio::test]
async fn location_routes() {
    let app = app();
    let token = login_as(&app, "alice").await;
    let t = Some(token.as_str());

    let (_, pack) = call(
        &app,
        Method::POST,
        "/api/locations",
        t,
        Some(json!({ "name": "Backpack", "type": "Container" })),
    )
    .await;
    let (_, pouch) = call(
        &app,
        Method::POST,
        "/api/locations",
        t,
        Some(json!({ "name": "Pouch", "type": "Container", "parent_id": pack["id"] })),
    )
    .await;
    call(
        &app,
        Method::POST,
        "/api/gear",
        t,
        Some(json!({ "name": "Rope", "weight": 2.0, "location_id": pouch["id"] })),
    )
    .await;

    let pack_id = pack["id"].as_i64().unwrap();
    let pouch_id = pouch["id"].as_i64().unwrap();

    let (status, items) = call(&app, Method::GET, &format!("/api/locations/{pack_id}/items"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(items.as_array().unwrap().is_empty());

    let (_, items) = call(&app, Method::GET, &format!("/api/locations/{pouch_id}/items"), t, None).await;
    assert_eq!(items[0]["name"], "Rope");
    assert_eq!(items[0]["location"]["id"], pouch_id);

    let (status, tree) = call(&app, Method::GET, &format!("/api/locations/{pack_id}/tree"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["name"], "Backpack");
    assert_eq!(tree["children"][0]["items"][0]["name"], "Rope");

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/api/locations/{pack_id}"),
        t,
        Some(json!({ "parent_id": pack_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "self_parent");

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/locations/{pack_id}"),
        t,
        Some(json!({ "parent_id": pouch_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "parent_cycle");

    let (status, list) = call(&app, Method::GET, "/api/locations?type=Container&name=", t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::DELETE, &format!("/api/locations/{pack_id}"), t, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Location with id {pack_id} deleted successfully"));

    let (_, pouch) = call(&app, Method::GET, &format!("/api/locations/{pouch_id}"), t, None).await;
    assert!(pouch["parent_id"].is_null());

    let (status, _) = call(&app, Method::GET, &format!("/api/locations/{pack_id}/items"), t, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
