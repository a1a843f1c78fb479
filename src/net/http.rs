use crate::Registry;
use crate::error::{DomainError, InfraError};
use crate::models::account::Account;
use crate::models::gear::{Gear, GearFilter, GearPatch, NewGear};
use crate::models::location::{Location, LocationFilter, LocationPatch, LocationTree, NewLocation};
use crate::models::types::{GearId, LocationId};
use crate::net::extract::{ApiError, ApiJson, ApiPath, ApiQuery, AuthAccount};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiResult<T> = Result<T, ApiError>;

/// Run the HTTP API until the listener fails.
pub async fn serve(addr: std::net::SocketAddr, registry: Arc<Registry>) -> Result<(), InfraError> {
    let app = router(registry);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "kitbox API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(registry: Arc<Registry>) -> Router {
    let api = Router::new()
        .route("/test", get(liveness))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/gear", get(list_gear).post(create_gear))
        .route(
            "/gear/{id}",
            get(get_gear).put(update_gear).patch(update_gear).delete(delete_gear),
        )
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location)
                .put(update_location)
                .patch(update_location)
                .delete(delete_location),
        )
        .route("/locations/{id}/items", get(location_items))
        .route("/locations/{id}/tree", get(location_tree));

    Router::new()
        .nest("/api", api)
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn liveness() -> Json<Value> {
    Json(json!({ "message": "kitbox API is running" }))
}

// ---- accounts ------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

/// Both fields optional so a missing one gets the login-specific message.
#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
}

async fn register(
    State(registry): State<Arc<Registry>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = registry.services.account.register(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn login(
    State(registry): State<Arc<Registry>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::bad_request("Username and password required"));
    };
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Username and password required"));
    }

    let services = &registry.services;
    let issued = match services.auth.login(&services.account, &username, &password).await {
        Ok(issued) => issued,
        Err(DomainError::Unauthenticated) => return Err(ApiError::invalid_credentials()),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
    }))
}

async fn me(AuthAccount(account): AuthAccount) -> Json<Account> {
    Json(account)
}

// ---- gear ----------------------------------------------------------------

async fn list_gear(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiQuery(filter): ApiQuery<GearFilter>,
) -> ApiResult<Json<Vec<Gear>>> {
    Ok(Json(registry.services.inventory.list(filter).await?))
}

async fn create_gear(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiJson(new): ApiJson<NewGear>,
) -> ApiResult<(StatusCode, Json<Gear>)> {
    let gear = registry.services.inventory.create(new).await?;
    Ok((StatusCode::CREATED, Json(gear)))
}

async fn get_gear(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<GearId>,
) -> ApiResult<Json<Gear>> {
    Ok(Json(registry.services.inventory.get(id).await?))
}

async fn update_gear(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<GearId>,
    ApiJson(patch): ApiJson<GearPatch>,
) -> ApiResult<Json<Gear>> {
    Ok(Json(registry.services.inventory.update(id, patch).await?))
}

async fn delete_gear(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<GearId>,
) -> ApiResult<Json<Value>> {
    if !registry.services.inventory.delete(id).await? {
        return Err(DomainError::not_found("Gear item", id).into());
    }
    Ok(Json(json!({ "message": format!("Gear item with id {id} deleted successfully") })))
}

// ---- locations -----------------------------------------------------------

async fn list_locations(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiQuery(filter): ApiQuery<LocationFilter>,
) -> ApiResult<Json<Vec<Location>>> {
    Ok(Json(registry.services.location.list(filter).await?))
}

async fn create_location(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiJson(new): ApiJson<NewLocation>,
) -> ApiResult<(StatusCode, Json<Location>)> {
    let location = registry.services.location.create(new).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn get_location(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<LocationId>,
) -> ApiResult<Json<Location>> {
    Ok(Json(registry.services.location.get(id).await?))
}

async fn update_location(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<LocationId>,
    ApiJson(patch): ApiJson<LocationPatch>,
) -> ApiResult<Json<Location>> {
    Ok(Json(registry.services.location.update(id, patch).await?))
}

async fn delete_location(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<LocationId>,
) -> ApiResult<Json<Value>> {
    if !registry.services.location.delete(id).await? {
        return Err(DomainError::not_found("Location", id).into());
    }
    Ok(Json(json!({ "message": format!("Location with id {id} deleted successfully") })))
}

async fn location_items(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<LocationId>,
) -> ApiResult<Json<Vec<Gear>>> {
    Ok(Json(registry.services.location.items_in(id).await?))
}

async fn location_tree(
    State(registry): State<Arc<Registry>>,
    AuthAccount(_): AuthAccount,
    ApiPath(id): ApiPath<LocationId>,
) -> ApiResult<Json<LocationTree>> {
    Ok(Json(registry.services.location.tree(id).await?))
}
