use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use backstage_database::{
    InfoItem, InfoItemFilter, InfoItemKind, InfoItemUpdate, NewActivity, NewInfoItem, User,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use utoipa::IntoParams;

use crate::{
    routes::models::{
        CreateInfoItemRequest, InfoItemResponse, InfoItemsResponse, UpdateInfoItemRequest,
    },
    util::current_user,
    ApiError, AppState,
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 10_000;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListVaultQuery {
    /// `link`, `secret` or `file`.
    pub kind: Option<String>,
    pub category: Option<String>,
    /// Matches title, description and category.
    pub search: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn check_title(title: &str) -> Result<(), ApiError> {
    if title.is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::bad_request(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_content(kind: InfoItemKind, content: &str) -> Result<(), ApiError> {
    if content.is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::bad_request(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    if kind == InfoItemKind::Link
        && !(content.starts_with("https://") || content.starts_with("http://"))
    {
        return Err(ApiError::bad_request("links must start with http:// or https://"));
    }
    Ok(())
}

fn ensure_can_edit(user: &User, item: &InfoItem) -> Result<(), ApiError> {
    if user.role.is_admin() || item.created_by == user.id {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "only the creator or an administrator may change this item",
        ))
    }
}

async fn load_item(state: &AppState, item_id: &str) -> Result<InfoItem, ApiError> {
    state
        .vault()
        .find_by_public_id(item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("vault item not found"))
}

#[utoipa::path(
    get,
    path = "/api/vault",
    tag = "Vault",
    security(("bearerAuth" = [])),
    params(ListVaultQuery),
    responses(
        (status = 200, description = "Vault items with secrets masked", body = InfoItemsResponse),
        (status = 400, description = "Unknown kind", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListVaultQuery>,
) -> Result<Json<InfoItemsResponse>, ApiError> {
    current_user(&state, &headers).await?;

    let filter = InfoItemFilter {
        kind: non_empty(query.kind)
            .map(|kind| kind.parse::<InfoItemKind>())
            .transpose()
            .map_err(ApiError::bad_request)?,
        category: non_empty(query.category),
        search: non_empty(query.search),
    };

    let items = state.vault().list(&filter).await?;
    Ok(Json(InfoItemsResponse {
        items: items.into_iter().map(InfoItemResponse::masked).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/vault",
    tag = "Vault",
    security(("bearerAuth" = [])),
    request_body = CreateInfoItemRequest,
    responses(
        (status = 201, description = "Item stored", body = InfoItemResponse),
        (status = 400, description = "Invalid item", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateInfoItemRequest>,
) -> Result<(StatusCode, Json<InfoItemResponse>), ApiError> {
    let (user, _) = current_user(&state, &headers).await?;

    let kind: InfoItemKind = payload.kind.trim().parse().map_err(ApiError::bad_request)?;
    let title = payload.title.trim().to_string();
    let content = payload.content.trim().to_string();
    check_title(&title)?;
    check_content(kind, &content)?;

    let item = state
        .vault()
        .create(&NewInfoItem {
            kind,
            title,
            description: non_empty(payload.description),
            content,
            category: non_empty(payload.category),
            created_by: user.id,
        })
        .await?;

    state
        .record_activity(
            NewActivity::new(Some(user.id), "vault.created", "info_item")
                .entity(item.public_id.clone())
                .details(json!({ "title": item.title, "kind": item.kind })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(InfoItemResponse::masked(item))))
}

#[utoipa::path(
    get,
    path = "/api/vault/{id}",
    tag = "Vault",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Vault item id")),
    responses(
        (status = 200, description = "Item with secret masked", body = InfoItemResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Result<Json<InfoItemResponse>, ApiError> {
    current_user(&state, &headers).await?;
    let item = load_item(&state, &item_id).await?;
    Ok(Json(InfoItemResponse::masked(item)))
}

#[utoipa::path(
    post,
    path = "/api/vault/{id}/reveal",
    tag = "Vault",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Vault item id")),
    responses(
        (status = 200, description = "Item including its content; the access is logged", body = InfoItemResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reveal_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Result<Json<InfoItemResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let item = load_item(&state, &item_id).await?;

    info!(user = %user.public_id, item = %item.public_id, "vault item revealed");
    state
        .record_activity(
            NewActivity::new(Some(user.id), "vault.revealed", "info_item")
                .entity(item.public_id.clone())
                .details(json!({ "title": item.title })),
        )
        .await;

    Ok(Json(InfoItemResponse::revealed(item)))
}

#[utoipa::path(
    put,
    path = "/api/vault/{id}",
    tag = "Vault",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Vault item id")),
    request_body = UpdateInfoItemRequest,
    responses(
        (status = 200, description = "Updated item", body = InfoItemResponse),
        (status = 400, description = "Invalid update", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the creator or an administrator", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
    Json(payload): Json<UpdateInfoItemRequest>,
) -> Result<Json<InfoItemResponse>, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let item = load_item(&state, &item_id).await?;
    ensure_can_edit(&user, &item)?;

    let title = payload.title.map(|title| title.trim().to_string());
    if let Some(title) = &title {
        check_title(title)?;
    }
    let content = payload.content.map(|content| content.trim().to_string());
    if let Some(content) = &content {
        check_content(item.kind, content)?;
    }

    let update = InfoItemUpdate {
        title,
        description: payload.description.map(non_empty),
        content,
        category: payload.category.map(non_empty),
    };
    let updated = state.vault().update(item.id, &update).await?;

    state
        .record_activity(
            NewActivity::new(Some(user.id), "vault.updated", "info_item")
                .entity(updated.public_id.clone()),
        )
        .await;

    Ok(Json(InfoItemResponse::masked(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/vault/{id}",
    tag = "Vault",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Vault item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, description = "Not the creator or an administrator", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (user, _) = current_user(&state, &headers).await?;
    let item = load_item(&state, &item_id).await?;
    ensure_can_edit(&user, &item)?;

    state.vault().delete(item.id).await?;
    state
        .record_activity(
            NewActivity::new(Some(user.id), "vault.deleted", "info_item")
                .entity(item.public_id)
                .details(json!({ "title": item.title })),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
