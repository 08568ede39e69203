use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    error::AppResult,
    receipts::{
        dto::{
            parse_filters, CreateReceiptRequest, PublicQuery, ReceiptListResponse,
            ReceiptResponse, SearchQuery,
        },
        render::render_text,
        services,
    },
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/receipts/search", post(search_receipts)) // POST so filters can travel in the body
        .route("/receipts/:id", get(get_receipt))
        .route("/receipts/:id/public", get(get_public_receipt))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/receipts/create", post(create_receipt))
}

// --- handlers ---

#[instrument(skip(state, user, payload), fields(user_id = user.0.id))]
pub async fn create_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateReceiptRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<ReceiptResponse>)> {
    payload.validate()?;

    let receipt = services::create(
        state.receipts.as_ref(),
        user.0.id,
        &payload.products,
        payload.payment,
    )
    .await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/receipts/{}", receipt.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(receipt.into())))
}

#[instrument(skip(state, user, query, body), fields(user_id = user.0.id))]
pub async fn search_receipts(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<SearchQuery>, QueryRejection>,
    body: Bytes,
) -> AppResult<Json<ReceiptListResponse>> {
    let Query(q) = query?;
    q.validate()?;
    let filters = parse_filters(&body)?;

    let page = services::list(state.receipts.as_ref(), user.0.id, q.page, q.per_page, &filters).await?;
    Ok(Json(ReceiptListResponse {
        receipts: page.items.into_iter().map(Into::into).collect(),
        total_count: page.total_count,
        page: page.page,
        per_page: page.per_page,
    }))
}

#[instrument(skip(state, user, path), fields(user_id = user.0.id))]
pub async fn get_receipt(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<ReceiptResponse>> {
    let Path(id) = path?;
    let receipt = services::get_owned(state.receipts.as_ref(), user.0.id, id).await?;
    Ok(Json(receipt.into()))
}

/// No authentication: anyone holding the id may print the receipt.
#[instrument(skip_all)]
pub async fn get_public_receipt(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PublicQuery>, QueryRejection>,
) -> AppResult<String> {
    let Path(id) = path?;
    let Query(q) = query?;
    q.validate()?;
    let receipt = services::get_public(state.receipts.as_ref(), id).await?;
    Ok(render_text(&receipt, &state.config.merchant_name, q.line_width))
}
