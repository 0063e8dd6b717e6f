use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chainstore::EntityKind;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ExplorerError, ExplorerResult};
use crate::page::PageResponse;
use crate::query::{QueryService, Stats};
use crate::server::error::{ApiError, ApiErrorResponse};
use crate::server::ServerState;
use crate::types::RecordView;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// 0-based position of the first record in the ascending sequence.
    pub from: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HeightParams {
    pub height: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KeyParams {
    /// Hash, nullifier or address, hex encoded.
    pub key: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    pub term: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParentListParams {
    /// Parent id, hex encoded.
    pub parent: Option<String>,
    /// 0-based position among the parent's children.
    pub from: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParentParams {
    pub parent: Option<String>,
}

#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses((status = 200, body = String))
)]
pub(crate) async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "records",
    responses(
        (status = 200, body = Stats),
        (status = 500, body = ApiErrorResponse),
    )
)]
pub(crate) async fn stats(State(state): State<Arc<ServerState>>) -> Result<Json<Stats>, ApiError> {
    let stats = run_query(&state, |query| query.stats()).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/list",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind, e.g. blocks"), ListParams),
    responses(
        (status = 200, body = PageResponse),
        (status = 400, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
    )
)]
pub(crate) async fn list(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<PageResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let from = required_u64("from", params.from.as_deref())?;
    let page = run_query(&state, move |query| query.list(kind, from)).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/item",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind"), HeightParams),
    responses(
        (status = 200, body = RecordView),
        (status = 400, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
    )
)]
pub(crate) async fn item(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<HeightParams>,
) -> Result<Json<RecordView>, ApiError> {
    let kind = parse_kind(&kind)?;
    let height = required_u64("height", params.height.as_deref())?;
    let record = run_query(&state, move |query| query.get(kind, height)).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/key",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind"), KeyParams),
    responses(
        (status = 200, body = RecordView),
        (status = 400, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
    )
)]
pub(crate) async fn by_key(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<KeyParams>,
) -> Result<Json<RecordView>, ApiError> {
    let kind = parse_kind(&kind)?;
    let key = required_text("key", params.key)?;
    let record = run_query(&state, move |query| query.get_by_key(kind, &key)).await?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/search",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind"), SearchParams),
    responses(
        (status = 200, body = PageResponse),
        (status = 400, body = ApiErrorResponse),
    )
)]
pub(crate) async fn search(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PageResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let Some(term) = params.term else {
        return Err(ApiError::missing_parameter("term"));
    };
    let page = run_query(&state, move |query| query.search(kind, &term)).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/count",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind")),
    responses(
        (status = 200, body = u64),
        (status = 400, body = ApiErrorResponse),
    )
)]
pub(crate) async fn count(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
) -> Result<Json<u64>, ApiError> {
    let kind = parse_kind(&kind)?;
    let count = run_query(&state, move |query| query.count(kind)).await?;
    Ok(Json(count))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/byparent",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind"), ParentListParams),
    responses(
        (status = 200, body = PageResponse),
        (status = 400, body = ApiErrorResponse),
        (status = 404, body = ApiErrorResponse),
    )
)]
pub(crate) async fn by_parent(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<ParentListParams>,
) -> Result<Json<PageResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let parent = required_text("parent", params.parent)?;
    let from = required_u64("from", params.from.as_deref())?;
    let page = run_query(&state, move |query| query.list_by_parent(kind, &parent, from)).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/countbyparent",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind"), ParentParams),
    responses(
        (status = 200, body = u64),
        (status = 400, body = ApiErrorResponse),
    )
)]
pub(crate) async fn count_by_parent(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
    Query(params): Query<ParentParams>,
) -> Result<Json<u64>, ApiError> {
    let kind = parse_kind(&kind)?;
    let parent = required_text("parent", params.parent)?;
    let count = run_query(&state, move |query| query.count_by_parent(kind, &parent)).await?;
    Ok(Json(count))
}

#[utoipa::path(
    get,
    path = "/api/{kind}/countmap",
    tag = "records",
    params(("kind" = String, Path, description = "Record kind")),
    responses(
        (status = 200, body = BTreeMap<String, u64>),
        (status = 400, body = ApiErrorResponse),
    )
)]
pub(crate) async fn count_map(
    State(state): State<Arc<ServerState>>,
    Path(kind): Path<String>,
) -> Result<Json<BTreeMap<String, u64>>, ApiError> {
    let kind = parse_kind(&kind)?;
    let counts = run_query(&state, move |query| query.count_map(kind)).await?;
    Ok(Json(counts))
}

/// Runs a store read off the async workers.
async fn run_query<T, F>(state: &Arc<ServerState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&QueryService) -> ExplorerResult<T> + Send + 'static,
{
    let query = Arc::clone(&state.query);
    let result = tokio::task::spawn_blocking(move || f(&query))
        .await
        .map_err(|error| ApiError::internal(format!("query task failed: {error}")))?;
    result.map_err(|error| {
        if !error.is_empty_result() {
            tracing::warn!("query failed: {}", error);
        }
        ApiError::from(error)
    })
}

fn parse_kind(raw: &str) -> Result<EntityKind, ApiError> {
    raw.parse::<EntityKind>()
        .map_err(|error| ApiError::not_found(error.to_string()))
}

fn required_text(name: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::missing_parameter(name)),
    }
}

fn required_u64(name: &str, value: Option<&str>) -> Result<u64, ApiError> {
    let raw = match value.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ApiError::missing_parameter(name)),
    };
    raw.parse::<u64>().map_err(|_| {
        ApiError::from(ExplorerError::InvalidInput(format!(
            "{name} must be a non-negative integer, got {raw}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn numeric_parameters_are_validated() {
        assert_eq!(required_u64("from", Some(" 42 ")).expect("parsed"), 42);
        assert_eq!(
            required_u64("from", None).expect_err("missing").code(),
            "missing_parameter"
        );
        let err = required_u64("from", Some("-1")).expect_err("negative");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "bad_request");
    }

    #[test]
    fn unknown_kinds_are_not_found() {
        assert_eq!(parse_kind("votes").expect_err("unknown").status(), StatusCode::NOT_FOUND);
        assert_eq!(parse_kind("blocks").expect("blocks"), EntityKind::Block);
    }
}
