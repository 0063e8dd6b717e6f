use utoipa::OpenApi;

use crate::page::PageResponse;
use crate::query::Stats;
use crate::server::error::{ApiErrorBody, ApiErrorResponse};
use crate::types::{AnyRecord, Block, Entity, Envelope, Process, RecordView, Transaction, Validator};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chain Explorer API",
        version = "0.1.0",
        description = "Read-only paginated access to blocks, transactions, envelopes, processes, entities and validators"
    ),
    paths(
        crate::server::api::ping,
        crate::server::api::stats,
        crate::server::api::list,
        crate::server::api::item,
        crate::server::api::by_key,
        crate::server::api::search,
        crate::server::api::count,
        crate::server::api::by_parent,
        crate::server::api::count_by_parent,
        crate::server::api::count_map,
    ),
    components(schemas(
        // Error
        ApiErrorResponse,
        ApiErrorBody,
        // Pages
        PageResponse,
        RecordView,
        Stats,
        // Records
        AnyRecord,
        Block,
        Transaction,
        Envelope,
        Process,
        Entity,
        Validator,
    )),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "records", description = "Windowed record queries"),
    )
)]
pub struct ApiDoc;
