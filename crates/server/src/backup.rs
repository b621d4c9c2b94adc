//! Backup API endpoints

use api_types::{
    DateFilter,
    backup::{ConflictMode, ImportRequest},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::backup::{Archive, ExportOptions, ImportOptions, ImportResult};

use crate::{ServerError, server::{OrganizerScope, ServerState}};

fn conflict_mode(mode: ConflictMode) -> engine::backup::ConflictMode {
    match mode {
        ConflictMode::SkipDuplicates => engine::backup::ConflictMode::SkipDuplicates,
        ConflictMode::ReplaceDuplicates => engine::backup::ConflictMode::ReplaceDuplicates,
        ConflictMode::MergeData => engine::backup::ConflictMode::MergeData,
    }
}

/// Exports the organizer's records. The range applies to sessions and payments.
pub async fn export(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Query(filter): Query<DateFilter>,
) -> Result<Json<Archive>, ServerError> {
    let options = ExportOptions {
        range: engine::DateRange::new(filter.from, filter.to),
        session_ids: None,
    };
    let archive = state.engine.export_archive(&organizer_id, &options).await?;
    Ok(Json(archive))
}

/// Imports an archive. A rejected archive still answers 200 with
/// `success: false` and the list of defects.
pub async fn import(
    Extension(OrganizerScope(organizer_id)): Extension<OrganizerScope>,
    State(state): State<ServerState>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResult>, ServerError> {
    let options = ImportOptions {
        conflict: conflict_mode(payload.conflict),
        validate_only: payload.validate_only,
        clear_existing_data: payload.clear_existing_data,
        cancel: None,
    };
    let report = state
        .engine
        .import_archive(&organizer_id, payload.archive, &options)
        .await?;
    Ok(Json(report))
}
