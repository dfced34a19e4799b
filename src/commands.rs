//! Tauri IPC commands. Each one is a thin wrapper over the session.

use std::path::PathBuf;
use std::sync::Arc;

use tauri::State;

use crate::error::{CommandError, RollError};
use crate::extraction::ExtractedFields;
use crate::guard::Acknowledgement;
use crate::intake::EncodedPhoto;
use crate::session::{DeleteOutcome, PendingDelete, SaveOutcome, SessionView};
use crate::state::AppState;
use crate::types::{Config, DeleteReason, Member, MemberField, SearchMode};

/// Get current configuration
#[tauri::command]
pub fn get_config(state: State<Arc<AppState>>) -> Config {
    state.public_config()
}

/// Fetch the whole roll from the backend.
#[tauri::command]
pub async fn load_roll(state: State<'_, Arc<AppState>>) -> Result<usize, CommandError> {
    state.session.load().await.map_err(CommandError::from)
}

#[tauri::command]
pub fn get_session_view(state: State<Arc<AppState>>) -> SessionView {
    state.session.view()
}

// =============================================================================
// Search
// =============================================================================

#[tauri::command]
pub fn set_search_mode(state: State<Arc<AppState>>, mode: SearchMode) -> SessionView {
    state.session.set_mode(mode);
    state.session.view()
}

#[tauri::command]
pub fn set_search_query(state: State<Arc<AppState>>, query: String) -> SessionView {
    state.session.set_query(&query);
    state.session.view()
}

#[tauri::command]
pub fn select_booth(state: State<Arc<AppState>>, booth: String) -> SessionView {
    state.session.select_booth(&booth);
    state.session.view()
}

#[tauri::command]
pub fn select_ward(state: State<Arc<AppState>>, ward: String) -> SessionView {
    state.session.select_ward(&ward);
    state.session.view()
}

#[tauri::command]
pub fn select_house(state: State<Arc<AppState>>, house: String) -> SessionView {
    state.session.select_house(&house);
    state.session.view()
}

// =============================================================================
// Editor
// =============================================================================

#[tauri::command]
pub fn select_member(state: State<Arc<AppState>>, svn: String) -> Result<Member, CommandError> {
    state.session.select_member(&svn).map_err(CommandError::from)
}

#[tauri::command]
pub fn update_draft_field(
    state: State<Arc<AppState>>,
    field: MemberField,
    value: String,
) -> Result<Member, CommandError> {
    state
        .session
        .edit_field(field, &value)
        .map_err(CommandError::from)
}

#[tauri::command]
pub fn close_editor(state: State<Arc<AppState>>) -> SessionView {
    state.session.close_editor();
    state.session.view()
}

/// Attach an image file (picked or captured) to the open draft.
#[tauri::command]
pub async fn attach_photo(
    state: State<'_, Arc<AppState>>,
    path: String,
) -> Result<EncodedPhoto, CommandError> {
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        log::warn!("Failed to read photo {}: {}", path, e);
        CommandError::from(RollError::from(e))
    })?;
    state
        .session
        .attach_photo(bytes)
        .await
        .map_err(CommandError::from)
}

/// Save the draft's photo into `directory`; returns the written file path.
#[tauri::command]
pub fn export_photo(
    state: State<Arc<AppState>>,
    directory: String,
) -> Result<String, CommandError> {
    state
        .session
        .export_photo(&PathBuf::from(directory))
        .map(|path| path.to_string_lossy().into_owned())
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn extract_document_fields(
    state: State<'_, Arc<AppState>>,
) -> Result<ExtractedFields, CommandError> {
    let extractor = state
        .extractor
        .clone()
        .ok_or_else(|| CommandError::from(RollError::ExtractionDisabled))?;
    state
        .session
        .extract_fields(extractor.as_ref())
        .await
        .map_err(CommandError::from)
}

// =============================================================================
// Save / delete
// =============================================================================

#[tauri::command]
pub async fn save_draft(state: State<'_, Arc<AppState>>) -> Result<SaveOutcome, CommandError> {
    state.session.save().await.map_err(CommandError::from)
}

/// Close the duplicate-Aadhaar warning. Returns false if none was showing.
#[tauri::command]
pub fn acknowledge_duplicate(state: State<Arc<AppState>>, acknowledgement: Acknowledgement) -> bool {
    state.session.acknowledge_duplicate(acknowledgement)
}

#[tauri::command]
pub fn request_delete(state: State<Arc<AppState>>) -> Result<PendingDelete, CommandError> {
    state.session.request_delete().map_err(CommandError::from)
}

#[tauri::command]
pub fn set_delete_reason(
    state: State<Arc<AppState>>,
    reason: DeleteReason,
) -> Result<PendingDelete, CommandError> {
    state
        .session
        .set_delete_reason(reason)
        .map_err(CommandError::from)
}

#[tauri::command]
pub fn cancel_delete(state: State<Arc<AppState>>) -> SessionView {
    state.session.cancel_delete();
    state.session.view()
}

#[tauri::command]
pub async fn confirm_delete(
    state: State<'_, Arc<AppState>>,
) -> Result<DeleteOutcome, CommandError> {
    state.session.confirm_delete().await.map_err(CommandError::from)
}
