//! The operator's session: one owning struct for the cached roll, the
//! search state, the open draft, the duplicate guard and the delete dialog.
//!
//! Store-mutating round trips (load, save, delete) go through the loading
//! gate: at most one is in flight and a second attempt fails with
//! [`RollError::Busy`]. The state lock is never held across an await.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::editor::{EditorDraft, SaveLabel};
use crate::error::RollError;
use crate::extraction::{ExtractedFields, FieldExtractor};
use crate::gateway::sheet::UpsertOutcome;
use crate::gateway::RollGateway;
use crate::guard::{Acknowledgement, DuplicateGuard, DuplicateWarning, GuardVerdict};
use crate::intake::{self, EncodedPhoto};
use crate::search;
use crate::store::RecordStore;
use crate::types::{
    Config, DeleteReason, GenderOption, ImageConfig, LocationFilter, Member, MemberField,
    SearchMode, SearchState,
};
use crate::util::photo_file_name;

const SAVED_MESSAGE: &str = "डाटा सफलतापूर्वक सुरक्षित किया गया!";
const DELETED_MESSAGE: &str = "सदस्य सफलतापूर्वक हटाया गया!";

/// The parts of [`Config`] the session works with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub reference_date: NaiveDate,
    pub svn_prefix: String,
    pub image: ImageConfig,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            reference_date: config.target_date,
            svn_prefix: config.svn_prefix.clone(),
            image: config.image,
        }
    }
}

/// The open delete dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelete {
    pub svn: String,
    pub voter_name: String,
    pub reason: DeleteReason,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub svn: String,
    pub outcome: UpsertOutcome,
    pub message: String,
    /// False when the save went through but the follow-up fetch failed.
    pub refreshed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub svn: String,
    pub reason: DeleteReason,
    pub message: String,
    pub refreshed: bool,
}

/// Everything the UI renders, in one snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub mode: SearchMode,
    pub query: String,
    pub filters: LocationFilter,
    pub booth_options: Vec<String>,
    pub ward_options: Vec<String>,
    pub house_options: Vec<String>,
    pub results: Vec<Member>,
    pub draft: Option<Member>,
    /// Choices for the draft's gender picker.
    pub gender_options: Vec<GenderOption>,
    pub save_label: Option<SaveLabel>,
    pub pending_warning: Option<DuplicateWarning>,
    pub pending_delete: Option<PendingDelete>,
    pub loading: bool,
    pub record_count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

struct SessionState {
    store: RecordStore,
    search: SearchState,
    editor: EditorDraft,
    guard: DuplicateGuard,
    pending_delete: Option<PendingDelete>,
    /// Bumped whenever a draft is opened or closed.
    draft_generation: u64,
}

impl SessionState {
    fn clear_editor(&mut self) {
        self.editor.close();
        self.guard.reset();
        self.pending_delete = None;
        self.draft_generation += 1;
    }

    fn save_label(&self) -> Option<SaveLabel> {
        let draft = self.editor.draft()?;
        let has_aadhaar = self
            .store
            .get(&draft.svn)
            .is_some_and(|stored| !stored.aadhaar.trim().is_empty());
        Some(if has_aadhaar {
            SaveLabel::Update
        } else {
            SaveLabel::Save
        })
    }
}

/// Holds the loading flag for one round trip; released on drop.
struct LoadingGate<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGate<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, RollError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RollError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for LoadingGate<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RollSession {
    gateway: Arc<dyn RollGateway>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    loading: AtomicBool,
}

impl RollSession {
    pub fn new(gateway: Arc<dyn RollGateway>, settings: SessionSettings) -> Self {
        let editor = EditorDraft::new(settings.reference_date);
        Self {
            gateway,
            settings,
            state: Mutex::new(SessionState {
                store: RecordStore::new(),
                search: SearchState::default(),
                editor,
                guard: DuplicateGuard::default(),
                pending_delete: None,
                draft_generation: 0,
            }),
            loading: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the whole roll and replace the cached copy.
    pub async fn load(&self) -> Result<usize, RollError> {
        let _gate = LoadingGate::acquire(&self.loading)?;
        let members = self.gateway.fetch_all().await.inspect_err(|e| {
            log::warn!("Loading roll from {} failed: {}", self.gateway.describe(), e);
        })?;
        let count = members.len();
        self.state.lock().store.replace(members);
        log::info!("Loaded {} records from {}", count, self.gateway.describe());
        Ok(count)
    }

    /// Refetch after a successful write. A failure keeps the old snapshot.
    async fn refresh(&self) -> bool {
        match self.gateway.fetch_all().await {
            Ok(members) => {
                self.state.lock().store.replace(members);
                true
            }
            Err(e) => {
                log::warn!("Refresh after write failed, keeping previous roll: {}", e);
                false
            }
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Switching mode starts over: query, filters, draft, warning and delete
    /// dialog are all cleared. SVN mode starts with the code prefix typed in.
    pub fn set_mode(&self, mode: SearchMode) {
        let mut state = self.state.lock();
        state.search = SearchState {
            mode,
            query: match mode {
                SearchMode::Svn => self.settings.svn_prefix.clone(),
                _ => String::new(),
            },
            filters: LocationFilter::default(),
        };
        state.clear_editor();
    }

    pub fn set_query(&self, query: &str) {
        self.state.lock().search.query = query.to_string();
    }

    pub fn select_booth(&self, booth: &str) {
        self.state.lock().search.filters.set_booth(booth);
    }

    pub fn select_ward(&self, ward: &str) {
        self.state.lock().search.filters.set_ward(ward);
    }

    pub fn select_house(&self, house: &str) {
        self.state.lock().search.filters.set_house(house);
    }

    pub fn results(&self) -> Vec<Member> {
        let state = self.state.lock();
        search::filter_members(state.store.members(), &state.search)
            .into_iter()
            .cloned()
            .collect()
    }

    // =========================================================================
    // Editor
    // =========================================================================

    /// Open a copy of the record with `svn` for editing.
    pub fn select_member(&self, svn: &str) -> Result<Member, RollError> {
        let mut state = self.state.lock();
        let member = state
            .store
            .get(svn)
            .cloned()
            .ok_or_else(|| RollError::NotFound(svn.to_string()))?;
        state.clear_editor();
        Ok(state.editor.open(&member).clone())
    }

    pub fn edit_field(&self, field: MemberField, value: &str) -> Result<Member, RollError> {
        let mut state = self.state.lock();
        state
            .editor
            .edit(field, value)
            .cloned()
            .ok_or(RollError::NoDraft)
    }

    pub fn close_editor(&self) {
        self.state.lock().clear_editor();
    }

    pub fn draft(&self) -> Option<Member> {
        self.state.lock().editor.draft().cloned()
    }

    /// Encode `bytes` and place the photo on the open draft.
    ///
    /// An over-limit photo is still attached; the save refuses it.
    pub async fn attach_photo(&self, bytes: Vec<u8>) -> Result<EncodedPhoto, RollError> {
        let generation = {
            let state = self.state.lock();
            if !state.editor.is_open() {
                return Err(RollError::NoDraft);
            }
            state.draft_generation
        };

        let settings = self.settings.image;
        let photo = tokio::task::spawn_blocking(move || intake::encode_for_cell(&bytes, &settings))
            .await
            .map_err(|e| RollError::Io(format!("Photo encode task failed: {}", e)))??;

        let mut state = self.state.lock();
        if state.draft_generation != generation {
            return Err(RollError::DraftChanged);
        }
        state
            .editor
            .edit(MemberField::AadhaarImage, &photo.data_url)
            .ok_or(RollError::NoDraft)?;
        log::debug!(
            "Attached {}x{} photo ({} chars)",
            photo.width,
            photo.height,
            photo.encoded_chars
        );
        Ok(photo)
    }

    /// Write the draft's photo into `dir`. Returns the file path.
    pub fn export_photo(&self, dir: &Path) -> Result<PathBuf, RollError> {
        let (data_url, name) = {
            let state = self.state.lock();
            let draft = state.editor.draft().ok_or(RollError::NoDraft)?;
            let data_url = draft.aadhaar_image.clone().ok_or(RollError::NoPhoto)?;
            (data_url, draft.voter_name.clone())
        };
        let bytes = intake::decode_data_url(&data_url)?;
        let path = dir.join(photo_file_name(&name));
        std::fs::write(&path, bytes)?;
        log::info!("Exported photo to {}", path.display());
        Ok(path)
    }

    /// Read the Aadhaar number and date of birth off the draft's photo and
    /// fill them in. The draft is left alone if nothing was read.
    pub async fn extract_fields(
        &self,
        extractor: &dyn FieldExtractor,
    ) -> Result<ExtractedFields, RollError> {
        let (data_url, generation) = {
            let state = self.state.lock();
            let draft = state.editor.draft().ok_or(RollError::NoDraft)?;
            let data_url = draft.aadhaar_image.clone().ok_or(RollError::NoPhoto)?;
            (data_url, state.draft_generation)
        };

        let fields = extractor.extract(&data_url).await.inspect_err(|e| {
            log::warn!("Field extraction failed: {}", e);
        })?;

        let mut state = self.state.lock();
        if state.draft_generation != generation || !state.editor.is_open() {
            log::info!("Discarding extraction result, the draft changed");
            return Err(RollError::DraftChanged);
        }
        if let Some(aadhaar) = &fields.aadhaar {
            state.editor.edit(MemberField::Aadhaar, aadhaar);
        }
        if let Some(dob) = &fields.dob {
            state.editor.edit(MemberField::Dob, dob);
        }
        Ok(fields)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Send the whole draft to the roll.
    ///
    /// Checks run in order before anything is sent: a record code is
    /// present, the photo fits one cell, no unacknowledged duplicate
    /// Aadhaar. On success the roll is refetched and the editor closed.
    pub async fn save(&self) -> Result<SaveOutcome, RollError> {
        let _gate = LoadingGate::acquire(&self.loading)?;

        let (draft, outcome, generation) = {
            let mut locked = self.state.lock();
            let state = &mut *locked;
            let draft = state.editor.draft().cloned().ok_or(RollError::NoDraft)?;
            if draft.svn.trim().is_empty() {
                return Err(RollError::MissingSvn);
            }
            if let Some(photo) = &draft.aadhaar_image {
                intake::check_cell_size(photo, self.settings.image.max_encoded_chars)?;
            }
            match state.guard.check(&state.store, &draft) {
                GuardVerdict::Clear => {}
                GuardVerdict::Blocked(warning) => {
                    log::info!(
                        "Save of {} blocked: Aadhaar also on {}",
                        warning.draft_svn,
                        warning.conflicting_svn
                    );
                    return Err(RollError::DuplicateAadhaar {
                        aadhaar: warning.aadhaar,
                        svn: warning.conflicting_svn,
                        name: warning.conflicting_name,
                    });
                }
                GuardVerdict::Unacknowledged => return Err(RollError::WarningPending),
            }
            let outcome = if state.store.contains(&draft.svn) {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Created
            };
            (draft, outcome, state.draft_generation)
        };

        self.gateway.upsert(&draft).await.inspect_err(|e| {
            log::warn!("Saving {} failed: {}", draft.svn, e);
        })?;
        log::info!("Saved {} ({:?})", draft.svn, outcome);
        self.state.lock().guard.clear_waiver();

        let refreshed = self.refresh().await;
        {
            let mut state = self.state.lock();
            if state.draft_generation == generation {
                state.clear_editor();
            }
        }

        Ok(SaveOutcome {
            svn: draft.svn,
            outcome,
            message: SAVED_MESSAGE.to_string(),
            refreshed,
        })
    }

    /// Close the duplicate warning. Returns false if none was showing.
    pub fn acknowledge_duplicate(&self, ack: Acknowledgement) -> bool {
        self.state.lock().guard.acknowledge(ack)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Open the delete dialog for the draft's record, reason preset to
    /// marriage.
    pub fn request_delete(&self) -> Result<PendingDelete, RollError> {
        let mut state = self.state.lock();
        let draft = state.editor.draft().ok_or(RollError::NoDraft)?;
        let pending = PendingDelete {
            svn: draft.svn.clone(),
            voter_name: draft.voter_name.clone(),
            reason: DeleteReason::default(),
        };
        state.pending_delete = Some(pending.clone());
        Ok(pending)
    }

    pub fn set_delete_reason(&self, reason: DeleteReason) -> Result<PendingDelete, RollError> {
        let mut state = self.state.lock();
        let pending = state
            .pending_delete
            .as_mut()
            .ok_or(RollError::NoDeleteRequest)?;
        pending.reason = reason;
        Ok(pending.clone())
    }

    pub fn cancel_delete(&self) {
        self.state.lock().pending_delete = None;
    }

    /// Move the record to the removed log. On failure the dialog stays open.
    pub async fn confirm_delete(&self) -> Result<DeleteOutcome, RollError> {
        let _gate = LoadingGate::acquire(&self.loading)?;

        let (pending, generation) = {
            let state = self.state.lock();
            let pending = state
                .pending_delete
                .clone()
                .ok_or(RollError::NoDeleteRequest)?;
            (pending, state.draft_generation)
        };

        self.gateway
            .soft_delete(&pending.svn, pending.reason)
            .await
            .inspect_err(|e| log::warn!("Removing {} failed: {}", pending.svn, e))?;
        log::info!("Removed {} ({})", pending.svn, pending.reason);

        let refreshed = self.refresh().await;
        {
            let mut state = self.state.lock();
            if state.draft_generation == generation {
                state.clear_editor();
            }
        }

        Ok(DeleteOutcome {
            svn: pending.svn,
            reason: pending.reason,
            message: DELETED_MESSAGE.to_string(),
            refreshed,
        })
    }

    // =========================================================================
    // View
    // =========================================================================

    pub fn view(&self) -> SessionView {
        let state = self.state.lock();
        let members = state.store.members();
        let filters = &state.search.filters;
        SessionView {
            mode: state.search.mode,
            query: state.search.query.clone(),
            filters: filters.clone(),
            booth_options: search::booth_options(members),
            ward_options: search::ward_options(members, filters),
            house_options: search::house_options(members, filters),
            results: search::filter_members(members, &state.search)
                .into_iter()
                .cloned()
                .collect(),
            draft: state.editor.draft().cloned(),
            gender_options: GenderOption::all(),
            save_label: state.save_label(),
            pending_warning: state.guard.pending().cloned(),
            pending_delete: state.pending_delete.clone(),
            loading: self.is_loading(),
            record_count: state.store.len(),
            loaded_at: state.store.loaded_at(),
        }
    }
}
