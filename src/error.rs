//! Error types for roll operations
//!
//! Errors are classified by where they were caught:
//! - Transport: the request never produced a usable HTTP exchange
//! - Backend: the store answered but reported (or implied) failure
//! - Validation: caught on this machine before any request was sent
//! - State: the session was not in a state that allows the operation
//!
//! Nothing here is retried automatically. Every failure ends the attempt and
//! the operator resubmits.

use thiserror::Error;

/// Which gateway round trip failed. Selects the localized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOp {
    Fetch,
    Save,
    Delete,
}

impl GatewayOp {
    fn transport_message(self) -> &'static str {
        match self {
            GatewayOp::Fetch => "डाटा लोड करने में विफल",
            GatewayOp::Save => "डाटा सुरक्षित करने में विफल",
            GatewayOp::Delete => "डाटा हटाने में विफल",
        }
    }

    fn backend_fallback(self) -> &'static str {
        match self {
            GatewayOp::Fetch => "डाटा प्राप्त करने में त्रुटि",
            GatewayOp::Save => "डाटा सुरक्षित करने में त्रुटि",
            GatewayOp::Delete => "हटाने में त्रुटि",
        }
    }
}

#[derive(Debug, Error)]
pub enum RollError {
    // Transport
    #[error("{op:?} request failed: {detail}")]
    Transport { op: GatewayOp, detail: String },

    // Backend-reported
    #[error("{op:?} rejected by backend: {}", .message.as_deref().unwrap_or("no reason given"))]
    Backend { op: GatewayOp, message: Option<String> },

    #[error("Record {0} not found")]
    NotFound(String),

    // Client-side validation
    #[error("Photo is {len} characters, the sheet cell limit is {limit}")]
    ImageTooLarge { len: usize, limit: usize },

    #[error("Aadhaar {aadhaar} already belongs to {name} ({svn})")]
    DuplicateAadhaar {
        aadhaar: String,
        svn: String,
        name: String,
    },

    #[error("Duplicate Aadhaar warning has not been acknowledged")]
    WarningPending,

    #[error("Record code (SVN) is required")]
    MissingSvn,

    #[error("Could not read image: {0}")]
    ImageDecode(String),

    // Session state
    #[error("Another request is still in progress")]
    Busy,

    #[error("No record is open for editing")]
    NoDraft,

    #[error("No delete has been requested")]
    NoDeleteRequest,

    #[error("The open record has no photo")]
    NoPhoto,

    #[error("Could not read Aadhaar number or date of birth from the photo: {0}")]
    ExtractionFailed(String),

    #[error("Field extraction is not configured")]
    ExtractionDisabled,

    #[error("The open record changed while the photo was being read")]
    DraftChanged,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl RollError {
    pub fn transport(op: GatewayOp, detail: impl ToString) -> Self {
        RollError::Transport {
            op,
            detail: detail.to_string(),
        }
    }

    pub fn backend(op: GatewayOp, message: Option<&str>) -> Self {
        RollError::Backend {
            op,
            message: message
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            RollError::Transport { .. } => ErrorType::Transport,
            RollError::Backend { .. } | RollError::NotFound(_) => ErrorType::Backend,
            RollError::ImageTooLarge { .. }
            | RollError::DuplicateAadhaar { .. }
            | RollError::WarningPending
            | RollError::MissingSvn
            | RollError::ImageDecode(_) => ErrorType::Validation,
            RollError::Configuration(_) | RollError::Io(_) => ErrorType::Environment,
            _ => ErrorType::State,
        }
    }

    /// Message shown to the operator.
    ///
    /// Transport failures never leak the underlying error text; backend
    /// failures show the backend's reason verbatim when there is one.
    pub fn user_message(&self) -> String {
        match self {
            RollError::Transport { op, .. } => op.transport_message().to_string(),
            RollError::Backend { op, message } => message
                .clone()
                .unwrap_or_else(|| op.backend_fallback().to_string()),
            RollError::NotFound(_) => "सदस्य नहीं मिला".to_string(),
            RollError::ImageTooLarge { .. } => {
                "फोटो बहुत बड़ी है, कृपया छोटी फोटो चुनें".to_string()
            }
            RollError::DuplicateAadhaar { .. } | RollError::WarningPending => {
                "आधार पहले से मौजूद है!".to_string()
            }
            RollError::ExtractionFailed(_) => {
                "फोटो से विवरण नहीं पढ़ा जा सका, कृपया दोबारा फोटो लें".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RollError::Transport { .. } => "Check your internet connection and submit again.",
            RollError::Backend { .. } => "Check the roll spreadsheet and submit again.",
            RollError::NotFound(_) => "Reload the roll; the record may already be removed.",
            RollError::ImageTooLarge { .. } => {
                "Retake the photo closer to the card or choose a smaller image."
            }
            RollError::DuplicateAadhaar { .. } | RollError::WarningPending => {
                "Acknowledge the warning, then correct the Aadhaar number or save anyway."
            }
            RollError::MissingSvn => "Enter the record code before saving.",
            RollError::ImageDecode(_) => "Choose a JPEG, PNG or WebP image.",
            RollError::Busy => "Wait for the current request to finish.",
            RollError::NoDraft => "Select a record from the results first.",
            RollError::NoDeleteRequest => "Open the delete dialog first.",
            RollError::NoPhoto => "Attach a photo of the Aadhaar card first.",
            RollError::ExtractionFailed(_) => "Retake the photo or enter the fields by hand.",
            RollError::ExtractionDisabled => "Enter the fields by hand.",
            RollError::DraftChanged => "Run extraction again on the open record.",
            RollError::Configuration(_) => "Check ~/.voterroll/config.json",
            RollError::Io(_) => "Check file permissions and disk space.",
        }
    }
}

impl From<std::io::Error> for RollError {
    fn from(err: std::io::Error) -> Self {
        RollError::Io(err.to_string())
    }
}

/// Serializable error representation for IPC
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub message: String,
    pub detail: String,
    pub error_type: ErrorType,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Transport,
    Backend,
    Validation,
    State,
    Environment,
}

impl From<&RollError> for CommandError {
    fn from(err: &RollError) -> Self {
        CommandError {
            message: err.user_message(),
            detail: err.to_string(),
            error_type: err.error_type(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

impl From<RollError> for CommandError {
    fn from(err: RollError) -> Self {
        CommandError::from(&err)
    }
}
