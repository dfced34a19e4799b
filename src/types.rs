use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Configuration stored in ~/.voterroll/config.json
///
/// Every field has a default so a partial (or missing) file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    /// Link to the source spreadsheet, displayed by the UI only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_url: Option<String>,
    /// Reference date for the computed age column.
    #[serde(default = "default_target_date")]
    pub target_date: NaiveDate,
    /// Pre-filled query when the operator switches to SVN search.
    #[serde(default = "default_svn_prefix")]
    pub svn_prefix: String,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            sheet_url: None,
            target_date: default_target_date(),
            svn_prefix: default_svn_prefix(),
            image: ImageConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

fn default_target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default()
}

fn default_svn_prefix() -> String {
    "SUR".to_string()
}

/// Where the roll lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BackendConfig {
    /// Apps Script web app in front of the roll spreadsheet.
    #[serde(rename_all = "camelCase")]
    AppsScript { web_app_url: String },
    /// Workbook file on this machine with the same row semantics.
    LocalSheet { path: String },
}

impl Default for BackendConfig {
    fn default() -> Self {
        let path = dirs::home_dir()
            .unwrap_or_default()
            .join(".voterroll")
            .join("roll.json");
        BackendConfig::LocalSheet {
            path: path.to_string_lossy().into_owned(),
        }
    }
}

/// Photo intake limits. The spreadsheet rejects cells over 50,000 characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_max_encoded_chars")]
    pub max_encoded_chars: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            jpeg_quality: default_jpeg_quality(),
            max_encoded_chars: default_max_encoded_chars(),
        }
    }
}

fn default_max_width() -> u32 {
    600
}

fn default_jpeg_quality() -> u8 {
    70
}

fn default_max_encoded_chars() -> usize {
    50_000
}

/// Document field extraction endpoint (optional accelerator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

// =============================================================================
// Roll records
// =============================================================================

/// One row of the voter roll.
///
/// Sheet cells can come back as numbers (booth 12, serial 345), so every
/// text field accepts either and keeps the string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default, deserialize_with = "string_or_number")]
    pub booth_no: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub ward_no: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub voter_serial: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub house_no: String,
    /// Record code, the primary key.
    #[serde(default, deserialize_with = "string_or_number")]
    pub svn: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub voter_name: String,
    /// Father / husband / mother.
    #[serde(default, deserialize_with = "string_or_number")]
    pub relative_name: String,
    #[serde(default, deserialize_with = "gender_cell")]
    pub gender: Gender,
    /// Age as printed on the roll.
    #[serde(default, deserialize_with = "string_or_number")]
    pub age: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub aadhaar: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub dob: String,
    /// Age at the configured reference date, derived from `dob`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub calculated_age: String,
    /// `data:image/jpeg;base64,...`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_non_empty"
    )]
    pub aadhaar_image: Option<String>,
    /// Sheet row the backend read this record from. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<u32>,
}

impl Member {
    pub fn field(&self, field: MemberField) -> &str {
        match field {
            MemberField::BoothNo => &self.booth_no,
            MemberField::WardNo => &self.ward_no,
            MemberField::VoterSerial => &self.voter_serial,
            MemberField::HouseNo => &self.house_no,
            MemberField::Svn => &self.svn,
            MemberField::VoterName => &self.voter_name,
            MemberField::RelativeName => &self.relative_name,
            MemberField::Gender => self.gender.code(),
            MemberField::Age => &self.age,
            MemberField::Aadhaar => &self.aadhaar,
            MemberField::Dob => &self.dob,
            MemberField::CalculatedAge => &self.calculated_age,
            MemberField::AadhaarImage => self.aadhaar_image.as_deref().unwrap_or(""),
        }
    }

    /// Overwrite one field. No derived fields are touched here.
    pub fn set_field(&mut self, field: MemberField, value: String) {
        match field {
            MemberField::BoothNo => self.booth_no = value,
            MemberField::WardNo => self.ward_no = value,
            MemberField::VoterSerial => self.voter_serial = value,
            MemberField::HouseNo => self.house_no = value,
            MemberField::Svn => self.svn = value,
            MemberField::VoterName => self.voter_name = value,
            MemberField::RelativeName => self.relative_name = value,
            MemberField::Gender => self.gender = Gender::from_code(&value),
            MemberField::Age => self.age = value,
            MemberField::Aadhaar => self.aadhaar = value,
            MemberField::Dob => self.dob = value,
            MemberField::CalculatedAge => self.calculated_age = value,
            MemberField::AadhaarImage => {
                self.aadhaar_image = if value.is_empty() { None } else { Some(value) }
            }
        }
    }
}

/// Addressable record fields, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberField {
    BoothNo,
    WardNo,
    VoterSerial,
    HouseNo,
    Svn,
    VoterName,
    RelativeName,
    Gender,
    Age,
    Aadhaar,
    Dob,
    CalculatedAge,
    AadhaarImage,
}

impl MemberField {
    pub const ALL: [MemberField; 13] = [
        MemberField::BoothNo,
        MemberField::WardNo,
        MemberField::VoterSerial,
        MemberField::HouseNo,
        MemberField::Svn,
        MemberField::VoterName,
        MemberField::RelativeName,
        MemberField::Gender,
        MemberField::Age,
        MemberField::Aadhaar,
        MemberField::Dob,
        MemberField::CalculatedAge,
        MemberField::AadhaarImage,
    ];

    /// Column header used by the roll spreadsheet.
    pub fn sheet_header(self) -> &'static str {
        match self {
            MemberField::BoothNo => "बूथ संख्या",
            MemberField::WardNo => "वार्ड संख्या",
            MemberField::VoterSerial => "मतदाता क्रमांक",
            MemberField::HouseNo => "मकान नं०",
            MemberField::Svn => "SVN",
            MemberField::VoterName => "निर्वाचक का नाम",
            MemberField::RelativeName => "पिता/पति/माता का नाम",
            MemberField::Gender => "लिंग",
            MemberField::Age => "आयु",
            MemberField::Aadhaar => "आधार संख्या",
            MemberField::Dob => "जन्म तिथि",
            MemberField::CalculatedAge => "उम्र",
            MemberField::AadhaarImage => "आधार कार्ड फोटो",
        }
    }

    pub fn from_sheet_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL.into_iter().find(|f| f.sheet_header() == header)
    }
}

/// Gender codes used on the roll. An empty cell reads as `Unspecified`; any
/// other text is kept as written and goes back to the sheet unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    /// म
    Female,
    /// पु
    Male,
    /// अन्य
    Other,
    #[default]
    Unspecified,
    Unrecognized(String),
}

impl Gender {
    pub const OPTIONS: [Gender; 3] = [Gender::Female, Gender::Male, Gender::Other];

    pub fn code(&self) -> &str {
        match self {
            Gender::Female => "म",
            Gender::Male => "पु",
            Gender::Other => "अन्य",
            Gender::Unspecified => "",
            Gender::Unrecognized(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Gender::Female => "महिला",
            Gender::Male => "पुरुष",
            Gender::Other => "अन्य",
            Gender::Unspecified => "",
            Gender::Unrecognized(raw) => raw,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "म" => Gender::Female,
            "पु" => Gender::Male,
            "अन्य" => Gender::Other,
            "" => Gender::Unspecified,
            other => Gender::Unrecognized(other.to_string()),
        }
    }
}

/// One entry of the editor's gender picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderOption {
    pub code: String,
    pub label: String,
}

impl GenderOption {
    pub fn all() -> Vec<GenderOption> {
        Gender::OPTIONS
            .iter()
            .map(|g| GenderOption {
                code: g.code().to_string(),
                label: g.label().to_string(),
            })
            .collect()
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Gender::from_code(&value)
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        match value {
            Gender::Unrecognized(raw) => raw,
            known => known.code().to_string(),
        }
    }
}

/// Why a person was taken off the active roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteReason {
    #[default]
    #[serde(rename = "शादी")]
    Marriage,
    #[serde(rename = "मृत्यु")]
    Death,
    #[serde(rename = "डुप्लीकेट")]
    Duplicate,
    #[serde(rename = "पलायन")]
    Migration,
}

impl DeleteReason {
    pub const ALL: [DeleteReason; 4] = [
        DeleteReason::Marriage,
        DeleteReason::Death,
        DeleteReason::Duplicate,
        DeleteReason::Migration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeleteReason::Marriage => "शादी",
            DeleteReason::Death => "मृत्यु",
            DeleteReason::Duplicate => "डुप्लीकेट",
            DeleteReason::Migration => "पलायन",
        }
    }
}

impl fmt::Display for DeleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope returned by the Apps Script endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> GasResponse<T> {
    /// The backend's own explanation, if it gave one.
    pub fn reason(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Search state
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Booth → ward → house drill-down.
    #[default]
    Selection,
    Name,
    Svn,
}

/// Booth → ward → house selection. Empty string means "not selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFilter {
    pub booth: String,
    pub ward: String,
    pub house: String,
}

impl LocationFilter {
    /// Changing the booth resets ward and house.
    pub fn set_booth(&mut self, booth: impl Into<String>) {
        self.booth = booth.into();
        self.ward.clear();
        self.house.clear();
    }

    /// Changing the ward resets the house.
    pub fn set_ward(&mut self, ward: impl Into<String>) {
        self.ward = ward.into();
        self.house.clear();
    }

    pub fn set_house(&mut self, house: impl Into<String>) {
        self.house = house.into();
    }

    pub fn is_complete(&self) -> bool {
        !self.booth.is_empty() && !self.ward.is_empty() && !self.house.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchState {
    pub mode: SearchMode,
    pub query: String,
    pub filters: LocationFilter,
}

// =============================================================================
// Serde helpers
// =============================================================================

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(cell_to_string(&value))
}

fn gender_cell<'de, D>(deserializer: D) -> Result<Gender, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Gender::from(cell_to_string(&value)))
}

fn optional_non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = cell_to_string(&value);
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Render a sheet cell the way the backend's `toString()` would.
pub fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
