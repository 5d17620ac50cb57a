use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::{auth::Role, error::ApiError};

// --- Content Schemas (Mapped to Database) ---
//
// Every content table shares `visible` (SMALLINT 0/1) and `sort_order`, which is
// exposed to clients as `order`. The `sort_order` alias lets rows be rebuilt from
// column-keyed maps by the in-memory repositories.

/// News
///
/// A dated announcement. Public listings show only visible rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    #[ts(type = "string")]
    pub published_at: DateTime<Utc>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub created_by: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Event
///
/// A calendar entry. `ends_at` is optional for single-moment events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub starts_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub created_by: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Course
///
/// A short course or workshop, grouped by `category` for the public filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub created_by: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Program
///
/// A degree or academic offering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub modality: Option<String>,
    pub duration: Option<String>,
    pub shift: Option<String>,
    pub image_url: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub created_by: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// AdmissionStep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AdmissionStep {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// FaqItem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct FaqItem {
    pub id: i64,
    pub question: String,
    pub short_answer: Option<String>,
    pub long_answer: Option<String>,
    pub visible: i16,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Content Request Payloads ---
//
// Admin forms send loosely typed JSON ("1", 1, true, "on"), so flags and numbers
// go through the lenient deserializers below. Required fields are checked by the
// resource definitions, not by serde, so a missing title is a 400 with a message.

/// NewsInput
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewsInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    /// RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`. Defaults to now.
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

/// EventInput
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Defaults to 08:00 UTC of the current day.
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

/// CourseInput
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

/// ProgramInput
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProgramInput {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub modality: Option<String>,
    pub duration: Option<String>,
    pub shift: Option<String>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

/// Shared by admission steps and services, which carry the same two fields.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TitledInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

/// FaqInput
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FaqInput {
    pub question: Option<String>,
    pub short_answer: Option<String>,
    pub long_answer: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
}

// --- Regulation ---

/// RegulationDocument
///
/// The singleton row holding the full regulation text and the uploaded PDF.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct RegulationDocument {
    pub content_html: String,
    pub pdf_path: Option<String>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct RegulationSection {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub visible: i16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct RegulationItem {
    pub id: i64,
    pub section_id: i64,
    pub title: Option<String>,
    pub content: String,
    #[serde(rename = "order", alias = "sort_order")]
    pub sort_order: i32,
    pub visible: i16,
}

/// A section with its items nested, as rendered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct SectionWithItems {
    #[serde(flatten)]
    pub section: RegulationSection,
    pub items: Vec<RegulationItem>,
}

/// RegulationView
///
/// Response of `GET /regulation` and `GET /admin/regulation`.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct RegulationView {
    pub content_html: String,
    pub pdf_path: Option<String>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
    pub sections: Vec<SectionWithItems>,
}

/// Which rows a structured regulation read may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Visible sections with their visible items only.
    Public,
    /// Everything.
    Admin,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegulationContentInput {
    pub content_html: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SectionInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ItemInput {
    #[serde(default, deserialize_with = "lenient_int")]
    pub section_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, alias = "sort_order", deserialize_with = "lenient_int")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub visible: Option<bool>,
}

/// Validated section values, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDraft {
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub visible: i16,
}

/// Validated item values, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub section_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub sort_order: i32,
    pub visible: i16,
}

impl SectionInput {
    pub fn into_draft(self) -> Result<SectionDraft, ApiError> {
        Ok(SectionDraft {
            title: required_text(self.title.as_deref(), "title")?,
            description: optional_text(self.description),
            sort_order: sort_order(self.order),
            visible: visible_flag(self.visible),
        })
    }
}

impl ItemInput {
    pub fn into_draft(self) -> Result<ItemDraft, ApiError> {
        let section_id = self
            .section_id
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::validation("section_id and content are required"))?;
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ApiError::validation("section_id and content are required"))?;

        Ok(ItemDraft {
            section_id,
            title: optional_text(self.title),
            content,
            sort_order: sort_order(self.order),
            visible: visible_flag(self.visible),
        })
    }
}

// --- Contact ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SocialLink {
    pub label: String,
    pub url: String,
}

/// ContactSettings
///
/// Public view of the contact singleton. Text fields are never null on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct ContactSettings {
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub address: String,
    pub schedule: String,
    pub social_text: String,
    pub socials: Vec<SocialLink>,
    pub hero_image: Option<String>,
}

/// Raw `contact_settings` row. List columns hold JSON arrays as TEXT.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ContactRow {
    pub id: i64,
    pub phones: Option<String>,
    pub emails: Option<String>,
    pub address: Option<String>,
    pub schedule: Option<String>,
    pub social_text: Option<String>,
    pub socials: Option<String>,
    pub hero_image: Option<String>,
}

impl From<ContactRow> for ContactSettings {
    fn from(row: ContactRow) -> Self {
        Self {
            phones: decode_string_list(row.phones.as_deref()),
            emails: decode_string_list(row.emails.as_deref()),
            address: row.address.unwrap_or_default(),
            schedule: row.schedule.unwrap_or_default(),
            social_text: row.social_text.unwrap_or_default(),
            socials: decode_json_list(row.socials.as_deref()),
            hero_image: row.hero_image,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SocialLinkInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

/// ContactUpdate
///
/// Body of `PUT /admin/contact`. The whole record is replaced, except `hero_image`
/// which only changes through the upload route.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContactUpdate {
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub phones: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub emails: Vec<String>,
    pub address: Option<String>,
    pub schedule: Option<String>,
    pub social_text: Option<String>,
    #[serde(default)]
    pub socials: Vec<SocialLinkInput>,
}

/// Cleaned contact values, ready to persist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactDraft {
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub address: Option<String>,
    pub schedule: Option<String>,
    pub social_text: Option<String>,
    pub socials: Vec<SocialLink>,
}

impl ContactUpdate {
    /// Trims list entries, drops blanks, and keeps only socials with both label and url.
    pub fn normalize(self) -> ContactDraft {
        let clean = |values: Vec<String>| -> Vec<String> {
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };

        let socials = self
            .socials
            .into_iter()
            .filter_map(|link| {
                let label = link.label.unwrap_or_default().trim().to_string();
                let url = link.url.unwrap_or_default().trim().to_string();
                (!label.is_empty() && !url.is_empty()).then_some(SocialLink { label, url })
            })
            .collect();

        ContactDraft {
            phones: clean(self.phones),
            emails: clean(self.emails),
            address: self.address,
            schedule: self.schedule,
            social_text: self.social_text,
            socials,
        }
    }
}

/// Decodes a JSON array column. Null, empty or malformed input is an empty list.
pub fn decode_json_list<T: DeserializeOwned>(raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Like `decode_json_list`, but scalar entries (numbers, booleans) become strings.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    decode_json_list::<Value>(raw)
        .iter()
        .filter_map(scalar_to_string)
        .collect()
}

// --- Users ---

/// Stored role name did not match any `Role`.
#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or(UnknownRole(value))
    }
}

/// UserRecord
///
/// Full credential row. Never serialized: it carries the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// PublicUser
///
/// Identity returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// StaffMember
///
/// An admin or superadmin as listed in user management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct StaffMember {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub email_verified_at: Option<DateTime<Utc>>,
    pub verified: bool,
}

/// Account to insert. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update of a staff account. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountChanges {
    pub is_active: Option<bool>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.role.is_none() && self.verified.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateStaffRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStaffRequest {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_active: Option<bool>,
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffList {
    pub items: Vec<StaffMember>,
}

/// Confirmation for actions targeting a single account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffActionResponse {
    pub message: String,
    pub user_id: i64,
    pub user_email: String,
}

// --- Pagination & Envelopes ---

/// PageQuery
///
/// Raw `page`, `limit` and `category` query parameters. Numbers are kept as strings
/// so non-numeric input degrades to the minimum instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
}

/// Resolved pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
    pub category: Option<String>,
}

impl PageQuery {
    /// resolve
    ///
    /// `page` and `limit` are at least 1; missing values take 1 and `default_limit`.
    /// A blank category means no filter.
    pub fn resolve(&self, default_limit: i64) -> ListQuery {
        let page = self.page.as_deref().map_or(1, parse_count).max(1);
        let limit = self
            .limit
            .as_deref()
            .map_or(default_limit, parse_count)
            .max(1);

        ListQuery {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
            category: self
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        }
    }
}

impl ListQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        let (page, limit) = (page.max(1), limit.max(1));
        Self {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
            category: None,
        }
    }
}

fn parse_count(raw: &str) -> i64 {
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// Page<T>
///
/// List response envelope. `category` is only present on filterable listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: i64,
    pub limit: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreatedResponse {
    pub id: i64,
    pub message: String,
}

// --- Normalization Helpers ---

/// Trimmed required text. Missing or blank is a validation error naming the field.
pub fn required_text(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))
}

/// Trimmed optional text; blank becomes `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `visible` stored as 0/1, defaulting to visible.
pub fn visible_flag(value: Option<bool>) -> i16 {
    match value {
        Some(false) => 0,
        _ => 1,
    }
}

/// Display order, defaulting to 0 and never negative.
pub fn sort_order(value: Option<i64>) -> i32 {
    value
        .unwrap_or(0)
        .clamp(0, i64::from(i32::MAX))
        .try_into()
        .unwrap_or(0)
}

/// Parses the timestamp formats admin forms produce. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Optional timestamp field: absent or blank is `None`, unparseable is a 400.
pub fn optional_timestamp(
    value: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("{field} is not a valid date"))),
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Minimal shape check: one `@`, a non-empty local part and a dotted domain.
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Paths saved from Windows hosts may use backslashes.
pub fn normalize_path_separators(value: Option<String>) -> Option<String> {
    value.map(|v| v.replace('\\', "/"))
}

// --- Lenient Deserializers ---

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn flag_from_value(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Some(!matches!(
            s.trim().to_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        )),
        Value::Array(a) => Some(!a.is_empty()),
        Value::Object(o) => Some(!o.is_empty()),
    }
}

fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Accepts booleans, numbers and the usual form strings ("1", "true", "on").
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(flag_from_value))
}

/// Accepts numbers and numeric strings. Anything else is treated as absent.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(int_from_value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// A list of scalars, each turned into a string. Non-lists become empty.
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(values)) => values.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_and_defaults() {
        let q = PageQuery::default().resolve(20);
        assert_eq!((q.page, q.limit, q.offset), (1, 20, 0));

        let q = PageQuery {
            page: Some("3".into()),
            limit: Some("10".into()),
            category: Some("  ".into()),
        }
        .resolve(20);
        assert_eq!((q.page, q.limit, q.offset), (3, 10, 20));
        assert_eq!(q.category, None);

        let q = PageQuery {
            page: Some("abc".into()),
            limit: Some("-5".into()),
            category: None,
        }
        .resolve(50);
        assert_eq!((q.page, q.limit, q.offset), (1, 1, 0));
    }

    #[test]
    fn timestamps_in_form_formats() {
        assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01 10:00:00").is_some());
        assert!(parse_timestamp("2025-03-01T10:00").is_some());
        assert_eq!(
            parse_timestamp("2025-03-01").map(|d| d.to_rfc3339()),
            Some("2025-03-01T00:00:00+00:00".to_string())
        );
        assert!(parse_timestamp("next tuesday").is_none());
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("admin@campus.edu"));
        assert!(!looks_like_email("admin@campus"));
        assert!(!looks_like_email("a b@campus.edu"));
        assert!(!looks_like_email("@campus.edu"));
        assert!(!looks_like_email("a@b@campus.edu"));
    }

    #[test]
    fn malformed_json_columns_decode_to_empty() {
        assert!(decode_string_list(Some("not json")).is_empty());
        assert!(decode_string_list(None).is_empty());
        assert_eq!(decode_string_list(Some(r#"["555", 123]"#)), vec!["555", "123"]);
        let socials: Vec<SocialLink> =
            decode_json_list(Some(r#"[{"label":"X","url":"https://x"}, {"label":1}]"#));
        assert_eq!(socials.len(), 1);
    }
}
