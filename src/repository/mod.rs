use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{FromRow, PgPool, postgres::PgRow};

use crate::{
    error::ApiError,
    models::{
        AccountChanges, AdmissionStep, Audience, ContactDraft, ContactSettings, Course, Event,
        FaqItem, ItemDraft, ListQuery, NewUser, News, Program, RegulationDocument, RegulationItem,
        RegulationSection, SectionDraft, SectionWithItems, Service, StaffMember, UserRecord,
    },
};

pub mod memory;
pub mod postgres;
pub mod resources;

pub use memory::{
    InMemoryContactRepository, InMemoryContentRepository, InMemoryHealthProbe,
    InMemoryRegulationRepository, InMemoryUserRepository,
};
pub use postgres::{
    PgContactRepository, PgContentRepository, PgHealthProbe, PgRegulationRepository,
    PgUserRepository,
};

/// Repository calls surface driver errors untouched; `ApiError` decides what the client sees.
pub type RepoResult<T> = Result<T, sqlx::Error>;

// --- Content Resources ---

/// A single column value headed for an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Int(i32),
    Flag(i16),
    Timestamp(Option<DateTime<Utc>>),
}

/// Validated `(column, value)` pairs in insertion order.
pub type Fields = Vec<(&'static str, FieldValue)>;

/// Resource
///
/// Describes one content table: how its rows look, which payload writes it, and how
/// that payload is validated into column values. Every content table shares the
/// `id`, `visible`, `sort_order`, `created_at`, `updated_at` columns, so a single
/// generic repository and a single set of handlers serve all of them.
pub trait Resource:
    for<'r> FromRow<'r, PgRow>
    + Serialize
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Admin write payload.
    type Input: DeserializeOwned + Send + 'static;

    /// Table name. Only ever a constant, never user input.
    const TABLE: &'static str;
    /// Human label used in messages ("News not found").
    const LABEL: &'static str;
    /// Column list for SELECT, matching the row struct.
    const COLUMNS: &'static str;
    /// Column filtered by the public `category` query parameter, if any.
    const CATEGORY_COLUMN: Option<&'static str> = None;
    /// Whether the table records `created_by`.
    const TRACKS_AUTHOR: bool = false;
    /// Default page size of the public listing.
    const PUBLIC_LIMIT: i64 = 50;

    /// Validates and normalizes a payload into column values.
    fn fields(input: Self::Input) -> Result<Fields, ApiError>;

    /// Read-side cleanup applied to every row leaving the repository.
    fn present(self) -> Self {
        self
    }

    /// Picks this resource's repository out of the registry.
    fn repository(repos: &Repositories) -> ContentRepoState<Self>;
}

/// Default page size of every admin listing.
pub const ADMIN_LIMIT: i64 = 100;

/// ContentRepository
///
/// Persistence contract for a content table. Public reads only ever see rows with
/// `visible = 1`; admin reads see everything. Both order by `(sort_order, id)`.
#[async_trait]
pub trait ContentRepository<R: Resource>: Send + Sync {
    async fn list_public(&self, query: &ListQuery) -> RepoResult<Vec<R>>;
    async fn list_admin(&self, query: &ListQuery) -> RepoResult<Vec<R>>;
    async fn get_by_id(&self, id: i64) -> RepoResult<Option<R>>;
    /// Like `get_by_id`, but hidden rows are reported as absent.
    async fn get_public(&self, id: i64) -> RepoResult<Option<R>>;
    async fn create(&self, fields: Fields, author: Option<i64>) -> RepoResult<i64>;
    /// Replaces the given columns and refreshes `updated_at`. `false` if no row matched.
    async fn update(&self, id: i64, fields: Fields) -> RepoResult<bool>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

pub type ContentRepoState<R> = Arc<dyn ContentRepository<R>>;

// --- Regulation ---

/// RegulationRepository
///
/// The regulation singleton plus its two-level outline of sections and items.
#[async_trait]
pub trait RegulationRepository: Send + Sync {
    /// The singleton, or an empty document when none has been written yet.
    async fn document(&self) -> RepoResult<RegulationDocument>;
    async fn update_content_html(&self, html: &str) -> RepoResult<()>;
    async fn update_pdf_path(&self, path: &str) -> RepoResult<()>;

    async fn sections(&self, audience: Audience) -> RepoResult<Vec<SectionWithItems>>;
    async fn section_exists(&self, id: i64) -> RepoResult<bool>;
    async fn create_section(&self, draft: &SectionDraft) -> RepoResult<i64>;
    async fn update_section(&self, id: i64, draft: &SectionDraft) -> RepoResult<bool>;
    /// Removes a section and all of its items atomically.
    async fn delete_section(&self, id: i64) -> RepoResult<bool>;

    async fn create_item(&self, draft: &ItemDraft) -> RepoResult<i64>;
    async fn update_item(&self, id: i64, draft: &ItemDraft) -> RepoResult<bool>;
    async fn delete_item(&self, id: i64) -> RepoResult<bool>;
}

/// Groups items under their sections, keeping the incoming order of both.
/// Items whose section is not in `sections` are dropped.
pub fn nest_sections(
    sections: Vec<RegulationSection>,
    items: Vec<RegulationItem>,
) -> Vec<SectionWithItems> {
    let mut by_section: HashMap<i64, Vec<RegulationItem>> = HashMap::new();
    for item in items {
        by_section.entry(item.section_id).or_default().push(item);
    }

    sections
        .into_iter()
        .map(|section| {
            let items = by_section.remove(&section.id).unwrap_or_default();
            SectionWithItems { section, items }
        })
        .collect()
}

// --- Contact ---

/// ContactRepository
///
/// The contact singleton. Reads create the row on first access.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn settings(&self) -> RepoResult<ContactSettings>;
    async fn update(&self, draft: &ContactDraft) -> RepoResult<()>;
    async fn update_hero_image(&self, url: &str) -> RepoResult<()>;
}

// --- Users ---

/// UserRepository
///
/// Credential store and staff management.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Looks up by normalized (lowercase) email.
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>>;
    /// Admins and superadmins, superadmins first, then by name.
    async fn list_staff(&self) -> RepoResult<Vec<StaffMember>>;
    /// A staff account by id. Non-staff users are reported as absent.
    async fn find_staff(&self, id: i64) -> RepoResult<Option<StaffMember>>;
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;
    async fn create(&self, user: NewUser) -> RepoResult<i64>;
    async fn update_account(&self, id: i64, changes: &AccountChanges) -> RepoResult<bool>;
    async fn set_password_hash(&self, id: i64, hash: &str) -> RepoResult<bool>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

// --- Health ---

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Round-trips `SELECT 1`.
    async fn ping(&self) -> RepoResult<i32>;
}

// --- Registry ---

/// Repositories
///
/// Every persistence service the handlers use, each behind a trait object so tests
/// can swap in the in-memory implementations.
#[derive(Clone)]
pub struct Repositories {
    pub news: ContentRepoState<News>,
    pub events: ContentRepoState<Event>,
    pub courses: ContentRepoState<Course>,
    pub programs: ContentRepoState<Program>,
    pub admissions: ContentRepoState<AdmissionStep>,
    pub services: ContentRepoState<Service>,
    pub faq: ContentRepoState<FaqItem>,
    pub regulation: Arc<dyn RegulationRepository>,
    pub contact: Arc<dyn ContactRepository>,
    pub users: Arc<dyn UserRepository>,
    pub health: Arc<dyn HealthProbe>,
}

impl Repositories {
    /// Postgres-backed registry sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            news: Arc::new(PgContentRepository::<News>::new(pool.clone())),
            events: Arc::new(PgContentRepository::<Event>::new(pool.clone())),
            courses: Arc::new(PgContentRepository::<Course>::new(pool.clone())),
            programs: Arc::new(PgContentRepository::<Program>::new(pool.clone())),
            admissions: Arc::new(PgContentRepository::<AdmissionStep>::new(pool.clone())),
            services: Arc::new(PgContentRepository::<Service>::new(pool.clone())),
            faq: Arc::new(PgContentRepository::<FaqItem>::new(pool.clone())),
            regulation: Arc::new(PgRegulationRepository::new(pool.clone())),
            contact: Arc::new(PgContactRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            health: Arc::new(PgHealthProbe::new(pool)),
        }
    }

    /// Empty in-memory registry with a healthy probe.
    pub fn in_memory() -> Self {
        Self {
            news: Arc::new(InMemoryContentRepository::<News>::new()),
            events: Arc::new(InMemoryContentRepository::<Event>::new()),
            courses: Arc::new(InMemoryContentRepository::<Course>::new()),
            programs: Arc::new(InMemoryContentRepository::<Program>::new()),
            admissions: Arc::new(InMemoryContentRepository::<AdmissionStep>::new()),
            services: Arc::new(InMemoryContentRepository::<Service>::new()),
            faq: Arc::new(InMemoryContentRepository::<FaqItem>::new()),
            regulation: Arc::new(InMemoryRegulationRepository::new()),
            contact: Arc::new(InMemoryContactRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            health: Arc::new(InMemoryHealthProbe::healthy()),
        }
    }

    /// Replaces the user store, keeping everything else.
    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = users;
        self
    }

    pub fn with_regulation(mut self, regulation: Arc<dyn RegulationRepository>) -> Self {
        self.regulation = regulation;
        self
    }

    pub fn with_contact(mut self, contact: Arc<dyn ContactRepository>) -> Self {
        self.contact = contact;
        self
    }

    pub fn with_health(mut self, health: Arc<dyn HealthProbe>) -> Self {
        self.health = health;
        self
    }
}
