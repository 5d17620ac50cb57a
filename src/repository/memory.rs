//! In-memory repositories.
//!
//! Used by the test suite and for running the router without a database. They follow
//! the Postgres implementations' observable behavior: same filters, same ordering,
//! same `false`/`None` results for missing rows.

use std::{
    marker::PhantomData,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};

use super::{
    ContactRepository, ContentRepository, FieldValue, Fields, HealthProbe, RegulationRepository,
    RepoResult, Resource, UserRepository, nest_sections,
};
use crate::{
    auth::Role,
    models::{
        AccountChanges, Audience, ContactDraft, ContactSettings, ItemDraft, ListQuery, NewUser,
        RegulationDocument, RegulationItem, RegulationSection, SectionDraft, SectionWithItems,
        StaffMember, UserRecord,
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock only means another test thread panicked mid-write.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Text(v) => json!(v),
        FieldValue::Int(v) => json!(v),
        FieldValue::Flag(v) => json!(v),
        FieldValue::Timestamp(v) => json!(v),
    }
}

fn int(record: &Map<String, Value>, column: &str) -> i64 {
    record.get(column).and_then(Value::as_i64).unwrap_or_default()
}

// --- Content ---

/// InMemoryContentRepository
///
/// Keeps each row as a column-keyed JSON map and materializes it into `R` on read,
/// so one implementation covers every resource table.
pub struct InMemoryContentRepository<R> {
    records: Mutex<Vec<Map<String, Value>>>,
    next_id: AtomicI64,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for InMemoryContentRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> InMemoryContentRepository<R> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            _resource: PhantomData,
        }
    }

    fn materialize(record: &Map<String, Value>) -> RepoResult<R> {
        serde_json::from_value::<R>(Value::Object(record.clone()))
            .map(R::present)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    fn list(&self, query: &ListQuery, public: bool) -> RepoResult<Vec<R>> {
        let records = lock(&self.records);
        let mut matching: Vec<&Map<String, Value>> = records
            .iter()
            .filter(|r| !public || int(r, "visible") == 1)
            .filter(|r| match (public, R::CATEGORY_COLUMN, &query.category) {
                (true, Some(column), Some(category)) => {
                    r.get(column).and_then(Value::as_str) == Some(category.as_str())
                }
                _ => true,
            })
            .collect();
        matching.sort_by_key(|r| (int(r, "sort_order"), int(r, "id")));

        matching
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .map(Self::materialize)
            .collect()
    }

    fn find(&self, id: i64, public: bool) -> RepoResult<Option<R>> {
        let records = lock(&self.records);
        records
            .iter()
            .find(|r| int(r, "id") == id && (!public || int(r, "visible") == 1))
            .map(Self::materialize)
            .transpose()
    }
}

#[async_trait]
impl<R: Resource> ContentRepository<R> for InMemoryContentRepository<R> {
    async fn list_public(&self, query: &ListQuery) -> RepoResult<Vec<R>> {
        self.list(query, true)
    }

    async fn list_admin(&self, query: &ListQuery) -> RepoResult<Vec<R>> {
        self.list(query, false)
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Option<R>> {
        self.find(id, false)
    }

    async fn get_public(&self, id: i64) -> RepoResult<Option<R>> {
        self.find(id, true)
    }

    async fn create(&self, fields: Fields, author: Option<i64>) -> RepoResult<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = json!(Utc::now());

        let mut record = Map::new();
        record.insert("id".into(), json!(id));
        for (column, value) in fields {
            record.insert(column.into(), to_json(value));
        }
        if R::TRACKS_AUTHOR {
            record.insert("created_by".into(), json!(author));
        }
        record.insert("created_at".into(), now.clone());
        record.insert("updated_at".into(), now);

        lock(&self.records).push(record);
        Ok(id)
    }

    async fn update(&self, id: i64, fields: Fields) -> RepoResult<bool> {
        let mut records = lock(&self.records);
        let Some(record) = records.iter_mut().find(|r| int(r, "id") == id) else {
            return Ok(false);
        };
        for (column, value) in fields {
            record.insert(column.into(), to_json(value));
        }
        record.insert("updated_at".into(), json!(Utc::now()));
        Ok(true)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| int(r, "id") != id);
        Ok(records.len() < before)
    }
}

// --- Regulation ---

#[derive(Clone, Default)]
struct RegulationState {
    document: Option<RegulationDocument>,
    sections: Vec<RegulationSection>,
    items: Vec<RegulationItem>,
    next_section_id: i64,
    next_item_id: i64,
}

/// InMemoryRegulationRepository
///
/// Section deletion works on a copy of the state and swaps it in only when every
/// step succeeded. `failing_section_deletes` injects a failure between deleting the
/// items and deleting the section. `failing_pdf_updates` rejects every PDF path change.
pub struct InMemoryRegulationRepository {
    state: Mutex<RegulationState>,
    fail_section_deletes: bool,
    fail_pdf_updates: bool,
}

impl Default for InMemoryRegulationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegulationRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegulationState::default()),
            fail_section_deletes: false,
            fail_pdf_updates: false,
        }
    }

    pub fn failing_section_deletes() -> Self {
        Self {
            fail_section_deletes: true,
            ..Self::new()
        }
    }

    pub fn failing_pdf_updates() -> Self {
        Self {
            fail_pdf_updates: true,
            ..Self::new()
        }
    }

    fn touch_document(state: &mut RegulationState) -> &mut RegulationDocument {
        let document = state.document.get_or_insert_with(RegulationDocument::default);
        document.updated_at = Some(Utc::now());
        document
    }
}

fn ordered<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> (i32, i64),
{
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl RegulationRepository for InMemoryRegulationRepository {
    async fn document(&self) -> RepoResult<RegulationDocument> {
        Ok(lock(&self.state).document.clone().unwrap_or_default())
    }

    async fn update_content_html(&self, html: &str) -> RepoResult<()> {
        let mut state = lock(&self.state);
        Self::touch_document(&mut state).content_html = html.to_string();
        Ok(())
    }

    async fn update_pdf_path(&self, path: &str) -> RepoResult<()> {
        if self.fail_pdf_updates {
            return Err(sqlx::Error::Protocol("injected pdf update failure".into()));
        }
        let mut state = lock(&self.state);
        Self::touch_document(&mut state).pdf_path = Some(path.to_string());
        Ok(())
    }

    async fn sections(&self, audience: Audience) -> RepoResult<Vec<SectionWithItems>> {
        let state = lock(&self.state);
        let visible_only = audience == Audience::Public;

        let sections: Vec<RegulationSection> = state
            .sections
            .iter()
            .filter(|s| !visible_only || s.visible == 1)
            .cloned()
            .collect();
        let items: Vec<RegulationItem> = state
            .items
            .iter()
            .filter(|i| !visible_only || i.visible == 1)
            .cloned()
            .collect();

        Ok(nest_sections(
            ordered(sections, |s| (s.sort_order, s.id)),
            ordered(items, |i| (i.sort_order, i.id)),
        ))
    }

    async fn section_exists(&self, id: i64) -> RepoResult<bool> {
        Ok(lock(&self.state).sections.iter().any(|s| s.id == id))
    }

    async fn create_section(&self, draft: &SectionDraft) -> RepoResult<i64> {
        let mut state = lock(&self.state);
        state.next_section_id += 1;
        let id = state.next_section_id;
        state.sections.push(RegulationSection {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            sort_order: draft.sort_order,
            visible: draft.visible,
        });
        Ok(id)
    }

    async fn update_section(&self, id: i64, draft: &SectionDraft) -> RepoResult<bool> {
        let mut state = lock(&self.state);
        let Some(section) = state.sections.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };
        section.title = draft.title.clone();
        section.description = draft.description.clone();
        section.sort_order = draft.sort_order;
        section.visible = draft.visible;
        Ok(true)
    }

    async fn delete_section(&self, id: i64) -> RepoResult<bool> {
        let mut state = lock(&self.state);
        let mut next = state.clone();

        next.items.retain(|i| i.section_id != id);
        if self.fail_section_deletes {
            return Err(sqlx::Error::Protocol("injected section delete failure".into()));
        }
        let before = next.sections.len();
        next.sections.retain(|s| s.id != id);
        let removed = next.sections.len() < before;

        *state = next;
        Ok(removed)
    }

    async fn create_item(&self, draft: &ItemDraft) -> RepoResult<i64> {
        let mut state = lock(&self.state);
        state.next_item_id += 1;
        let id = state.next_item_id;
        state.items.push(RegulationItem {
            id,
            section_id: draft.section_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            sort_order: draft.sort_order,
            visible: draft.visible,
        });
        Ok(id)
    }

    async fn update_item(&self, id: i64, draft: &ItemDraft) -> RepoResult<bool> {
        let mut state = lock(&self.state);
        let Some(item) = state.items.iter_mut().find(|i| i.id == id) else {
            return Ok(false);
        };
        item.section_id = draft.section_id;
        item.title = draft.title.clone();
        item.content = draft.content.clone();
        item.sort_order = draft.sort_order;
        item.visible = draft.visible;
        Ok(true)
    }

    async fn delete_item(&self, id: i64) -> RepoResult<bool> {
        let mut state = lock(&self.state);
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        Ok(state.items.len() < before)
    }
}

// --- Contact ---

/// InMemoryContactRepository
///
/// `failing_writes` makes every update fail while reads keep working.
#[derive(Default)]
pub struct InMemoryContactRepository {
    settings: Mutex<ContactSettings>,
    fail_writes: bool,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes {
            return Err(sqlx::Error::Protocol("injected contact write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn settings(&self) -> RepoResult<ContactSettings> {
        Ok(lock(&self.settings).clone())
    }

    async fn update(&self, draft: &ContactDraft) -> RepoResult<()> {
        self.check_writable()?;
        let mut settings = lock(&self.settings);
        let hero_image = settings.hero_image.take();
        *settings = ContactSettings {
            phones: draft.phones.clone(),
            emails: draft.emails.clone(),
            address: draft.address.clone().unwrap_or_default(),
            schedule: draft.schedule.clone().unwrap_or_default(),
            social_text: draft.social_text.clone().unwrap_or_default(),
            socials: draft.socials.clone(),
            hero_image,
        };
        Ok(())
    }

    async fn update_hero_image(&self, url: &str) -> RepoResult<()> {
        self.check_writable()?;
        lock(&self.settings).hero_image = Some(url.to_string());
        Ok(())
    }
}

// --- Users ---

/// InMemoryUserRepository
///
/// Seeded with `with_users`. Ids of created users continue after the highest seed id.
pub struct InMemoryUserRepository {
    users: Mutex<Vec<UserRecord>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    pub fn with_users(users: Vec<UserRecord>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    fn staff_view(user: &UserRecord) -> Option<StaffMember> {
        let role = Role::parse(&user.role).filter(Role::is_staff)?;
        Some(StaffMember {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role,
            is_active: user.is_active,
            email_verified_at: user.email_verified_at,
            verified: user.email_verified_at.is_some(),
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn list_staff(&self) -> RepoResult<Vec<StaffMember>> {
        let mut staff: Vec<StaffMember> =
            lock(&self.users).iter().filter_map(Self::staff_view).collect();
        staff.sort_by(|a, b| {
            (a.role != Role::Superadmin)
                .cmp(&(b.role != Role::Superadmin))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(staff)
    }

    async fn find_staff(&self, id: i64) -> RepoResult<Option<StaffMember>> {
        Ok(lock(&self.users)
            .iter()
            .find(|u| u.id == id)
            .and_then(Self::staff_view))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(lock(&self.users)
            .iter()
            .any(|u| u.email.to_lowercase() == email))
    }

    async fn create(&self, user: NewUser) -> RepoResult<i64> {
        let mut users = lock(&self.users);
        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        users.push(UserRecord {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            is_active: true,
            email_verified_at: None,
        });
        Ok(id)
    }

    async fn update_account(&self, id: i64, changes: &AccountChanges) -> RepoResult<bool> {
        let mut users = lock(&self.users);
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(role) = changes.role {
            user.role = role.as_str().to_string();
        }
        if let Some(verified) = changes.verified {
            user.email_verified_at = verified.then(Utc::now);
        }
        Ok(true)
    }

    async fn set_password_hash(&self, id: i64, hash: &str) -> RepoResult<bool> {
        let mut users = lock(&self.users);
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.password_hash = hash.to_string();
        Ok(true)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let mut users = lock(&self.users);
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }
}

// --- Health ---

pub struct InMemoryHealthProbe {
    healthy: bool,
}

impl InMemoryHealthProbe {
    pub fn healthy() -> Self {
        Self { healthy: true }
    }

    pub fn unreachable() -> Self {
        Self { healthy: false }
    }
}

#[async_trait]
impl HealthProbe for InMemoryHealthProbe {
    async fn ping(&self) -> RepoResult<i32> {
        if self.healthy {
            Ok(1)
        } else {
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
