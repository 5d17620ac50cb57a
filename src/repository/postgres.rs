use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{
    ContactRepository, ContentRepository, FieldValue, Fields, HealthProbe, RegulationRepository,
    RepoResult, Resource, UserRepository, nest_sections,
};
use crate::models::{
    AccountChanges, Audience, ContactDraft, ContactRow, ContactSettings, ItemDraft, ListQuery,
    NewUser, RegulationDocument, RegulationItem, RegulationSection, SectionDraft,
    SectionWithItems, StaffMember, UserRecord,
};

/// Binds one field value. Table and column names are pushed as constants by the
/// callers; only values ever reach the query as parameters.
fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: FieldValue) {
    match value {
        FieldValue::Text(v) => builder.push_bind(v),
        FieldValue::Int(v) => builder.push_bind(v),
        FieldValue::Flag(v) => builder.push_bind(v),
        FieldValue::Timestamp(v) => builder.push_bind(v),
    };
}

// --- Content ---

/// PgContentRepository
///
/// One generic implementation serving every `Resource` table.
pub struct PgContentRepository<R> {
    pool: PgPool,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> PgContentRepository<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _resource: PhantomData,
        }
    }

    /// Shared SELECT for both listings. Only the public listing filters by visibility
    /// and category.
    async fn list(&self, query: &ListQuery, public: bool) -> RepoResult<Vec<R>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM {}", R::COLUMNS, R::TABLE));

        if public {
            builder.push(" WHERE visible = 1");
            if let (Some(column), Some(category)) = (R::CATEGORY_COLUMN, &query.category) {
                builder.push(" AND ");
                builder.push(column);
                builder.push(" = ");
                builder.push_bind(category.clone());
            }
        }

        builder.push(" ORDER BY sort_order ASC, id ASC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        let rows = builder
            .build_query_as::<R>()
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("list {} error: {:?}", R::TABLE, e))?;

        Ok(rows.into_iter().map(R::present).collect())
    }

    async fn fetch_one(&self, id: i64, public: bool) -> RepoResult<Option<R>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE id = ",
            R::COLUMNS,
            R::TABLE
        ));
        builder.push_bind(id);
        if public {
            builder.push(" AND visible = 1");
        }

        let row = builder
            .build_query_as::<R>()
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("get {} error: {:?}", R::TABLE, e))?;

        Ok(row.map(R::present))
    }
}

#[async_trait]
impl<R: Resource> ContentRepository<R> for PgContentRepository<R> {
    async fn list_public(&self, query: &ListQuery) -> RepoResult<Vec<R>> {
        self.list(query, true).await
    }

    async fn list_admin(&self, query: &ListQuery) -> RepoResult<Vec<R>> {
        self.list(query, false).await
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Option<R>> {
        self.fetch_one(id, false).await
    }

    async fn get_public(&self, id: i64) -> RepoResult<Option<R>> {
        self.fetch_one(id, true).await
    }

    /// create
    ///
    /// `INSERT ... RETURNING id` built from the validated column list.
    async fn create(&self, fields: Fields, author: Option<i64>) -> RepoResult<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (", R::TABLE));

        let columns: Vec<&str> = fields.iter().map(|(column, _)| *column).collect();
        builder.push(columns.join(", "));
        if R::TRACKS_AUTHOR {
            builder.push(", created_by");
        }

        builder.push(") VALUES (");
        for (index, (_, value)) in fields.into_iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        if R::TRACKS_AUTHOR {
            builder.push(", ");
            builder.push_bind(author);
        }
        builder.push(") RETURNING id");

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("create {} error: {:?}", R::TABLE, e))
    }

    async fn update(&self, id: i64, fields: Fields) -> RepoResult<bool> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("UPDATE {} SET ", R::TABLE));

        for (column, value) in fields {
            builder.push(column);
            builder.push(" = ");
            push_value(&mut builder, value);
            builder.push(", ");
        }
        builder.push("updated_at = NOW() WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("update {} error: {:?}", R::TABLE, e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", R::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("delete {} error: {:?}", R::TABLE, e))?;

        Ok(result.rows_affected() > 0)
    }
}

// --- Regulation ---

pub struct PgRegulationRepository {
    pool: PgPool,
}

impl PgRegulationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Id of the singleton row, inserting an empty document if there is none.
    /// The unique `singleton` key turns a concurrent first insert into a no-op.
    async fn ensure_document(&self) -> RepoResult<i64> {
        const SELECT: &str = "SELECT id FROM regulations ORDER BY id ASC LIMIT 1";

        if let Some(id) = sqlx::query_scalar::<_, i64>(SELECT)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(id);
        }

        sqlx::query(
            "INSERT INTO regulations (content_html, pdf_path) VALUES ('', NULL) \
             ON CONFLICT (singleton) DO NOTHING",
        )
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("ensure_document error: {:?}", e))?;

        sqlx::query_scalar::<_, i64>(SELECT)
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl RegulationRepository for PgRegulationRepository {
    async fn document(&self) -> RepoResult<RegulationDocument> {
        let row = sqlx::query_as::<_, RegulationDocument>(
            "SELECT content_html, pdf_path, updated_at FROM regulations ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.unwrap_or_default())
    }

    async fn update_content_html(&self, html: &str) -> RepoResult<()> {
        let id = self.ensure_document().await?;
        sqlx::query("UPDATE regulations SET content_html = $1, updated_at = NOW() WHERE id = $2")
            .bind(html)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_pdf_path(&self, path: &str) -> RepoResult<()> {
        let id = self.ensure_document().await?;
        sqlx::query("UPDATE regulations SET pdf_path = $1, updated_at = NOW() WHERE id = $2")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// sections
    ///
    /// Two queries: the sections, then every item belonging to them. Public reads
    /// drop hidden sections and hidden items.
    async fn sections(&self, audience: Audience) -> RepoResult<Vec<SectionWithItems>> {
        let visible_only = audience == Audience::Public;

        let sections = sqlx::query_as::<_, RegulationSection>(
            "SELECT id, title, description, sort_order, visible FROM regulation_sections \
             WHERE ($1 = FALSE OR visible = 1) ORDER BY sort_order ASC, id ASC",
        )
        .bind(visible_only)
        .fetch_all(&self.pool)
        .await?;

        if sections.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = sections.iter().map(|s| s.id).collect();
        let items = sqlx::query_as::<_, RegulationItem>(
            "SELECT id, section_id, title, content, sort_order, visible FROM regulation_items \
             WHERE section_id = ANY($1) AND ($2 = FALSE OR visible = 1) \
             ORDER BY sort_order ASC, id ASC",
        )
        .bind(&ids)
        .bind(visible_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(nest_sections(sections, items))
    }

    async fn section_exists(&self, id: i64) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM regulation_sections WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    async fn create_section(&self, draft: &SectionDraft) -> RepoResult<i64> {
        sqlx::query_scalar(
            "INSERT INTO regulation_sections (title, description, sort_order, visible) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.sort_order)
        .bind(draft.visible)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_section(&self, id: i64, draft: &SectionDraft) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE regulation_sections SET title = $1, description = $2, sort_order = $3, \
             visible = $4, updated_at = NOW() WHERE id = $5",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.sort_order)
        .bind(draft.visible)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// delete_section
    ///
    /// Items first, then the section, inside one transaction. Any failure drops the
    /// transaction uncommitted, which rolls both statements back.
    async fn delete_section(&self, id: i64) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM regulation_items WHERE section_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| tracing::error!("delete_section items error: {:?}", e))?;

        let result = sqlx::query("DELETE FROM regulation_sections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .inspect_err(|e| tracing::error!("delete_section error: {:?}", e))?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_item(&self, draft: &ItemDraft) -> RepoResult<i64> {
        sqlx::query_scalar(
            "INSERT INTO regulation_items (section_id, title, content, sort_order, visible) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(draft.section_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.sort_order)
        .bind(draft.visible)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_item(&self, id: i64, draft: &ItemDraft) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE regulation_items SET section_id = $1, title = $2, content = $3, \
             sort_order = $4, visible = $5, updated_at = NOW() WHERE id = $6",
        )
        .bind(draft.section_id)
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.sort_order)
        .bind(draft.visible)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM regulation_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Contact ---

pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The singleton row, created with empty lists when the table is empty. Concurrent
    /// first reads race on the unique `singleton` key and all end up reading one row.
    async fn ensure_row(&self) -> RepoResult<ContactRow> {
        const SELECT: &str = "SELECT id, phones, emails, address, schedule, social_text, socials, \
                              hero_image FROM contact_settings ORDER BY id ASC LIMIT 1";

        if let Some(row) = sqlx::query_as::<_, ContactRow>(SELECT)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(row);
        }

        sqlx::query(
            "INSERT INTO contact_settings (phones, emails, socials) VALUES ('[]', '[]', '[]') \
             ON CONFLICT (singleton) DO NOTHING",
        )
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("ensure contact row error: {:?}", e))?;

        sqlx::query_as::<_, ContactRow>(SELECT)
            .fetch_one(&self.pool)
            .await
    }
}

/// Serializes a list column. Plain strings and label/url pairs cannot fail to encode.
fn encode_list<T: serde::Serialize>(values: &[T]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn settings(&self) -> RepoResult<ContactSettings> {
        Ok(self.ensure_row().await?.into())
    }

    async fn update(&self, draft: &ContactDraft) -> RepoResult<()> {
        let row = self.ensure_row().await?;
        sqlx::query(
            "UPDATE contact_settings SET phones = $1, emails = $2, address = $3, schedule = $4, \
             social_text = $5, socials = $6, updated_at = NOW() WHERE id = $7",
        )
        .bind(encode_list(&draft.phones))
        .bind(encode_list(&draft.emails))
        .bind(&draft.address)
        .bind(&draft.schedule)
        .bind(&draft.social_text)
        .bind(encode_list(&draft.socials))
        .bind(row.id)
        .execute(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("update contact error: {:?}", e))?;
        Ok(())
    }

    async fn update_hero_image(&self, url: &str) -> RepoResult<()> {
        let row = self.ensure_row().await?;
        sqlx::query("UPDATE contact_settings SET hero_image = $1, updated_at = NOW() WHERE id = $2")
            .bind(url)
            .bind(row.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// --- Users ---

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const STAFF_COLUMNS: &str = "id, name, email, role, is_active, email_verified_at, \
                             (email_verified_at IS NOT NULL) AS verified";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, password_hash, role, is_active, email_verified_at \
             FROM users WHERE LOWER(email) = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_staff(&self) -> RepoResult<Vec<StaffMember>> {
        let sql = format!(
            "SELECT {STAFF_COLUMNS} FROM users WHERE role IN ('admin', 'superadmin') \
             ORDER BY CASE WHEN role = 'superadmin' THEN 0 ELSE 1 END, name ASC"
        );
        sqlx::query_as::<_, StaffMember>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_staff(&self, id: i64) -> RepoResult<Option<StaffMember>> {
        let sql = format!(
            "SELECT {STAFF_COLUMNS} FROM users WHERE id = $1 AND role IN ('admin', 'superadmin')"
        );
        sqlx::query_as::<_, StaffMember>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
    }

    async fn create(&self, user: NewUser) -> RepoResult<i64> {
        sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash, role, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) RETURNING id",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
    }

    /// update_account
    ///
    /// Only the columns present in `changes` are written.
    async fn update_account(&self, id: i64, changes: &AccountChanges) -> RepoResult<bool> {
        if changes.is_empty() {
            return Ok(self.find_staff(id).await?.is_some());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut assignments = builder.separated(", ");
        if let Some(active) = changes.is_active {
            assignments.push("is_active = ");
            assignments.push_bind_unseparated(active);
        }
        if let Some(role) = changes.role {
            assignments.push("role = ");
            assignments.push_bind_unseparated(role.as_str());
        }
        if let Some(verified) = changes.verified {
            assignments.push(if verified {
                "email_verified_at = NOW()"
            } else {
                "email_verified_at = NULL"
            });
        }
        builder.push(", updated_at = NOW() WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, id: i64, hash: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
                .bind(hash)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- Health ---

pub struct PgHealthProbe {
    pool: PgPool,
}

impl PgHealthProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for PgHealthProbe {
    async fn ping(&self) -> RepoResult<i32> {
        sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await
    }
}
