use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::model::{
    normalize_tag, Association, FieldUpdate, Id, ListFilter, Page, Record, Tag, Tool, ToolType,
};
use crate::store::traits::{RecordStore, RelationshipStore, StoreError};

/// Postgres SQLSTATE codes reported back as constraint failures
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

/// Mapping between a record and its table row
pub trait PgRecord: Record {
    /// Writable columns, in the order `push_values` binds them
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &PgRow) -> Self;
    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>);
}

impl PgRecord for Tool {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "minimum_participants",
        "suggested_participants",
        "maximum_participants",
        "duration",
        "cost",
        "source",
        "subgroup_size",
        "materials",
        "notes",
        "archived",
        "published",
        "created",
    ];

    fn from_row(row: &PgRow) -> Self {
        Tool {
            id: row.get("id"),
            name: row.get("name"),
            minimum_participants: row.get("minimum_participants"),
            suggested_participants: row.get("suggested_participants"),
            maximum_participants: row.get("maximum_participants"),
            duration: row.get("duration"),
            cost: row.get("cost"),
            source: row.get("source"),
            subgroup_size: row.get("subgroup_size"),
            materials: row.get("materials"),
            notes: row.get("notes"),
            archived: row.get("archived"),
            published: row.get("published"),
            created: row.get("created"),
        }
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.name.clone())
            .push_bind(self.minimum_participants)
            .push_bind(self.suggested_participants)
            .push_bind(self.maximum_participants)
            .push_bind(self.duration)
            .push_bind(self.cost)
            .push_bind(self.source.clone())
            .push_bind(self.subgroup_size.clone())
            .push_bind(self.materials.clone())
            .push_bind(self.notes.clone())
            .push_bind(self.archived)
            .push_bind(self.published)
            .push_bind(self.created);
    }
}

impl PgRecord for ToolType {
    const COLUMNS: &'static [&'static str] = &["description", "archived", "created"];

    fn from_row(row: &PgRow) -> Self {
        ToolType {
            id: row.get("id"),
            description: row.get("description"),
            archived: row.get("archived"),
            created: row.get("created"),
        }
    }

    fn push_values(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.description.clone())
            .push_bind(self.archived)
            .push_bind(self.created);
    }
}

/// Translate a failed write into a per-record rejection where the database
/// refused it, or an infrastructure error otherwise
fn map_write_error(err: sqlx::Error, context: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
        if [FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION, CHECK_VIOLATION].contains(&code.as_str()) {
            return StoreError::constraint(db_err.message().to_string());
        }
    }
    StoreError::Infrastructure(anyhow::Error::new(err).context(context.to_string()))
}

fn push_list_conditions<'a, R: Record>(
    builder: &mut QueryBuilder<'a, Postgres>,
    filter: &ListFilter,
    archived: bool,
) {
    builder.push(" WHERE archived = ").push_bind(archived);
    if let Some(term) = filter.search_term() {
        builder
            .push(format!(" AND {} ILIKE ", R::SEARCH_COLUMN))
            .push_bind(format!("%{}%", term));
    }
}

#[async_trait::async_trait]
impl<R: PgRecord> RecordStore<R> for PostgresStore {
    async fn load_by_id(&self, id: Id) -> Result<Option<R>> {
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE id = $1", R::TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} {}", R::KIND.noun(), id))?;

        Ok(row.as_ref().map(R::from_row))
    }

    async fn list(&self, filter: &ListFilter, archived: bool) -> Result<Page<R>> {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
        push_list_conditions::<R>(&mut count, filter, archived);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}", R::KIND.plural()))?;

        // Sort column comes from the record's whitelist, never from the request
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", R::TABLE));
        push_list_conditions::<R>(&mut select, filter, archived);
        select.push(format!(
            " ORDER BY {} {}, id ASC",
            filter.sort_column::<R>(),
            filter.direction().as_sql()
        ));
        if let Some(limit) = filter.limit {
            select.push(" LIMIT ").push_bind(limit as i64);
        }
        select.push(" OFFSET ").push_bind(filter.offset() as i64);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", R::KIND.plural()))?;

        Ok(Page {
            items: rows.iter().map(R::from_row).collect(),
            total: total.max(0) as usize,
            limit: filter.limit,
            limitstart: filter.offset(),
        })
    }

    async fn insert(&self, mut record: R) -> Result<R, StoreError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(StoreError::validation(errors));
        }
        record.set_created(Utc::now());

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            R::TABLE,
            R::COLUMNS.join(", ")
        ));
        record.push_values(&mut builder.separated(", "));
        builder.push(") RETURNING id");

        let id: Id = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to insert record"))?;

        record.set_id(id);
        Ok(record)
    }

    async fn save(&self, record: &R) -> Result<R, StoreError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(StoreError::validation(errors));
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {} SET ({}) = ROW(",
            R::TABLE,
            R::COLUMNS.join(", ")
        ));
        record.push_values(&mut builder.separated(", "));
        builder.push(") WHERE id = ").push_bind(record.id());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to save record"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::constraint(format!(
                "{} {} no longer exists",
                R::KIND.noun(),
                record.id()
            )));
        }
        Ok(record.clone())
    }

    async fn delete(&self, record: &R) -> Result<(), StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", R::TABLE))
            .bind(record.id())
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to delete record"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::constraint(format!(
                "{} {} no longer exists",
                R::KIND.noun(),
                record.id()
            )));
        }
        Ok(())
    }

    async fn set_update_where_id_in(&self, update: &FieldUpdate, ids: &[Id]) -> Result<u64> {
        let published = update.published.filter(|_| R::PUBLISHABLE);
        if (update.archived.is_none() && published.is_none()) || ids.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", R::TABLE));
        {
            let mut assignments = builder.separated(", ");
            if let Some(archived) = update.archived {
                assignments.push("archived = ").push_bind_unseparated(archived);
            }
            if let Some(published) = published {
                assignments.push("published = ").push_bind_unseparated(published);
            }
        }
        builder.push(" WHERE id = ANY(").push_bind(ids.to_vec()).push(")");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update {}", R::KIND.plural()))?;

        Ok(result.rows_affected())
    }

    async fn delete_where_id_in(&self, ids: &[Id]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ANY($1)", R::TABLE))
            .bind(ids)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {}", R::KIND.plural()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl RelationshipStore for PostgresStore {
    async fn related_ids(&self, association: Association, origin_id: Id) -> Result<Vec<Id>> {
        let (table, origin, related) = association.table();
        let ids: Vec<Id> = sqlx::query_scalar(&format!(
            "SELECT {related} FROM {table} WHERE {origin} = $1 ORDER BY id"
        ))
        .bind(origin_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to fetch {} links for tool {}", table, origin_id))?;

        Ok(ids)
    }

    async fn link(&self, association: Association, origin_id: Id, related_id: Id) -> Result<bool> {
        let (table, origin, related) = association.table();
        let result = sqlx::query(&format!(
            "INSERT INTO {table} ({origin}, {related}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(origin_id)
        .bind(related_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to link {} {} -> {}", table, origin_id, related_id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace_links(&self, association: Association, origin_id: Id, related_ids: &[Id]) -> Result<()> {
        let (table, origin, related) = association.table();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query(&format!("DELETE FROM {table} WHERE {origin} = $1"))
            .bind(origin_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear {} for tool {}", table, origin_id))?;

        for related_id in related_ids {
            sqlx::query(&format!(
                "INSERT INTO {table} ({origin}, {related}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            ))
            .bind(origin_id)
            .bind(*related_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to link {} {} -> {}", table, origin_id, related_id))?;
        }

        tx.commit().await.context("Failed to commit links")?;
        Ok(())
    }

    async fn get_tags(&self, ids: &[Id]) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, tag, raw_tag FROM toolbox_tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch tags")?;

        let mut tags: Vec<Tag> = rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                tag: row.get("tag"),
                raw_tag: row.get("raw_tag"),
            })
            .collect();
        tags.sort_by_key(|tag| ids.iter().position(|id| *id == tag.id));
        Ok(tags)
    }

    async fn upsert_tag(&self, raw_tag: &str) -> Result<Tag> {
        let row = sqlx::query(
            r#"
            INSERT INTO toolbox_tags (tag, raw_tag)
            VALUES ($1, $2)
            ON CONFLICT (tag) DO UPDATE SET tag = EXCLUDED.tag
            RETURNING id, tag, raw_tag
            "#,
        )
        .bind(normalize_tag(raw_tag))
        .bind(raw_tag)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert tag")?;

        Ok(Tag {
            id: row.get("id"),
            tag: row.get("tag"),
            raw_tag: row.get("raw_tag"),
        })
    }

    async fn other_tools(&self, exclude: &[Id]) -> Result<Vec<Tool>> {
        let rows = sqlx::query("SELECT * FROM toolbox_tools WHERE NOT (id = ANY($1)) ORDER BY LOWER(name), id")
            .bind(exclude)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list other tools")?;

        Ok(rows.iter().map(Tool::from_row).collect())
    }
}
