use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::trace;
use uuid::Uuid;

use crate::config::Visibility;
use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::{ContentEntry, ContentKind, NewContentEntry};
use crate::schema;

/// Append-only log of every change to a design. Versions are assigned by the
/// database sequence at insert time, so concurrent appends never collide;
/// never compute a version in the application.
pub struct ContentStore {
    pool: db::DbConnectionPool,
    visibility: Visibility,
}

impl ContentStore {
    pub fn new(pool: db::DbConnectionPool, visibility: Visibility) -> Self {
        Self { pool, visibility }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    /// Pure append primitive. Callers are expected to have checked write
    /// permission through the ACL store already.
    pub async fn add_content(
        &self,
        user_id: &str,
        design_id: Uuid,
        kind: ContentKind,
        data: String,
    ) -> Result<i64, StoreError> {
        let mut conn = self.connect().await?;
        let entry = NewContentEntry {
            design_id,
            kind,
            data,
            created_by: user_id.to_string(),
        };
        let version: i64 = diesel::insert_into(schema::content::table)
            .values(&entry)
            .returning(schema::content::version)
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        trace!(
            "content: appended {} v{} to design {}",
            kind.as_str(),
            version,
            design_id
        );
        Ok(version)
    }

    /// Highest-version non-reverted document snapshot visible to the user.
    /// Absent and not-visible are deliberately the same error.
    pub async fn get_latest_document(
        &self,
        user_id: &str,
        design_id: Uuid,
    ) -> Result<ContentEntry, StoreError> {
        let mut conn = self.connect().await?;
        let mut query = schema::content::table
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::kind.eq(ContentKind::Document))
            .filter(schema::content::reverted.eq(false))
            .order(schema::content::version.desc())
            .select(ContentEntry::as_select())
            .into_boxed();
        if !self.visibility.is_unrestricted() {
            query = query.filter(exists(
                schema::acl::table
                    .filter(schema::acl::design_id.eq(design_id))
                    .filter(schema::acl::user_id.eq(user_id.to_string())),
            ));
        }
        query
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => StoreError::not_found("Design not found"),
                err => storage_error(err),
            })
    }

    /// Exact point-in-time lookup, used by public share links. Not gated by
    /// the ACL; the share token is the capability.
    pub async fn get_content_for_version(
        &self,
        design_id: Uuid,
        version: i64,
    ) -> Result<ContentEntry, StoreError> {
        let mut conn = self.connect().await?;
        schema::content::table
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::version.eq(version))
            .select(ContentEntry::as_select())
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => StoreError::not_found("Content not found"),
                err => storage_error(err),
            })
    }

    /// Non-reverted commands after `since_version`, ascending, for replay on
    /// top of a document snapshot. Not visible means an empty list.
    pub async fn list_commands_since(
        &self,
        user_id: &str,
        design_id: Uuid,
        since_version: i64,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        let mut conn = self.connect().await?;
        let mut query = schema::content::table
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::kind.eq(ContentKind::Command))
            .filter(schema::content::reverted.eq(false))
            .filter(schema::content::version.gt(since_version))
            .order(schema::content::version.asc())
            .select(ContentEntry::as_select())
            .into_boxed();
        if !self.visibility.is_unrestricted() {
            query = query.filter(exists(
                schema::acl::table
                    .filter(schema::acl::design_id.eq(design_id))
                    .filter(schema::acl::user_id.eq(user_id.to_string())),
            ));
        }
        query
            .get_results(&mut conn)
            .await
            .map_err(StoreError::from)
    }

    /// Marks an entry reverted, but only if the caller authored it and it is
    /// not already reverted. A single conditional update; zero affected rows
    /// means "nothing to undo", not an error.
    pub async fn undo_content(
        &self,
        user_id: &str,
        design_id: Uuid,
        version: i64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connect().await?;
        let num = diesel::update(schema::content::table)
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::version.eq(version))
            .filter(schema::content::created_by.eq(user_id))
            .filter(schema::content::reverted.eq(false))
            .set(schema::content::reverted.eq(true))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(num != 0)
    }

    /// Inverse of [`undo_content`](Self::undo_content).
    pub async fn redo_content(
        &self,
        user_id: &str,
        design_id: Uuid,
        version: i64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connect().await?;
        let num = diesel::update(schema::content::table)
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::version.eq(version))
            .filter(schema::content::created_by.eq(user_id))
            .filter(schema::content::reverted.eq(true))
            .set(schema::content::reverted.eq(false))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(num != 0)
    }

    /// Activity feed: everything except document snapshots, newest first,
    /// paginated with `from`/`to` row offsets.
    pub async fn list_activity(
        &self,
        user_id: &str,
        design_id: Uuid,
        from: i64,
        to: i64,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        let mut conn = self.connect().await?;
        let limit = (to - from).max(0);
        let mut query = schema::content::table
            .filter(schema::content::design_id.eq(design_id))
            .filter(schema::content::kind.ne(ContentKind::Document))
            .order((
                schema::content::created_on.desc(),
                schema::content::version.desc(),
            ))
            .offset(from)
            .limit(limit)
            .select(ContentEntry::as_select())
            .into_boxed();
        if !self.visibility.is_unrestricted() {
            query = query.filter(exists(
                schema::acl::table
                    .filter(schema::acl::design_id.eq(design_id))
                    .filter(schema::acl::user_id.eq(user_id.to_string())),
            ));
        }
        query
            .get_results(&mut conn)
            .await
            .map_err(StoreError::from)
    }
}
