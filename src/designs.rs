use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use log::trace;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::Visibility;
use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::{
    AclEntry, ContentKind, Design, NewContentEntry, NewDesign, Role,
};
use crate::schema;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDesign {
    pub name: String,
    pub description: String,
    pub tags: Option<String>,
    pub design_type: String,
}

/// Design lifecycle. A design, its owner ACL row and its first document
/// snapshot are one logical unit, created and deleted inside a single
/// database transaction.
pub struct DesignStore {
    pool: db::DbConnectionPool,
    visibility: Visibility,
}

impl DesignStore {
    pub fn new(pool: db::DbConnectionPool, visibility: Visibility) -> Self {
        Self { pool, visibility }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    /// Returns the created design and the version assigned to its initial
    /// document snapshot.
    pub async fn create_design(
        &self,
        user_id: &str,
        props: CreateDesign,
        initial_data: String,
    ) -> Result<(Design, i64), StoreError> {
        let mut conn = self.connect().await?;
        let design_id = Uuid::new_v4();
        let result = conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let design: Design =
                        diesel::insert_into(schema::designs::table)
                            .values(&NewDesign {
                                id: design_id,
                                name: props.name,
                                description: props.description,
                                tags: props.tags,
                                design_type: props.design_type,
                                created_by: user_id.to_string(),
                            })
                            .returning(Design::as_returning())
                            .get_result(conn)
                            .await?;
                    diesel::insert_into(schema::acl::table)
                        .values(&AclEntry {
                            design_id,
                            user_id: user_id.to_string(),
                            role: Role::Owner,
                        })
                        .execute(conn)
                        .await?;
                    let version: i64 =
                        diesel::insert_into(schema::content::table)
                            .values(&NewContentEntry {
                                design_id,
                                kind: ContentKind::Document,
                                data: initial_data,
                                created_by: user_id.to_string(),
                            })
                            .returning(schema::content::version)
                            .get_result(conn)
                            .await?;
                    Ok((design, version))
                }
                .scope_boxed()
            })
            .await?;
        trace!("designs: {} created design {}", user_id, design_id);
        Ok(result)
    }

    pub async fn get_design(
        &self,
        user_id: &str,
        design_id: Uuid,
    ) -> Result<Design, StoreError> {
        let mut conn = self.connect().await?;
        let mut query = schema::designs::table
            .filter(schema::designs::id.eq(design_id))
            .select(Design::as_select())
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

    /// Designs the user has an ACL row for; every design under unrestricted
    /// visibility.
    pub async fn list_designs(
        &self,
        user_id: &str,
    ) -> Result<Vec<Design>, StoreError> {
        let mut conn = self.connect().await?;
        if self.visibility.is_unrestricted() {
            schema::designs::table
                .order(schema::designs::created_on.desc())
                .select(Design::as_select())
                .get_results(&mut conn)
                .await
                .map_err(StoreError::from)
        } else {
            schema::designs::table
                .inner_join(schema::acl::table)
                .filter(schema::acl::user_id.eq(user_id))
                .order(schema::designs::created_on.desc())
                .select(Design::as_select())
                .get_results(&mut conn)
                .await
                .map_err(StoreError::from)
        }
    }

    /// Owner-only cascade: content, ACL rows, invitations, sharing config
    /// and editing sessions all go with the design, in one transaction.
    pub async fn delete_design(
        &self,
        user_id: &str,
        design_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        if !self.visibility.is_unrestricted() {
            let cnt: i64 = schema::acl::table
                .filter(schema::acl::design_id.eq(design_id))
                .filter(schema::acl::user_id.eq(user_id))
                .filter(schema::acl::role.eq(Role::Owner))
                .count()
                .get_result(&mut conn)
                .await
                .map_err(StoreError::from)?;
            if cnt == 0 {
                return Err(StoreError::not_found("Design not found"));
            }
        }
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                diesel::delete(schema::content::table)
                    .filter(schema::content::design_id.eq(design_id))
                    .execute(conn)
                    .await?;
                diesel::delete(schema::acl_invites::table)
                    .filter(schema::acl_invites::design_id.eq(design_id))
                    .execute(conn)
                    .await?;
                diesel::delete(schema::sharing::table)
                    .filter(schema::sharing::design_id.eq(design_id))
                    .execute(conn)
                    .await?;
                diesel::delete(schema::editing_sessions::table)
                    .filter(
                        schema::editing_sessions::design_id.eq(design_id),
                    )
                    .execute(conn)
                    .await?;
                diesel::delete(schema::acl::table)
                    .filter(schema::acl::design_id.eq(design_id))
                    .execute(conn)
                    .await?;
                let num = diesel::delete(schema::designs::table)
                    .filter(schema::designs::id.eq(design_id))
                    .execute(conn)
                    .await?;
                if num == 0 {
                    return Err(StoreError::not_found("Design not found"));
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await?;
        trace!("designs: {} deleted design {}", user_id, design_id);
        Ok(())
    }
}
