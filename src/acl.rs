use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::config::Visibility;
use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::{AclEntry, Role};
use crate::schema;

/// Per-design roster of users and their roles. Every mutating operation in
/// the other stores is expected to be gated through this one first.
pub struct AclStore {
    pool: db::DbConnectionPool,
    visibility: Visibility,
}

impl AclStore {
    pub fn new(pool: db::DbConnectionPool, visibility: Visibility) -> Self {
        Self { pool, visibility }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    pub async fn has_owner_permission(
        &self,
        user_id: &str,
        design_id: Uuid,
    ) -> Result<bool, StoreError> {
        if self.visibility.is_unrestricted() {
            return Ok(true);
        }
        let mut conn = self.connect().await?;
        let cnt: i64 = schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .filter(schema::acl::role.eq(Role::Owner))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(cnt != 0)
    }

    /// Write access means any ACL row, owner or collaborator.
    pub async fn has_write_permission(
        &self,
        user_id: &str,
        design_id: Uuid,
    ) -> Result<bool, StoreError> {
        if self.visibility.is_unrestricted() {
            return Ok(true);
        }
        let mut conn = self.connect().await?;
        let cnt: i64 = schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(cnt != 0)
    }

    pub async fn list_permissions(
        &self,
        design_id: Uuid,
    ) -> Result<Vec<AclEntry>, StoreError> {
        let mut conn = self.connect().await?;
        schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .order(schema::acl::user_id.asc())
            .select(AclEntry::as_select())
            .get_results(&mut conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn create_permission(
        &self,
        design_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let entry = AclEntry {
            design_id,
            user_id: user_id.to_string(),
            role,
        };
        diesel::insert_into(schema::acl::table)
            .values(&entry)
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub async fn update_permission(
        &self,
        design_id: Uuid,
        user_id: &str,
        role: Role,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let current = self.get_role(&mut conn, design_id, user_id).await?;
        if current == Role::Owner
            && role != Role::Owner
            && self.owner_count(&mut conn, design_id).await? <= 1
        {
            return Err(StoreError::conflict(
                "Cannot demote the only owner of a design",
            ));
        }
        let num = diesel::update(schema::acl::table)
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .set(schema::acl::role.eq(role))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        if num == 0 {
            Err(StoreError::not_found("Permission not found"))
        } else {
            Ok(())
        }
    }

    pub async fn delete_permission(
        &self,
        design_id: Uuid,
        user_id: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let current = self.get_role(&mut conn, design_id, user_id).await?;
        if current == Role::Owner
            && self.owner_count(&mut conn, design_id).await? <= 1
        {
            return Err(StoreError::conflict(
                "Cannot remove the only owner of a design",
            ));
        }
        let num = diesel::delete(schema::acl::table)
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        if num == 0 {
            Err(StoreError::not_found("Permission not found"))
        } else {
            Ok(())
        }
    }

    async fn get_role(
        &self,
        conn: &mut db::DbConnection,
        design_id: Uuid,
        user_id: &str,
    ) -> Result<Role, StoreError> {
        schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .select(schema::acl::role)
            .first(conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => {
                    StoreError::not_found("Permission not found")
                }
                err => storage_error(err),
            })
    }

    async fn owner_count(
        &self,
        conn: &mut db::DbConnection,
        design_id: Uuid,
    ) -> Result<i64, StoreError> {
        schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::role.eq(Role::Owner))
            .count()
            .get_result(conn)
            .await
            .map_err(StoreError::from)
    }
}
