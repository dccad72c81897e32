use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use log::trace;
use uuid::Uuid;

use crate::config::Visibility;
use crate::db;
use crate::error::{storage_error, StoreError};
use crate::models::{Invite, InviteStatus, NewInvite, Role};
use crate::schema;

/// Pending/accepted/rejected lifecycle of collaboration invitations. The
/// status transition is a conditional update, so concurrent accept and
/// reject attempts are mutually exclusive without locks.
pub struct InviteStore {
    pool: db::DbConnectionPool,
    visibility: Visibility,
}

impl InviteStore {
    pub fn new(pool: db::DbConnectionPool, visibility: Visibility) -> Self {
        Self { pool, visibility }
    }

    async fn connect(&self) -> Result<db::DbConnection, StoreError> {
        self.pool.get().await.map_err(storage_error)
    }

    pub async fn create(
        &self,
        invite_id: Uuid,
        design_id: Uuid,
        created_by: &str,
        subject: &str,
        role: Role,
    ) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        let invite = NewInvite {
            invite_id,
            design_id,
            role,
            status: InviteStatus::Pending,
            created_by: created_by.to_string(),
            subject: subject.to_string(),
        };
        diesel::insert_into(schema::acl_invites::table)
            .values(&invite)
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        trace!("invites: {} invited {} to {}", created_by, subject, design_id);
        Ok(())
    }

    /// Conditional status change: succeeds only while the current status
    /// still equals `from`. `false` means another actor got there first.
    pub async fn transition(
        &self,
        invite_id: Uuid,
        from: InviteStatus,
        to: InviteStatus,
        acting_user: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connect().await?;
        let num = diesel::update(schema::acl_invites::table)
            .filter(schema::acl_invites::invite_id.eq(invite_id))
            .filter(schema::acl_invites::status.eq(from))
            .set((
                schema::acl_invites::status.eq(to),
                schema::acl_invites::modified_by
                    .eq(Some(acting_user.to_string())),
                schema::acl_invites::modified_on.eq(Some(Utc::now())),
            ))
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(num != 0)
    }

    pub async fn list(
        &self,
        design_id: Uuid,
        requesting_user: &str,
    ) -> Result<Vec<Invite>, StoreError> {
        let mut conn = self.connect().await?;
        self.check_membership(&mut conn, design_id, requesting_user, None)
            .await?;
        schema::acl_invites::table
            .filter(schema::acl_invites::design_id.eq(design_id))
            .order(schema::acl_invites::created_on.desc())
            .select(Invite::as_select())
            .get_results(&mut conn)
            .await
            .map_err(StoreError::from)
    }

    pub async fn get(
        &self,
        design_id: Uuid,
        invite_id: Uuid,
        requesting_user: &str,
    ) -> Result<Invite, StoreError> {
        let mut conn = self.connect().await?;
        let invite: Invite = schema::acl_invites::table
            .filter(schema::acl_invites::invite_id.eq(invite_id))
            .filter(schema::acl_invites::design_id.eq(design_id))
            .select(Invite::as_select())
            .first(&mut conn)
            .await
            .map_err(|err| match err {
                diesel::NotFound => {
                    StoreError::not_found("Invitation not found")
                }
                err => storage_error(err),
            })?;
        // The invited user may see their own invitation before accepting it.
        self.check_membership(
            &mut conn,
            design_id,
            requesting_user,
            Some(&invite.subject),
        )
        .await?;
        Ok(invite)
    }

    async fn check_membership(
        &self,
        conn: &mut db::DbConnection,
        design_id: Uuid,
        user_id: &str,
        subject: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.visibility.is_unrestricted() {
            return Ok(());
        }
        if subject == Some(user_id) {
            return Ok(());
        }
        let cnt: i64 = schema::acl::table
            .filter(schema::acl::design_id.eq(design_id))
            .filter(schema::acl::user_id.eq(user_id))
            .count()
            .get_result(conn)
            .await
            .map_err(StoreError::from)?;
        if cnt == 0 {
            Err(StoreError::not_found("Invitation not found"))
        } else {
            Ok(())
        }
    }
}
