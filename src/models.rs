use std::io::Write;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

use crate::schema;

// Enums are stored as text columns, mapped by hand below.

#[derive(
    Serialize, Deserialize, AsExpression, FromSqlRow, Debug, Clone, Copy,
    PartialEq, Eq,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Document,
    Command,
    Publication,
    Mock,
    TemplatePublication,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Document => "document",
            ContentKind::Command => "command",
            ContentKind::Publication => "publication",
            ContentKind::Mock => "mock",
            ContentKind::TemplatePublication => "template_publication",
        }
    }
}

impl ToSql<Text, Pg> for ContentKind {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Pg>,
    ) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for ContentKind {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"document" => Ok(ContentKind::Document),
            b"command" => Ok(ContentKind::Command),
            b"publication" => Ok(ContentKind::Publication),
            b"mock" => Ok(ContentKind::Mock),
            b"template_publication" => Ok(ContentKind::TemplatePublication),
            other => Err(format!(
                "Unknown content kind: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(
    Serialize, Deserialize, AsExpression, FromSqlRow, Debug, Clone, Copy,
    PartialEq, Eq,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Collaborator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Collaborator => "collaborator",
        }
    }
}

impl ToSql<Text, Pg> for Role {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Pg>,
    ) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Role {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"owner" => Ok(Role::Owner),
            b"collaborator" => Ok(Role::Collaborator),
            other => Err(format!(
                "Unknown role: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(
    Serialize, Deserialize, AsExpression, FromSqlRow, Debug, Clone, Copy,
    PartialEq, Eq,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Rejected => "rejected",
        }
    }
}

impl ToSql<Text, Pg> for InviteStatus {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Pg>,
    ) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for InviteStatus {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"pending" => Ok(InviteStatus::Pending),
            b"accepted" => Ok(InviteStatus::Accepted),
            b"rejected" => Ok(InviteStatus::Rejected),
            other => Err(format!(
                "Unknown invite status: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

#[derive(
    Serialize, Deserialize, AsExpression, FromSqlRow, Debug, Clone, Copy,
    PartialEq, Eq,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum SharingLevel {
    None,
    Documentation,
    FullAccess,
}

impl SharingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingLevel::None => "none",
            SharingLevel::Documentation => "documentation",
            SharingLevel::FullAccess => "full_access",
        }
    }
}

impl ToSql<Text, Pg> for SharingLevel {
    fn to_sql<'b>(
        &'b self,
        out: &mut Output<'b, '_, Pg>,
    ) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for SharingLevel {
    fn from_sql(value: PgValue) -> deserialize::Result<Self> {
        match value.as_bytes() {
            b"none" => Ok(SharingLevel::None),
            b"documentation" => Ok(SharingLevel::Documentation),
            b"full_access" => Ok(SharingLevel::FullAccess),
            other => Err(format!(
                "Unknown sharing level: {}",
                String::from_utf8_lossy(other)
            )
            .into()),
        }
    }
}

// Row types

#[derive(Serialize, Selectable, Queryable, Debug, Clone)]
#[diesel(table_name = schema::designs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Design {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: String,
    pub tags: Option<String>,
    pub design_type: String,
    pub created_by: String,
    pub created_on: chrono::DateTime<chrono::Utc>,
}

/// `id`, `created_by` and `created_on` are filled in by the design store.
#[derive(Insertable)]
#[diesel(table_name = schema::designs)]
pub struct NewDesign {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: String,
    pub tags: Option<String>,
    pub design_type: String,
    pub created_by: String,
}

#[derive(Serialize, Selectable, Queryable, Debug, Clone)]
#[diesel(table_name = schema::content)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContentEntry {
    pub version: i64,
    pub design_id: uuid::Uuid,
    pub kind: ContentKind,
    pub data: String,
    pub created_by: String,
    pub created_on: chrono::DateTime<chrono::Utc>,
    pub reverted: bool,
}

// `version` and `created_on` are assigned by the database.
#[derive(Insertable)]
#[diesel(table_name = schema::content)]
pub struct NewContentEntry {
    pub design_id: uuid::Uuid,
    pub kind: ContentKind,
    pub data: String,
    pub created_by: String,
}

#[derive(Serialize, Selectable, Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::acl)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AclEntry {
    pub design_id: uuid::Uuid,
    pub user_id: String,
    pub role: Role,
}

#[derive(Serialize, Selectable, Queryable, Debug, Clone)]
#[diesel(table_name = schema::acl_invites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Invite {
    pub invite_id: uuid::Uuid,
    pub design_id: uuid::Uuid,
    pub role: Role,
    pub status: InviteStatus,
    pub created_by: String,
    pub created_on: chrono::DateTime<chrono::Utc>,
    pub subject: String,
    pub modified_by: Option<String>,
    pub modified_on: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::acl_invites)]
pub struct NewInvite {
    pub invite_id: uuid::Uuid,
    pub design_id: uuid::Uuid,
    pub role: Role,
    pub status: InviteStatus,
    pub created_by: String,
    pub subject: String,
}

#[derive(Serialize, Selectable, Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::editing_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EditingSession {
    pub uuid: uuid::Uuid,
    pub design_id: uuid::Uuid,
    pub user_id: String,
    pub secret_hash: String,
    pub version: i64,
    pub expires_on: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Selectable, Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = schema::sharing)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SharingConfig {
    pub design_id: uuid::Uuid,
    pub uuid: uuid::Uuid,
    pub level: SharingLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(ContentKind::Document.as_str(), "document");
        assert_eq!(
            ContentKind::TemplatePublication.as_str(),
            "template_publication"
        );
        assert_eq!(Role::Collaborator.as_str(), "collaborator");
        assert_eq!(InviteStatus::Rejected.as_str(), "rejected");
        assert_eq!(SharingLevel::FullAccess.as_str(), "full_access");
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        let kind = serde_json::to_string(&ContentKind::Command).unwrap();
        assert_eq!(kind, "\"command\"");
        let status: InviteStatus =
            serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, InviteStatus::Pending);
    }
}
