//! Versioned content store for collaboratively edited API designs.
//!
//! Every change to a design is an immutable row in an append-only log with a
//! database-assigned version; access is gated by a per-design ACL; short
//! lived single-use editing sessions give clients an optimistic-concurrency
//! handshake for rejoining an edit. Undo/redo, collaboration invitations and
//! public share tokens round out the store. All coordination is delegated to
//! Postgres per-statement atomicity; this crate holds no in-process locks or
//! caches.

pub mod acl;
pub mod config;
pub mod content;
pub mod db;
pub mod designs;
pub mod error;
pub mod hub;
pub mod invites;
pub mod models;
pub mod schema;
pub mod sessions;
pub mod sharing;

pub use acl::AclStore;
pub use config::{HubConfig, Visibility};
pub use content::ContentStore;
pub use designs::{CreateDesign, DesignStore};
pub use error::{ErrorCode, StoreError};
pub use hub::Hub;
pub use invites::InviteStore;
pub use models::{
    AclEntry, ContentEntry, ContentKind, Design, EditingSession, Invite,
    InviteStatus, Role, SharingConfig, SharingLevel,
};
pub use sessions::SessionRegistry;
pub use sharing::SharingStore;
