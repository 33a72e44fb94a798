//! User directory access.
//!
//! The generators never talk to a database directly. Everything they need from
//! the host user directory goes through the [`UserStore`] trait:
//!
//! - account creation and profile updates
//! - per-user metadata reads and writes
//! - the custom field catalog and the full list of user ids
//! - media attachments (avatars)
//!
//! [`SqliteUserStore`] is the concrete directory used by the CLI.

pub mod sqlite;

pub use sqlite::SqliteUserStore;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::synth::{AccountIdentity, FieldDefinition};

/// Identifier of a user record.
pub type UserId = i64;

/// Meta key holding the path of a user's avatar image.
pub const AVATAR_META_KEY: &str = "current_user_avatar";

/// Profile columns that can be overwritten after creation. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
}

/// A media file to register against a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAttachment {
    pub user_id: UserId,
    /// Local path of the stored file.
    pub path: String,
    pub mime_type: String,
    /// Where the file was downloaded from.
    pub source_url: String,
}

/// Filter for the custom field catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldQuery {
    /// Include built-in default fields.
    pub include_default: bool,
}

impl FieldQuery {
    /// Only operator-defined, non-default fields.
    pub fn custom_only() -> Self {
        Self {
            include_default: false,
        }
    }

    pub fn all() -> Self {
        Self {
            include_default: true,
        }
    }
}

/// The host user directory.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether the directory serves several sites from one user table.
    async fn is_multisite(&self) -> Result<bool, StoreError>;

    /// Creates an account. Fails with [`StoreError::Duplicate`] when the
    /// username or email is taken.
    async fn create_user(&self, identity: &AccountIdentity) -> Result<UserId, StoreError>;

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError>;

    /// Writes (inserts or replaces) one metadata value.
    async fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get_user_meta(&self, id: UserId, key: &str) -> Result<Option<String>, StoreError>;

    /// Custom field definitions in catalog order.
    async fn custom_fields(&self, query: FieldQuery) -> Result<Vec<FieldDefinition>, StoreError>;

    /// Every user id, in ascending order, in one call.
    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError>;

    /// Registers a media file and returns its attachment id.
    async fn add_attachment(&self, attachment: &NewAttachment) -> Result<i64, StoreError>;
}
