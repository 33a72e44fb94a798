//! Account provisioning.
//!
//! One call to [`AccountProvisioner::provision`] builds one account:
//!
//! 1. generate credentials and ask the store to create the account
//! 2. attach an avatar sampled from the batch pool, if there is one
//! 3. overwrite the profile name with a freshly generated one
//!
//! A rejected creation ends the item with nothing written. Anything that goes
//! wrong after creation leaves the account in place.

use std::path::PathBuf;
use std::sync::Arc;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::avatar::{AvatarPool, AvatarSource, MediaLibrary};
use crate::batch::ItemOutcome;
use crate::error::{AvatarError, StoreError};
use crate::store::{NewAttachment, UserId, UserStore, UserUpdate, AVATAR_META_KEY};
use crate::synth::IdentityGenerator;

/// Result of provisioning one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// Account created. `avatar` is `None` when the pool was empty.
    Created {
        user_id: UserId,
        username: String,
        avatar: Option<PathBuf>,
    },
    /// Account created, but the avatar or the name overwrite failed.
    Partial {
        user_id: UserId,
        username: String,
        reason: String,
    },
    /// The store refused the account; nothing was written.
    Rejected { username: String, reason: String },
}

impl Provisioned {
    pub fn username(&self) -> &str {
        match self {
            Provisioned::Created { username, .. }
            | Provisioned::Partial { username, .. }
            | Provisioned::Rejected { username, .. } => username,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Provisioned::Created { user_id, .. } | Provisioned::Partial { user_id, .. } => {
                Some(*user_id)
            }
            Provisioned::Rejected { .. } => None,
        }
    }

    /// Converts to the batch outcome of this item.
    pub fn outcome(&self) -> ItemOutcome {
        match self {
            Provisioned::Created { .. } => ItemOutcome::Succeeded,
            Provisioned::Partial { reason, .. } => ItemOutcome::Degraded(reason.clone()),
            Provisioned::Rejected { reason, .. } => ItemOutcome::Failed(reason.clone()),
        }
    }
}

/// Creates accounts through the user store.
pub struct AccountProvisioner {
    store: Arc<dyn UserStore>,
    avatars: Arc<dyn AvatarSource>,
    media: MediaLibrary,
    identities: IdentityGenerator,
    rng: ChaCha8Rng,
}

impl AccountProvisioner {
    pub fn new(
        store: Arc<dyn UserStore>,
        avatars: Arc<dyn AvatarSource>,
        media: MediaLibrary,
    ) -> Self {
        Self {
            store,
            avatars,
            media,
            identities: IdentityGenerator::new(),
            rng: ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }

    /// Fixes the seed used to sample avatars from the pool.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    /// Provisions one account, sampling its avatar from `pool`.
    pub async fn provision(&mut self, pool: &AvatarPool) -> Provisioned {
        let identity = self.identities.account();
        let username = identity.username.clone();

        let user_id = match self.store.create_user(&identity).await {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(username = %username, error = %e, "Account creation rejected");
                return Provisioned::Rejected {
                    username,
                    reason: e.to_string(),
                };
            }
        };

        let mut problems = Vec::new();

        let avatar = match pool.sample(&mut self.rng).map(str::to_string) {
            Some(url) => match self.attach_avatar(user_id, &url).await {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::debug!(user_id = user_id, url = %url, error = %e, "Avatar not attached");
                    problems.push(format!("avatar: {}", e));
                    None
                }
            },
            None => None,
        };

        let name = self.identities.name();
        let update = UserUpdate {
            first_name: Some(name.first.clone()),
            last_name: Some(name.last.clone()),
            display_name: Some(name.display_name()),
        };
        if let Err(e) = self.store.update_user(user_id, &update).await {
            tracing::debug!(user_id = user_id, error = %e, "Profile name not updated");
            problems.push(format!("profile: {}", e));
        }

        if problems.is_empty() {
            tracing::debug!(user_id = user_id, username = %username, "Account provisioned");
            Provisioned::Created {
                user_id,
                username,
                avatar,
            }
        } else {
            Provisioned::Partial {
                user_id,
                username,
                reason: problems.join("; "),
            }
        }
    }

    async fn attach_avatar(&self, user_id: UserId, url: &str) -> Result<PathBuf, AttachError> {
        let image = self.avatars.download(url).await?;
        let path = self.media.store_image(&image).await?;
        let path_str = path.to_string_lossy().into_owned();

        self.store
            .add_attachment(&NewAttachment {
                user_id,
                path: path_str.clone(),
                mime_type: image.content_type.clone(),
                source_url: image.source_url.clone(),
            })
            .await?;
        self.store
            .set_user_meta(user_id, AVATAR_META_KEY, &path_str)
            .await?;

        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
enum AttachError {
    #[error(transparent)]
    Avatar(#[from] AvatarError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
