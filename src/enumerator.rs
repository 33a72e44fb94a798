//! Target record enumeration and the multisite guard.

use std::sync::Arc;

use crate::error::{BatchError, PreconditionError};
use crate::store::{UserId, UserStore};

/// Lists the records a batch operates on.
pub struct RecordEnumerator {
    store: Arc<dyn UserStore>,
}

impl RecordEnumerator {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Every user id in the directory, unfiltered, in ascending order.
    pub async fn list_all_user_ids(&self) -> Result<Vec<UserId>, BatchError> {
        let ids = self.store.all_user_ids().await?;
        tracing::debug!(users = ids.len(), "Enumerated users");
        Ok(ids)
    }

    /// Refuses to continue when the directory serves several sites.
    ///
    /// Only account creation needs this guard.
    pub async fn ensure_single_site(&self) -> Result<(), BatchError> {
        if self.store.is_multisite().await? {
            return Err(PreconditionError::MultisiteUnsupported.into());
        }
        Ok(())
    }
}
