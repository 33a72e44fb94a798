//! Custom field catalog.

use std::sync::Arc;

use crate::error::StoreError;
use crate::store::{FieldQuery, UserStore};
use crate::synth::FieldDefinition;

/// Loads the custom field definitions that data generation works on.
pub struct FieldCatalog {
    store: Arc<dyn UserStore>,
}

impl FieldCatalog {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Loads every non-default field in catalog order.
    ///
    /// Store failures propagate unchanged; without a catalog there is nothing to synthesize.
    pub async fn load_fields(&self) -> Result<Vec<FieldDefinition>, StoreError> {
        let fields: Vec<FieldDefinition> = self
            .store
            .custom_fields(FieldQuery::custom_only())
            .await?
            .into_iter()
            .filter(|field| !field.is_default)
            .collect();

        let unrecognized = fields.iter().filter(|f| f.kind().is_none()).count();
        tracing::debug!(
            fields = fields.len(),
            unrecognized = unrecognized,
            "Custom field catalog loaded"
        );
        Ok(fields)
    }
}
