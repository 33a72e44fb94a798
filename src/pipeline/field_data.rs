//! Custom field data pipeline.

use std::sync::Arc;

use crate::batch::{BatchResult, BatchRunner, FailurePolicy, ItemOutcome, ProgressObserver};
use crate::catalog::FieldCatalog;
use crate::enumerator::RecordEnumerator;
use crate::error::BatchError;
use crate::store::UserStore;
use crate::synth::ValueSynthesizer;

/// Writes one synthesized value for every (user, custom field) pair.
///
/// Users are visited in enumeration order and, for each user, fields in
/// catalog order. Every pair is one batch item, so a run over N users and M
/// fields ticks N×M times. Fields with an unrecognized type are skipped
/// without a write.
pub struct FieldDataPipeline {
    store: Arc<dyn UserStore>,
    policy: FailurePolicy,
    seed: Option<u64>,
}

impl FieldDataPipeline {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            policy: FailurePolicy::default(),
            seed: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Runs one batch. Catalog and user list failures end the run before any write.
    pub async fn run(
        &self,
        observer: &mut dyn ProgressObserver,
    ) -> Result<BatchResult, BatchError> {
        let mut runner = BatchRunner::new("users generate_data", self.policy, observer);

        let fields = match FieldCatalog::new(self.store.clone()).load_fields().await {
            Ok(fields) => fields,
            Err(e) => return Err(runner.refuse(e)),
        };
        let user_ids = match RecordEnumerator::new(self.store.clone())
            .list_all_user_ids()
            .await
        {
            Ok(ids) => ids,
            Err(e) => return Err(runner.refuse(e)),
        };

        let mut synthesizer = match self.seed {
            Some(seed) => ValueSynthesizer::with_seed(seed),
            None => ValueSynthesizer::new(),
        };

        tracing::info!(
            users = user_ids.len(),
            fields = fields.len(),
            "Generating custom field data"
        );

        runner.begin(user_ids.len().saturating_mul(fields.len()))?;
        for &user_id in &user_ids {
            for field in &fields {
                let label = format!("user {} / {}", user_id, field.metakey);
                let outcome = match synthesizer.synthesize_field(field) {
                    None => ItemOutcome::Skipped(format!(
                        "unrecognized field type '{}'",
                        field.field_type
                    )),
                    Some(value) => match self
                        .store
                        .set_user_meta(user_id, &field.metakey, &value.to_meta_value())
                        .await
                    {
                        Ok(()) => ItemOutcome::Succeeded,
                        Err(e) => ItemOutcome::Failed(e.to_string()),
                    },
                };
                runner.record(label, outcome)?;
            }
        }

        runner.complete(format!(
            "Custom field data generated for {} users.",
            user_ids.len()
        ))
    }
}
