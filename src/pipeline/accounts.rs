//! Account creation pipeline.

use std::sync::Arc;

use crate::avatar::{AvatarSource, MediaLibrary};
use crate::batch::{BatchResult, BatchRunner, FailurePolicy, ProgressObserver};
use crate::enumerator::RecordEnumerator;
use crate::error::{BatchError, PreconditionError};
use crate::provision::AccountProvisioner;
use crate::store::UserStore;

/// Accounts requested when `--number` is not given.
pub const DEFAULT_ACCOUNT_COUNT: usize = 30;

/// Parameters of one `users generate` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateAccounts {
    pub number: usize,
    pub api_key: Option<String>,
    /// Attempt exactly `number` accounts instead of `number + 1`.
    pub exact: bool,
}

impl Default for GenerateAccounts {
    fn default() -> Self {
        Self {
            number: DEFAULT_ACCOUNT_COUNT,
            api_key: None,
            exact: false,
        }
    }
}

impl GenerateAccounts {
    /// The trimmed API key, or [`PreconditionError::MissingApiKey`] when it is absent or blank.
    pub fn require_api_key(&self) -> Result<&str, PreconditionError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(PreconditionError::MissingApiKey),
        }
    }
}

/// Number of creation attempts for a requested count.
///
/// By default the range is inclusive (`0..=number`), one more than asked
/// for. `exact` gives exactly `number`.
pub fn attempt_count(number: usize, exact: bool) -> usize {
    if exact {
        number
    } else {
        number.saturating_add(1)
    }
}

/// Creates accounts, each with an avatar sampled from one shared pool.
pub struct AccountPipeline {
    store: Arc<dyn UserStore>,
    avatars: Arc<dyn AvatarSource>,
    media: MediaLibrary,
    policy: FailurePolicy,
    seed: Option<u64>,
}

impl AccountPipeline {
    pub fn new(
        store: Arc<dyn UserStore>,
        avatars: Arc<dyn AvatarSource>,
        media: MediaLibrary,
    ) -> Self {
        Self {
            store,
            avatars,
            media,
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

    /// Runs one batch.
    ///
    /// The multisite guard and the API key check both run before the avatar
    /// listing is requested; a refused batch has no side effects.
    pub async fn run(
        &self,
        request: &GenerateAccounts,
        observer: &mut dyn ProgressObserver,
    ) -> Result<BatchResult, BatchError> {
        let mut runner = BatchRunner::new("users generate", self.policy, observer);

        let enumerator = RecordEnumerator::new(self.store.clone());
        if let Err(e) = enumerator.ensure_single_site().await {
            return Err(runner.refuse(e));
        }

        let api_key = match request.require_api_key() {
            Ok(key) => key,
            Err(e) => return Err(runner.refuse(e)),
        };

        let pool = self.avatars.fetch_pool(request.number, api_key).await;

        let mut provisioner =
            AccountProvisioner::new(self.store.clone(), self.avatars.clone(), self.media.clone());
        if let Some(seed) = self.seed {
            provisioner = provisioner.with_seed(seed);
        }

        let attempts = attempt_count(request.number, request.exact);
        tracing::info!(
            requested = request.number,
            attempts = attempts,
            avatars = pool.len(),
            "Generating accounts"
        );

        runner.begin(attempts)?;
        for _ in 0..attempts {
            let provisioned = provisioner.provision(&pool).await;
            runner.record(provisioned.username(), provisioned.outcome())?;
        }

        let attempted = runner.attempted();
        runner.complete(format!("{} users generated.", attempted))
    }
}
