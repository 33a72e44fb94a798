//! End-to-end tests for the account and field data pipelines.
//!
//! The store is a recording double so every side effect can be asserted in
//! order. The avatar service is either a scripted double or a wiremock server
//! behind the real HTTP client.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use userforge::avatar::{AvatarPool, AvatarSource, DownloadedImage, HttpAvatarSource, MediaLibrary};
use userforge::batch::{FailureKind, FailurePolicy, SilentProgress};
use userforge::error::{AvatarError, BatchError, PreconditionError, StoreError};
use userforge::pipeline::{AccountPipeline, FieldDataPipeline, GenerateAccounts};
use userforge::store::{
    FieldQuery, NewAttachment, SqliteUserStore, UserId, UserStore, UserUpdate, AVATAR_META_KEY,
};
use userforge::synth::{AccountIdentity, FieldDefinition};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    IsMultisite,
    CreateUser(String),
    UpdateUser(UserId),
    SetMeta(UserId, String, String),
    GetMeta(UserId, String),
    CustomFields,
    AllUserIds,
    AddAttachment(UserId),
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<Call>,
    next_id: UserId,
}

/// In-memory store that records every call.
#[derive(Default)]
struct RecordingStore {
    multisite: bool,
    reject_creation: bool,
    fields: Vec<FieldDefinition>,
    user_ids: Vec<UserId>,
    failing_meta_key: Option<String>,
    state: Mutex<RecordingState>,
}

impl RecordingStore {
    fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("state lock").calls.clone()
    }

    fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    fn push(&self, call: Call) {
        self.state.lock().expect("state lock").calls.push(call);
    }
}

#[async_trait]
impl UserStore for RecordingStore {
    async fn is_multisite(&self) -> Result<bool, StoreError> {
        self.push(Call::IsMultisite);
        Ok(self.multisite)
    }

    async fn create_user(&self, identity: &AccountIdentity) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().expect("state lock");
        state.calls.push(Call::CreateUser(identity.username.clone()));
        if self.reject_creation {
            return Err(StoreError::Duplicate {
                field: "username".to_string(),
                value: identity.username.clone(),
            });
        }
        state.next_id += 1;
        Ok(state.next_id)
    }

    async fn update_user(&self, id: UserId, _update: &UserUpdate) -> Result<(), StoreError> {
        self.push(Call::UpdateUser(id));
        Ok(())
    }

    async fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StoreError> {
        self.push(Call::SetMeta(id, key.to_string(), value.to_string()));
        if self.failing_meta_key.as_deref() == Some(key) {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    async fn get_user_meta(&self, id: UserId, key: &str) -> Result<Option<String>, StoreError> {
        self.push(Call::GetMeta(id, key.to_string()));
        Ok(None)
    }

    async fn custom_fields(&self, _query: FieldQuery) -> Result<Vec<FieldDefinition>, StoreError> {
        self.push(Call::CustomFields);
        Ok(self.fields.clone())
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.push(Call::AllUserIds);
        Ok(self.user_ids.clone())
    }

    async fn add_attachment(&self, attachment: &NewAttachment) -> Result<i64, StoreError> {
        self.push(Call::AddAttachment(attachment.user_id));
        Ok(1)
    }
}

/// Avatar service double with a fixed pool and scripted downloads.
struct ScriptedAvatars {
    pool: Vec<String>,
    downloads_fail: bool,
    fetches: Mutex<usize>,
}

impl ScriptedAvatars {
    fn new(pool: usize, downloads_fail: bool) -> Self {
        Self {
            pool: (0..pool)
                .map(|i| format!("https://img.example.com/{i}.jpg"))
                .collect(),
            downloads_fail,
            fetches: Mutex::new(0),
        }
    }

    fn fetches(&self) -> usize {
        *self.fetches.lock().expect("fetch lock")
    }
}

#[async_trait]
impl AvatarSource for ScriptedAvatars {
    async fn fetch_pool(&self, count: usize, _api_key: &str) -> AvatarPool {
        *self.fetches.lock().expect("fetch lock") += 1;
        AvatarPool::new(self.pool.iter().take(count).cloned().collect())
    }

    async fn download(&self, url: &str) -> Result<DownloadedImage, AvatarError> {
        if self.downloads_fail {
            return Err(AvatarError::InvalidUrl(format!("{url} (connection refused)")));
        }
        Ok(DownloadedImage {
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
            content_type: "image/jpeg".to_string(),
            source_url: url.to_string(),
        })
    }
}

fn request(number: usize, key: Option<&str>) -> GenerateAccounts {
    GenerateAccounts {
        number,
        api_key: key.map(str::to_string),
        exact: false,
    }
}

#[tokio::test]
async fn test_generate_five_attempts_six_accounts_against_http_service() {
    let server = MockServer::start().await;
    let listing: Vec<serde_json::Value> = (0..5)
        .map(|i| serde_json::json!({ "photo": format!("{}/img/{i}.png", server.uri()) }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/photos"))
        .and(query_param("limit", "5"))
        .and(header("X-API-KEY", "valid-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(RecordingStore::default());
    let avatars = HttpAvatarSource::new(
        Some(format!("{}/photos", server.uri())),
        Duration::from_secs(5),
    )
    .expect("client");
    let pipeline = AccountPipeline::new(
        store.clone(),
        Arc::new(avatars),
        MediaLibrary::new(dir.path()),
    )
    .with_seed(11);

    let result = pipeline
        .run(&request(5, Some("valid-key")), &mut SilentProgress)
        .await
        .expect("batch completes");

    assert_eq!(store.count(|c| matches!(c, Call::CreateUser(_))), 6);
    assert_eq!(result.total, 6);
    assert_eq!(result.attempted, 6);
    assert_eq!(result.succeeded, 6);
    assert!(!result.message.is_empty());
    assert_eq!(store.count(|c| matches!(c, Call::AddAttachment(_))), 6);
    assert_eq!(
        store.count(|c| matches!(c, Call::SetMeta(_, key, _) if key == AVATAR_META_KEY)),
        6
    );
    assert_eq!(
        std::fs::read_dir(dir.path().join("avatars"))
            .expect("avatars dir")
            .count(),
        6
    );
}

#[tokio::test]
async fn test_exact_flag_attempts_requested_number() {
    let store = Arc::new(RecordingStore::default());
    let avatars = Arc::new(ScriptedAvatars::new(5, false));
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), avatars, MediaLibrary::new(dir.path()));

    let mut req = request(5, Some("k"));
    req.exact = true;
    let result = pipeline.run(&req, &mut SilentProgress).await.expect("batch");

    assert_eq!(result.attempted, 5);
    assert_eq!(store.count(|c| matches!(c, Call::CreateUser(_))), 5);
}

#[tokio::test]
async fn test_missing_key_is_fatal_before_side_effects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let avatars = HttpAvatarSource::new(Some(server.uri()), Duration::from_secs(5)).expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), Arc::new(avatars), MediaLibrary::new(dir.path()));

    for key in [None, Some(""), Some("   ")] {
        let err = pipeline
            .run(&request(5, key), &mut SilentProgress)
            .await
            .expect_err("missing key is fatal");
        assert!(matches!(
            err,
            BatchError::Precondition(PreconditionError::MissingApiKey)
        ));
    }

    assert_eq!(store.count(|c| matches!(c, Call::CreateUser(_))), 0);
    assert!(store.calls().iter().all(|c| *c == Call::IsMultisite));
}

#[tokio::test]
async fn test_multisite_refuses_generation() {
    let store = Arc::new(RecordingStore {
        multisite: true,
        ..Default::default()
    });
    let avatars = Arc::new(ScriptedAvatars::new(5, false));
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), avatars.clone(), MediaLibrary::new(dir.path()));

    let err = pipeline
        .run(&request(5, Some("k")), &mut SilentProgress)
        .await
        .expect_err("multisite is fatal");

    assert!(matches!(
        err,
        BatchError::Precondition(PreconditionError::MultisiteUnsupported)
    ));
    assert_eq!(store.calls(), vec![Call::IsMultisite]);
    assert_eq!(avatars.fetches(), 0);
    assert!(!dir.path().join("avatars").exists());
}

#[tokio::test]
async fn test_avatar_failure_keeps_accounts() {
    let store = Arc::new(RecordingStore::default());
    let avatars = Arc::new(ScriptedAvatars::new(3, true));
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), avatars, MediaLibrary::new(dir.path()))
        .with_policy(FailurePolicy::Collect);

    let result = pipeline
        .run(&request(2, Some("k")), &mut SilentProgress)
        .await
        .expect("batch completes");

    assert_eq!(result.attempted, 3);
    assert_eq!(result.succeeded, 3);
    assert_eq!(result.failures.len(), 3);
    assert!(result.failures.iter().all(|f| f.kind == FailureKind::Degraded));
    assert_eq!(store.count(|c| matches!(c, Call::CreateUser(_))), 3);
    assert_eq!(store.count(|c| matches!(c, Call::UpdateUser(_))), 3);
    assert_eq!(store.count(|c| matches!(c, Call::AddAttachment(_))), 0);
    assert_eq!(store.count(|c| matches!(c, Call::SetMeta(..))), 0);
}

#[tokio::test]
async fn test_unreachable_avatar_service_still_creates_accounts() {
    let store = Arc::new(RecordingStore::default());
    let avatars = HttpAvatarSource::new(
        Some("http://127.0.0.1:9/photos".to_string()),
        Duration::from_secs(2),
    )
    .expect("client");
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), Arc::new(avatars), MediaLibrary::new(dir.path()));

    let result = pipeline
        .run(&request(1, Some("k")), &mut SilentProgress)
        .await
        .expect("batch completes");

    assert_eq!(result.succeeded, 2);
    assert!(result.failures.is_empty());
    assert_eq!(store.count(|c| matches!(c, Call::AddAttachment(_))), 0);
}

#[tokio::test]
async fn test_rejected_creations_are_silent_by_default() {
    let store = Arc::new(RecordingStore {
        reject_creation: true,
        ..Default::default()
    });
    let avatars = Arc::new(ScriptedAvatars::new(3, false));
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), avatars, MediaLibrary::new(dir.path()));

    let result = pipeline
        .run(&request(3, Some("k")), &mut SilentProgress)
        .await
        .expect("duplicates do not fail the batch");

    assert_eq!(result.attempted, 4);
    assert_eq!(result.succeeded, 0);
    assert!(result.failures.is_empty());
    assert_eq!(store.count(|c| matches!(c, Call::UpdateUser(_))), 0);
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_rejection() {
    let store = Arc::new(RecordingStore {
        reject_creation: true,
        ..Default::default()
    });
    let avatars = Arc::new(ScriptedAvatars::new(3, false));
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = AccountPipeline::new(store.clone(), avatars, MediaLibrary::new(dir.path()))
        .with_policy(FailurePolicy::Abort);

    let err = pipeline
        .run(&request(3, Some("k")), &mut SilentProgress)
        .await
        .expect_err("abort policy stops the batch");

    assert!(matches!(err, BatchError::ItemAborted { index: 0, .. }));
    assert_eq!(store.count(|c| matches!(c, Call::CreateUser(_))), 1);
}

fn catalog() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("colour", "select").with_options([
            ("red", "Red"),
            ("green", "Green"),
            ("blue", "Blue"),
        ]),
        FieldDefinition::new("verified", "checkbox"),
    ]
}

#[tokio::test]
async fn test_generate_data_writes_every_pair_in_user_major_order() {
    let store = Arc::new(RecordingStore {
        fields: catalog(),
        user_ids: vec![3, 7, 9],
        ..Default::default()
    });
    let pipeline = FieldDataPipeline::new(store.clone());

    let result = pipeline.run(&mut SilentProgress).await.expect("batch");

    let writes: Vec<(UserId, String, String)> = store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::SetMeta(id, key, value) => Some((id, key, value)),
            _ => None,
        })
        .collect();

    let expected: Vec<(UserId, String, String)> = [3, 7, 9]
        .into_iter()
        .flat_map(|id| {
            [
                (id, "colour".to_string(), "green".to_string()),
                (id, "verified".to_string(), "1".to_string()),
            ]
        })
        .collect();
    assert_eq!(writes, expected);
    assert_eq!(result.total, 6);
    assert_eq!(result.attempted, 6);
    assert_eq!(result.succeeded, 6);
    assert!(!store.calls().contains(&Call::IsMultisite));
}

#[tokio::test]
async fn test_generate_data_continues_past_failed_writes() {
    let store = Arc::new(RecordingStore {
        fields: catalog(),
        user_ids: vec![1, 2],
        failing_meta_key: Some("colour".to_string()),
        ..Default::default()
    });
    let pipeline = FieldDataPipeline::new(store.clone()).with_policy(FailurePolicy::Collect);

    let result = pipeline.run(&mut SilentProgress).await.expect("batch");

    assert_eq!(store.count(|c| matches!(c, Call::SetMeta(..))), 4);
    assert_eq!(result.attempted, 4);
    assert_eq!(result.succeeded, 2);
    assert_eq!(
        result.failures.iter().map(|f| f.index).collect::<Vec<_>>(),
        vec![0, 2]
    );
}

#[tokio::test]
async fn test_generate_data_skips_unrecognized_types() {
    let mut fields = catalog();
    fields.insert(1, FieldDefinition::new("birthday", "datepicker"));
    let store = Arc::new(RecordingStore {
        fields,
        user_ids: vec![1, 2],
        ..Default::default()
    });

    let result = FieldDataPipeline::new(store.clone())
        .run(&mut SilentProgress)
        .await
        .expect("batch");

    assert_eq!(result.attempted, 6);
    assert_eq!(result.skipped, 2);
    assert_eq!(store.count(|c| matches!(c, Call::SetMeta(..))), 4);
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SetMeta(_, key, _) if key == "birthday")));
}

#[tokio::test]
async fn test_generate_data_against_sqlite_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteUserStore::open(dir.path().join("e2e.db").to_str().expect("utf-8"))
        .await
        .expect("open");

    store
        .register_field(&FieldDefinition::new("first_name", "text").as_default())
        .await
        .expect("register");
    store
        .register_field(
            &FieldDefinition::new("hobbies", "multicheckbox")
                .with_options([("chess", "Chess"), ("golf", "Golf"), ("yoga", "Yoga")]),
        )
        .await
        .expect("register");
    store
        .register_field(&FieldDefinition::new("age", "number"))
        .await
        .expect("register");

    let avatars = Arc::new(ScriptedAvatars::new(0, false));
    let shared: Arc<dyn UserStore> = Arc::new(store.clone());
    let mut req = request(2, Some("k"));
    req.exact = true;
    AccountPipeline::new(shared.clone(), avatars, MediaLibrary::new(dir.path()))
        .run(&req, &mut SilentProgress)
        .await
        .expect("accounts");

    let result = FieldDataPipeline::new(shared.clone())
        .with_seed(4)
        .run(&mut SilentProgress)
        .await
        .expect("field data");
    assert_eq!(result.attempted, 4);

    for id in store.all_user_ids().await.expect("ids") {
        let hobbies = store
            .get_user_meta(id, "hobbies")
            .await
            .expect("meta")
            .expect("hobbies written");
        let keys: Vec<String> = serde_json::from_str(&hobbies).expect("JSON array of keys");
        assert_eq!(keys.len(), 2);

        let age = store
            .get_user_meta(id, "age")
            .await
            .expect("meta")
            .expect("age written");
        assert!(age.parse::<i64>().expect("decimal integer") >= 0);

        assert_eq!(store.get_user_meta(id, "first_name").await.expect("meta"), None);
    }
}
