//! CLI command definitions for userforge.
//!
//! The `users` group holds the two batch commands. `fields` and `site`
//! manage the local SQLite directory those batches run against.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use crate::avatar::{HttpAvatarSource, MediaLibrary};
use crate::batch::{BatchResult, FailurePolicy, ProgressStyle};
use crate::config::ForgeConfig;
use crate::pipeline::{AccountPipeline, FieldDataPipeline, GenerateAccounts, DEFAULT_ACCOUNT_COUNT};
use crate::store::{FieldQuery, SqliteUserStore, UserStore};
use crate::synth::FieldDefinition;

/// Synthetic user directory populator.
#[derive(Parser)]
#[command(name = "userforge")]
#[command(about = "Populate a user directory with synthetic accounts and profile data")]
#[command(version)]
#[command(
    long_about = "userforge creates throwaway accounts with avatars and fills custom profile fields with type-appropriate random values.\n\nExample usage:\n  userforge fields import --file fields.yaml\n  userforge users generate --number 30 --key $AVATAR_KEY\n  userforge users generate_data"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// SQLite URL or path of the user directory (overrides USERFORGE_DATABASE_URL).
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Directory avatar images are stored under (overrides USERFORGE_UPLOADS_DIR).
    #[arg(long, global = true)]
    pub uploads_dir: Option<PathBuf>,

    /// Avatar listing endpoint (overrides USERFORGE_AVATAR_API_URL).
    #[arg(long, global = true)]
    pub avatar_api_url: Option<String>,

    /// What to do with per-item failures: ignore, collect or abort.
    #[arg(long, global = true)]
    pub failure_policy: Option<FailurePolicy>,

    /// Progress display: bar, log or none.
    #[arg(long, default_value = "bar", global = true)]
    pub progress: ProgressStyle,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create accounts and fill profile fields.
    Users(UsersArgs),

    /// Manage custom profile field definitions.
    Fields(FieldsArgs),

    /// Inspect or change directory-wide settings.
    Site(SiteArgs),
}

#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersSubcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum UsersSubcommand {
    /// Create random accounts, each with an avatar from the avatar service.
    Generate(UsersGenerateArgs),

    /// Write a random value to every custom field of every user.
    #[command(name = "generate_data", alias = "generate-data")]
    GenerateData(UsersGenerateDataArgs),
}

/// Arguments for `userforge users generate`.
#[derive(Parser, Debug)]
pub struct UsersGenerateArgs {
    /// Number of accounts to request. One extra account is attempted unless --exact is set.
    #[arg(short = 'n', long, default_value_t = DEFAULT_ACCOUNT_COUNT)]
    pub number: usize,

    /// Avatar service API key.
    #[arg(short = 'k', long, env = "USERFORGE_AVATAR_API_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Attempt exactly --number accounts.
    #[arg(long)]
    pub exact: bool,

    /// Seed for avatar sampling.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the batch result as JSON instead of a success line.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `userforge users generate_data`.
#[derive(Parser, Debug)]
pub struct UsersGenerateDataArgs {
    /// Seed for value synthesis.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the batch result as JSON instead of a success line.
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct FieldsArgs {
    #[command(subcommand)]
    pub command: FieldsSubcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum FieldsSubcommand {
    /// Register field definitions from a YAML file.
    Import(FieldsImportArgs),

    /// Print the field catalog.
    List(FieldsListArgs),
}

/// Arguments for `userforge fields import`.
#[derive(Parser, Debug)]
pub struct FieldsImportArgs {
    /// YAML file holding a list of field definitions (or a `fields:` key with one).
    #[arg(short = 'f', long)]
    pub file: PathBuf,
}

/// Arguments for `userforge fields list`.
#[derive(Parser, Debug)]
pub struct FieldsListArgs {
    /// Include built-in default fields.
    #[arg(long)]
    pub all: bool,

    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SiteArgs {
    #[command(subcommand)]
    pub command: SiteSubcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum SiteSubcommand {
    /// Show or toggle multisite mode.
    Multisite(MultisiteArgs),
}

/// Arguments for `userforge site multisite`.
#[derive(Parser, Debug)]
pub struct MultisiteArgs {
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,
}

/// Field file layout accepted by `fields import`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldFile {
    List(Vec<FieldDefinition>),
    Wrapped { fields: Vec<FieldDefinition> },
}

impl FieldFile {
    fn into_fields(self) -> Vec<FieldDefinition> {
        match self {
            FieldFile::List(fields) | FieldFile::Wrapped { fields } => fields,
        }
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let progress = cli.progress;

    match cli.command {
        Commands::Users(args) => match args.command {
            UsersSubcommand::Generate(args) => {
                run_users_generate_command(&config, progress, args).await
            }
            UsersSubcommand::GenerateData(args) => {
                run_users_generate_data_command(&config, progress, args).await
            }
        },
        Commands::Fields(args) => match args.command {
            FieldsSubcommand::Import(args) => run_fields_import_command(&config, args).await,
            FieldsSubcommand::List(args) => run_fields_list_command(&config, args).await,
        },
        Commands::Site(args) => match args.command {
            SiteSubcommand::Multisite(args) => run_site_multisite_command(&config, args).await,
        },
    }
}

/// Environment settings with CLI flags applied on top.
fn resolve_config(cli: &Cli) -> anyhow::Result<ForgeConfig> {
    let mut config = ForgeConfig::from_env()?;

    if let Some(url) = &cli.database_url {
        config = config.with_database_url(url.clone());
    }
    if let Some(dir) = &cli.uploads_dir {
        config = config.with_uploads_dir(dir.clone());
    }
    if let Some(url) = &cli.avatar_api_url {
        config = config.with_avatar_api_url(url.clone());
    }
    if let Some(policy) = cli.failure_policy {
        config = config.with_failure_policy(policy);
    }

    config.validate()?;
    Ok(config)
}

async fn open_store(config: &ForgeConfig) -> anyhow::Result<SqliteUserStore> {
    SqliteUserStore::open(&config.database_url)
        .await
        .with_context(|| format!("Failed to open user directory at {}", config.database_url))
}

fn report(result: &BatchResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Success: {}", result.message);
    for failure in &result.failures {
        eprintln!(
            "  item {} ({}): {:?}: {}",
            failure.index, failure.label, failure.kind, failure.reason
        );
    }
    Ok(())
}

// ============================================================================
// Users Commands
// ============================================================================

async fn run_users_generate_command(
    config: &ForgeConfig,
    progress: ProgressStyle,
    args: UsersGenerateArgs,
) -> anyhow::Result<()> {
    let request = GenerateAccounts {
        number: args.number,
        api_key: args.key,
        exact: args.exact,
    };
    // A missing key must not leave a freshly created directory behind
    request.require_api_key()?;

    let store = open_store(config).await?;
    let avatars = HttpAvatarSource::new(config.avatar_api_url.clone(), config.http_timeout)
        .context("Failed to build the avatar HTTP client")?;

    let mut pipeline = AccountPipeline::new(
        Arc::new(store),
        Arc::new(avatars),
        MediaLibrary::new(config.uploads_dir.clone()),
    )
    .with_policy(config.failure_policy);
    if let Some(seed) = args.seed {
        pipeline = pipeline.with_seed(seed);
    }

    let mut observer = progress.observer();
    let result = pipeline.run(&request, observer.as_mut()).await?;
    info!(
        attempted = result.attempted,
        succeeded = result.succeeded,
        "Account generation finished"
    );
    report(&result, args.json)
}

async fn run_users_generate_data_command(
    config: &ForgeConfig,
    progress: ProgressStyle,
    args: UsersGenerateDataArgs,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    let mut pipeline = FieldDataPipeline::new(Arc::new(store)).with_policy(config.failure_policy);
    if let Some(seed) = args.seed {
        pipeline = pipeline.with_seed(seed);
    }

    let mut observer = progress.observer();
    let result = pipeline.run(observer.as_mut()).await?;
    info!(
        attempted = result.attempted,
        succeeded = result.succeeded,
        skipped = result.skipped,
        "Field data generation finished"
    );
    report(&result, args.json)
}

// ============================================================================
// Fields Commands
// ============================================================================

async fn run_fields_import_command(
    config: &ForgeConfig,
    args: FieldsImportArgs,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let fields = parse_field_file(&content)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;

    let store = open_store(config).await?;
    for field in &fields {
        if field.kind().is_none() {
            tracing::warn!(
                metakey = %field.metakey,
                field_type = %field.field_type,
                "Unrecognized field type; generate_data will skip this field"
            );
        }
        store.register_field(field).await?;
    }

    println!("Success: Imported {} field definitions.", fields.len());
    Ok(())
}

fn parse_field_file(content: &str) -> anyhow::Result<Vec<FieldDefinition>> {
    let file: FieldFile = serde_yaml::from_str(content)?;
    Ok(file.into_fields())
}

async fn run_fields_list_command(config: &ForgeConfig, args: FieldsListArgs) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let query = if args.all {
        FieldQuery::all()
    } else {
        FieldQuery::custom_only()
    };
    let fields = store.custom_fields(query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    if fields.is_empty() {
        println!("No custom fields defined.");
        return Ok(());
    }

    println!("{:<24} {:<14} {:<8} OPTIONS", "METAKEY", "TYPE", "DEFAULT");
    for field in &fields {
        println!(
            "{:<24} {:<14} {:<8} {}",
            field.metakey,
            field.field_type,
            if field.is_default { "yes" } else { "no" },
            field.option_keys().join(",")
        );
    }
    Ok(())
}

// ============================================================================
// Site Commands
// ============================================================================

async fn run_site_multisite_command(
    config: &ForgeConfig,
    args: MultisiteArgs,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    if args.enable || args.disable {
        store.set_multisite(args.enable).await?;
    }

    let enabled = store.is_multisite().await?;
    println!(
        "Multisite is {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_users_generate_defaults() {
        let cli = Cli::try_parse_from(["userforge", "users", "generate"]).expect("should parse");

        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.progress, ProgressStyle::Bar);
        assert!(cli.failure_policy.is_none());
        match cli.command {
            Commands::Users(UsersArgs {
                command: UsersSubcommand::Generate(args),
            }) => {
                assert_eq!(args.number, DEFAULT_ACCOUNT_COUNT);
                assert!(!args.exact);
                assert!(!args.json);
                assert!(args.seed.is_none());
            }
            _ => panic!("Expected users generate"),
        }
    }

    #[test]
    fn test_users_generate_with_options() {
        let cli = Cli::try_parse_from([
            "userforge",
            "users",
            "generate",
            "--number",
            "5",
            "--key",
            "secret",
            "--exact",
            "--json",
            "--failure-policy",
            "collect",
            "--progress",
            "none",
            "--database-url",
            "sqlite://test.db",
        ])
        .expect("should parse");

        assert_eq!(cli.failure_policy, Some(FailurePolicy::Collect));
        assert_eq!(cli.progress, ProgressStyle::None);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite://test.db"));
        match cli.command {
            Commands::Users(UsersArgs {
                command: UsersSubcommand::Generate(args),
            }) => {
                assert_eq!(args.number, 5);
                assert_eq!(args.key.as_deref(), Some("secret"));
                assert!(args.exact);
                assert!(args.json);
            }
            _ => panic!("Expected users generate"),
        }
    }

    #[test]
    fn test_generate_data_names() {
        for name in ["generate_data", "generate-data"] {
            let cli = Cli::try_parse_from(["userforge", "users", name, "--seed", "9"])
                .expect("should parse");
            match cli.command {
                Commands::Users(UsersArgs {
                    command: UsersSubcommand::GenerateData(args),
                }) => assert_eq!(args.seed, Some(9)),
                _ => panic!("Expected users generate_data"),
            }
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["userforge", "users", "generate", "--number", "-1"]).is_err());
        assert!(Cli::try_parse_from([
            "userforge",
            "users",
            "generate",
            "--failure-policy",
            "retry"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "userforge",
            "site",
            "multisite",
            "--enable",
            "--disable"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_field_file_layouts() {
        let list = r#"
- metakey: hobbies
  type: multicheckbox
  options:
    - { key: chess, label: Chess }
    - { key: golf, label: Golf }
- metakey: website
  type: url
"#;
        let fields = parse_field_file(list).expect("list layout");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].option_keys(), vec!["chess", "golf"]);

        let wrapped = r#"
fields:
  - metakey: bio
    type: textarea
    name: Biography
"#;
        let fields = parse_field_file(wrapped).expect("wrapped layout");
        assert_eq!(fields[0].name, "Biography");
        assert!(parse_field_file("just a string").is_err());
    }

    #[tokio::test]
    async fn test_generate_without_key_leaves_no_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("fresh.db");
        let config = ForgeConfig::new()
            .with_database_url(db.to_string_lossy().into_owned())
            .with_uploads_dir(dir.path().join("uploads"));

        for key in [None, Some("   ".to_string())] {
            let err = run_users_generate_command(
                &config,
                ProgressStyle::None,
                UsersGenerateArgs {
                    number: 5,
                    key,
                    exact: false,
                    seed: None,
                    json: false,
                },
            )
            .await
            .expect_err("missing key is fatal");
            assert!(err.to_string().contains("API key"));
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read tempdir")
            .collect();
        assert!(!db.exists());
        assert!(entries.is_empty(), "nothing should be created: {entries:?}");
    }

    #[tokio::test]
    async fn test_fields_import_and_site_commands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("cli.db");
        let file = dir.path().join("fields.yaml");
        std::fs::write(&file, "- metakey: age\n  type: number\n").expect("write yaml");

        let config = ForgeConfig::new().with_database_url(db.to_string_lossy().into_owned());
        run_fields_import_command(&config, FieldsImportArgs { file })
            .await
            .expect("import");
        run_site_multisite_command(
            &config,
            MultisiteArgs {
                enable: true,
                disable: false,
            },
        )
        .await
        .expect("toggle");

        let store = open_store(&config).await.expect("open");
        let fields = store
            .custom_fields(FieldQuery::custom_only())
            .await
            .expect("fields");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].metakey, "age");
        assert!(store.is_multisite().await.expect("flag"));
    }
}
