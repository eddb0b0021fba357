//! burnlink: one-time secret CLI
//!
//! Commands:
//!   create [<text>]      - encrypt a secret, store it, print its share link(s)
//!   open <link>          - fetch and decrypt a secret (counts as a view)
//!   burn <id|link>       - destroy a secret immediately
//!   purge                - remove expired secrets from the store
//!   config show          - display current configuration
//!   gen-password         - print a random password
//!
//! Secrets are stored through the directory-backed store at `store.dir`.

use anyhow::{Context, Result};
use burnlink_core::{
    BurnlinkConfig, BurnlinkError, Creator, PolicyLimits, PolicyViolation, SecretId, SecretPolicy,
};
use burnlink_crypto::{generate_password, DecryptError, PasswordRules};
use burnlink_share::{
    create_secret, open, BundledFile, DirStore, OpenedSecret, SecretRequest, SecretStore,
    ShareLinkCodec, StoreLimits,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsStr;
use std::io::{IsTerminal, Read};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;

/// Password prompts before `open` gives up
const MAX_PASSWORD_ATTEMPTS: usize = 3;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "burnlink",
    version,
    about = "One-time secrets, encrypted before they leave your machine",
    long_about = "burnlink: create, open, and burn client-side encrypted one-time secrets"
)]
struct Cli {
    /// Path to burnlink.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "BURNLINK_CONFIG",
        default_value = "~/.config/burnlink/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides log.level
    #[arg(long, env = "BURNLINK_LOG")]
    log: Option<String>,

    /// Log format; overrides log.format
    #[arg(long, env = "BURNLINK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt and store a new secret
    ///
    /// The text is read from the argument, from --text-file, or from stdin.
    Create(CreateArgs),

    /// Retrieve and decrypt a secret from its share link
    ///
    /// Retrieval counts as a view: a burn-after-reading secret is gone
    /// afterwards even if decryption fails.
    Open(OpenArgs),

    /// Destroy a secret before it is read or expires
    Burn {
        /// Secret id or share link
        target: String,
    },

    /// Remove every expired secret from the store
    Purge,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate a random password
    #[command(name = "gen-password")]
    GenPassword {
        #[arg(long, short = 'l', default_value_t = 16)]
        length: usize,
        /// Leave out digits
        #[arg(long)]
        no_numbers: bool,
        /// Leave out symbols
        #[arg(long)]
        no_symbols: bool,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Secret text (default: read stdin)
    #[arg(conflicts_with = "text_file")]
    text: Option<String>,

    /// Read the secret text from a file
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Optional title, encrypted like the text
    #[arg(long, short = 't')]
    title: Option<String>,

    /// Attach a file (repeatable); all files travel in one encrypted bundle
    #[arg(long = "file", short = 'f')]
    files: Vec<PathBuf>,

    /// Time-to-live in seconds (default: policy.default_ttl)
    #[arg(long)]
    ttl: Option<u64>,

    /// Views allowed when --prevent-burn is set
    #[arg(long, default_value_t = 1)]
    max_views: u32,

    /// Keep the secret for up to --max-views reads instead of burning it on the first
    #[arg(long)]
    prevent_burn: bool,

    /// Only this client IP may retrieve the secret
    #[arg(long)]
    allowed_ip: Option<IpAddr>,

    /// Protect the secret with a password
    #[arg(long, env = "BURNLINK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Prompt for the password instead of passing it on the command line
    #[arg(long, conflicts_with_all = ["password", "generate_password"])]
    ask_password: bool,

    /// Protect the secret with a freshly generated password
    #[arg(long, conflicts_with = "password")]
    generate_password: bool,

    /// Create as a signed-in user (unlocks the two- and four-week TTLs)
    #[arg(long)]
    authenticated: bool,
}

#[derive(Args, Debug)]
struct OpenArgs {
    /// Share link (with or without #encryption_key=...)
    link: String,

    /// Password for protected secrets (prompted for if missing)
    #[arg(long, env = "BURNLINK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory to write attached files into
    #[arg(long, short = 'o', default_value = ".")]
    out: PathBuf,

    /// Client address presented to IP-restricted secrets
    #[arg(long)]
    client_ip: Option<IpAddr>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);
    let (config, found) = load_config(&config_path).await?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, &format);

    if !found {
        tracing::warn!(
            "config file not found: {}  (using defaults)",
            config_path.display()
        );
    }

    match cli.command {
        Commands::Create(args) => cmd_create(&config, args).await,
        Commands::Open(args) => cmd_open(&config, args).await,
        Commands::Burn { target } => cmd_burn(&config, &target).await,
        Commands::Purge => cmd_purge(&config).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path, found),
        Commands::GenPassword {
            length,
            no_numbers,
            no_symbols,
        } => cmd_gen_password(length, !no_numbers, !no_symbols),
    }
}

/// Print the friendly message first, then the detail chain.
fn report(err: &anyhow::Error) {
    match friendly_message(err) {
        Some(message) => {
            eprintln!("error: {message}");
            eprintln!("  {err:#}");
        }
        None => eprintln!("error: {err:#}"),
    }
}

fn friendly_message(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<BurnlinkError>().map(BurnlinkError::user_message)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries links and plaintext; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Returns the config and whether it came from a file.
async fn load_config(path: &Path) -> Result<(BurnlinkConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = BurnlinkConfig::from_toml(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((BurnlinkConfig::default(), false))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    expand_tilde_with(path, std::env::var_os("HOME").as_deref())
}

fn expand_tilde_with(path: &Path, home: Option<&OsStr>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => Path::new(home).join(rest),
        _ => path.to_path_buf(),
    }
}

fn store_for(config: &BurnlinkConfig, creator: Creator) -> DirStore {
    let limits = StoreLimits {
        policy: config.policy.clone(),
        max_envelope_bytes: config.store.max_envelope_bytes,
        creator,
    };
    DirStore::new(expand_tilde(&config.store.dir), limits)
}

// ── `burnlink create` ─────────────────────────────────────────────────────────

async fn cmd_create(config: &BurnlinkConfig, args: CreateArgs) -> Result<()> {
    let codec = ShareLinkCodec::new(&config.share.base_url)?;
    let creator = if args.authenticated {
        Creator::Authenticated
    } else {
        Creator::Anonymous
    };
    let policy = request_policy(&config.policy, &args);

    let text = match (&args.text, &args.text_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading secret text: {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading secret text from stdin")?;
            buf
        }
    };

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading attachment: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("attachment has no file name: {}", path.display()))?;
        files.push(BundledFile::new(name, content));
    }

    let (password, generated) = if args.generate_password {
        let password = generate_password(&mut OsRng, &PasswordRules::default())?;
        (Some(password), true)
    } else if args.ask_password {
        (Some(prompt_new_password()?), false)
    } else {
        (args.password.map(SecretString::from), false)
    };

    let mut request = SecretRequest::new(text);
    request.policy = policy;
    request.title = SecretString::from(args.title.unwrap_or_default());
    request.files = files;
    request.password = password;
    request.creator = creator;

    let store = store_for(config, creator);
    let created = create_secret(
        &store,
        &codec,
        &request,
        &config.policy,
        &config.kdf.params(),
        &mut OsRng,
    )
    .await
    .map_err(|e| {
        if matches!(e, BurnlinkError::Policy(PolicyViolation::TtlNotAllowed { .. })) {
            eprintln!("available TTLs: {}", describe_ttl_choices(&config.policy, creator));
        }
        e
    })?;

    println!("Secret:        {}", created.id);
    println!("Expires in:    {}", describe_ttl(request.policy.ttl));
    println!("Views:         {}", describe_views(&request.policy));
    println!("Link:          {}", created.full_link);

    if let Some(password) = request.password.as_ref().filter(|p| !p.expose_secret().is_empty()) {
        println!("Link (no key): {}", created.bare_link);
        if generated {
            println!("Password:      {}", password.expose_secret());
        }
        println!();
        println!("Send the password separately from either link.");
    }
    Ok(())
}

/// The configured default policy with the command-line overrides applied.
fn request_policy(limits: &PolicyLimits, args: &CreateArgs) -> SecretPolicy {
    let mut policy = limits.default_policy();
    if let Some(ttl) = args.ttl {
        policy.ttl = ttl;
    }
    policy.max_views = args.max_views;
    policy.prevent_burn = args.prevent_burn;
    policy.allowed_ip = args.allowed_ip.map(|ip| ip.to_string());
    policy
}

fn prompt_new_password() -> Result<SecretString> {
    let first = rpassword::prompt_password("Password: ").context("reading password")?;
    let confirm = rpassword::prompt_password("Confirm password: ").context("reading password")?;
    if first != confirm {
        anyhow::bail!("passwords do not match");
    }
    Ok(SecretString::from(first))
}

fn describe_ttl(seconds: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (604_800, "week"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
        (1, "second"),
    ];
    for (size, name) in UNITS {
        if seconds >= size && seconds % size == 0 {
            let n = seconds / size;
            return format!("{n} {name}{}", if n == 1 { "" } else { "s" });
        }
    }
    "0 seconds".into()
}

fn describe_ttl_choices(limits: &PolicyLimits, creator: Creator) -> String {
    limits
        .ttl_choices(creator)
        .into_iter()
        .map(|ttl| format!("{} ({ttl}s)", describe_ttl(ttl)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_views(policy: &SecretPolicy) -> String {
    if policy.prevent_burn {
        format!("up to {}", policy.max_views)
    } else {
        "1 (burned after reading)".into()
    }
}

// ── `burnlink open` ───────────────────────────────────────────────────────────

async fn cmd_open(config: &BurnlinkConfig, args: OpenArgs) -> Result<()> {
    let locator = ShareLinkCodec::decode(&args.link)?;
    let store = store_for(config, Creator::Anonymous);

    // Fetch once: every later attempt reuses this envelope without spending a view.
    let envelope = store
        .fetch(&locator.id, args.client_ip)
        .await
        .map_err(BurnlinkError::from)?;

    let interactive = std::io::stdin().is_terminal();
    let mut password = args.password.map(SecretString::from);
    let mut attempts = 0;

    let opened = loop {
        match open(&envelope, &locator, password.as_ref()) {
            Ok(opened) => break opened,
            Err(
                e @ (BurnlinkError::PasswordRequired
                | BurnlinkError::Decrypt(DecryptError::AuthenticationFailed)),
            ) if interactive
                && envelope.policy.password_protected
                && attempts < MAX_PASSWORD_ATTEMPTS =>
            {
                if password.is_some() {
                    eprintln!("{}", e.user_message());
                }
                attempts += 1;
                let entered =
                    rpassword::prompt_password("Password: ").context("reading password")?;
                password = Some(SecretString::from(entered));
            }
            Err(e) => return Err(e.into()),
        }
    };

    print_opened(&opened);
    save_files(&opened, &args.out).await
}

fn print_opened(opened: &OpenedSecret) {
    if !opened.title.is_empty() {
        println!("# {}", opened.title.as_str());
        println!();
    }
    println!("{}", opened.text.as_str());
}

async fn save_files(opened: &OpenedSecret, out: &Path) -> Result<()> {
    if opened.files.is_empty() {
        return Ok(());
    }

    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("creating output dir: {}", out.display()))?;

    for (index, file) in opened.files.iter().enumerate() {
        let dest = out.join(safe_file_name(&file.name, index));
        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
            .with_context(|| format!("creating {} (refusing to overwrite)", dest.display()))?;
        handle
            .write_all(&file.content)
            .await
            .with_context(|| format!("writing {}", dest.display()))?;
        eprintln!("saved {} ({} bytes)", dest.display(), file.content.len());
    }
    Ok(())
}

/// Final path component of an attachment name, so a bundle cannot write
/// outside the output directory.
fn safe_file_name(name: &str, index: usize) -> String {
    match name.rsplit(|c: char| c == '/' || c == '\\').next() {
        Some(base) if !matches!(base, "" | "." | "..") => base.to_string(),
        _ => format!("attachment-{}", index + 1),
    }
}

// ── `burnlink burn` ───────────────────────────────────────────────────────────

async fn cmd_burn(config: &BurnlinkConfig, target: &str) -> Result<()> {
    let id = parse_target(target)?;
    store_for(config, Creator::Anonymous)
        .burn(&id)
        .await
        .map_err(BurnlinkError::from)?;
    println!("burned {id}");
    Ok(())
}

// ── `burnlink purge` ──────────────────────────────────────────────────────────

async fn cmd_purge(config: &BurnlinkConfig) -> Result<()> {
    let purged = store_for(config, Creator::Anonymous)
        .purge_expired()
        .await
        .map_err(BurnlinkError::from)?;
    println!("purged {purged} expired secret(s)");
    Ok(())
}

/// Accept either a bare secret id or a share link.
fn parse_target(target: &str) -> Result<SecretId> {
    if target.contains("://") {
        Ok(ShareLinkCodec::decode(target)?.id)
    } else {
        Ok(SecretId::parse(target.trim())?)
    }
}

// ── `burnlink config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &BurnlinkConfig, config_path: &Path, found: bool) -> Result<()> {
    if found {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!(
        "# TTLs (anonymous): {}",
        describe_ttl_choices(&config.policy, Creator::Anonymous)
    );
    println!(
        "# TTLs (authenticated): {}",
        describe_ttl_choices(&config.policy, Creator::Authenticated)
    );
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── `burnlink gen-password` ───────────────────────────────────────────────────

fn cmd_gen_password(length: usize, numbers: bool, symbols: bool) -> Result<()> {
    let rules = PasswordRules {
        length,
        numbers,
        symbols,
        ..PasswordRules::default()
    };
    let password = generate_password(&mut OsRng, &rules)?;
    println!("{}", password.expose_secret());
    Ok(())
}
