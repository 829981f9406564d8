//! regcred — resolve container registry credentials
//!
//! Thin CLI over `regcred-core`, with four subcommands: `resolve`, `encrypt`,
//! `keygen` and `sources`.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use regcred_core::{
    AuthConfig, Decryptor, EncryptionKey, IdentityDecryptor, KeyDecryptor, Kind, LogFormat,
    LoggingConfig, PropertyBag, Resolver,
};

/// Environment variable holding a base64 encryption key
const KEY_ENV: &str = "REGCRED_KEY";

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Resolve container registry credentials from properties, environment,
/// configured servers and Docker config
#[derive(Parser)]
#[command(name = "regcred", version, about, long_about = None)]
struct Cli {
    /// Path to YAML configuration (defaults apply when omitted)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve credentials for a registry or image
    Resolve(ResolveArgs),
    /// Encrypt a password read from stdin
    Encrypt(KeyArgs),
    /// Generate a new random encryption key
    Keygen,
    /// List enabled credential sources in priority order
    Sources,
}

#[derive(Parser)]
struct ResolveArgs {
    /// Direction of registry traffic: push or pull
    #[arg(short = 'k', long, default_value = "pull")]
    kind: Kind,

    /// Registry hostname
    #[arg(short = 'r', long, conflicts_with = "image", required_unless_present = "image")]
    registry: Option<String>,

    /// Image reference to derive the registry from
    #[arg(short = 'i', long)]
    image: Option<String>,

    /// Preferred account when a registry has several
    #[arg(short = 'u', long)]
    user: Option<String>,

    /// Property KEY=VALUE (repeatable, overrides configured properties)
    #[arg(short = 'D', long = "property")]
    property: Vec<String>,

    #[command(flatten)]
    key: KeyArgs,

    /// Print the X-Registry-Auth header value instead of a summary
    #[arg(long)]
    header: bool,
}

#[derive(Parser)]
struct KeyArgs {
    /// File holding a base64 encryption key (falls back to $REGCRED_KEY)
    #[arg(long = "key-file")]
    key_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    let result = match cli.command {
        Commands::Resolve(args) => cmd_resolve(&config, args),
        Commands::Encrypt(args) => cmd_encrypt(args),
        Commands::Keygen => cmd_keygen(),
        Commands::Sources => cmd_sources(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AuthConfig> {
    match path {
        Some(path) => AuthConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AuthConfig::default()),
    }
}

/// Initialize tracing from RUST_LOG, falling back to the configured level
fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // Logs go to stderr so stdout stays clean for piping
    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr).json())
                .init();
        }
    }
}

fn load_key(args: &KeyArgs) -> Result<Option<EncryptionKey>> {
    if let Some(path) = &args.key_file {
        let key = EncryptionKey::load_from_path(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?;
        return Ok(Some(key));
    }

    match std::env::var(KEY_ENV) {
        Ok(encoded) => {
            let key = EncryptionKey::from_base64(&encoded)
                .with_context(|| format!("invalid key in ${KEY_ENV}"))?;
            Ok(Some(key))
        }
        Err(_) => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_resolve(config: &AuthConfig, args: ResolveArgs) -> Result<()> {
    let overrides = PropertyBag::from_assignments(&args.property)
        .map_err(anyhow::Error::msg)
        .context("invalid --property")?;

    let resolver = Resolver::from_config(config, &overrides)
        .context("failed to assemble credential sources")?;

    let key_decryptor = load_key(&args.key)?.map(KeyDecryptor::new);
    let decryptor: &dyn Decryptor = match &key_decryptor {
        Some(decryptor) => decryptor,
        None => &IdentityDecryptor,
    };

    let user = args.user.as_deref();
    let (registry, bundle) = match (&args.registry, &args.image) {
        (Some(registry), _) => (
            registry.clone(),
            resolver.resolve(args.kind, user, registry, decryptor)?,
        ),
        (None, Some(image)) => (
            regcred_core::extract_registry(image),
            resolver.resolve_for_image(args.kind, user, image, decryptor)?,
        ),
        (None, None) => bail!("either --registry or --image is required"),
    };

    let Some(bundle) = bundle else {
        println!("no credentials for {registry} ({})", args.kind);
        return Ok(());
    };

    if args.header {
        println!("{}", bundle.to_header_value());
        return Ok(());
    }

    println!("registry: {registry}");
    println!("kind:     {}", args.kind);
    println!("username: {}", bundle.username().unwrap_or("-"));
    println!("email:    {}", bundle.email().unwrap_or("-"));
    println!(
        "password: {}",
        if bundle.password().is_some() { "set" } else { "-" }
    );
    println!(
        "auth:     {}",
        if bundle.auth().is_some() { "set" } else { "-" }
    );

    Ok(())
}

fn cmd_encrypt(args: KeyArgs) -> Result<()> {
    let Some(key) = load_key(&args)? else {
        bail!("an encryption key is required (--key-file or ${KEY_ENV})");
    };

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    let plaintext = line.trim_end_matches(['\r', '\n']);
    if plaintext.is_empty() {
        bail!("empty password on stdin");
    }

    let encrypted = key
        .encrypt_value(plaintext)
        .context("failed to encrypt password")?;
    println!("{encrypted}");

    Ok(())
}

fn cmd_keygen() -> Result<()> {
    println!("{}", EncryptionKey::generate().to_base64());
    Ok(())
}

fn cmd_sources(config: &AuthConfig) -> Result<()> {
    let resolver = Resolver::from_config(config, &PropertyBag::new())
        .context("failed to assemble credential sources")?;

    for (priority, id) in resolver.source_ids().iter().enumerate() {
        println!("{}. {id}", priority + 1);
    }

    Ok(())
}
