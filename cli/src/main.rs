//! sigauth CLI - client for signature-authenticated servers.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sigauth_client::{
    AuthMethod, Client, ClientConfig, DEFAULT_SERVER_URL, LocalTransport, Transport,
};
use sigauth_core::{KeyPair, KeyStore};
use sigauth_handshake::Authenticator;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Signature-based authentication client
#[derive(Parser)]
#[command(name = "sigauth")]
#[command(about = "Authenticate to a sigauth server with an RSA key", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(short, long, global = true, env = "SIGAUTH_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Client id to register and authenticate as
    #[arg(short, long, global = true, env = "SIGAUTH_CLIENT_ID")]
    client_id: Option<String>,

    /// Directory for key files (default: platform config dir)
    #[arg(short, long, global = true, env = "SIGAUTH_KEY_DIR")]
    key_dir: Option<PathBuf>,

    /// Request timeout in seconds (default: none)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key management
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Register this client's public key with the server
    Register,
    /// Authenticate with one protocol
    Auth {
        /// timestamp, challenge or mutual
        method: AuthMethod,
    },
    /// Authenticate, then send a message to the echo endpoint
    Send {
        message: String,

        /// Protocol to authenticate with first
        #[arg(short, long, default_value = "challenge")]
        auth: AuthMethod,
    },
    /// Menu-driven session
    Interactive,
    /// Run every protocol against an in-process server
    Selftest,
}

#[derive(Subcommand)]
enum KeysAction {
    /// Generate a client key pair
    Generate {
        /// Replace an existing key pair
        #[arg(short, long)]
        force: bool,
    },
    /// Show the client's public key
    Show,
}

fn default_key_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("dev", "sigauth", "sigauth")
        .context("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

impl Cli {
    fn key_dir(&self) -> Result<PathBuf> {
        match &self.key_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_key_dir(),
        }
    }

    fn config(&self) -> Result<ClientConfig> {
        let client_id = match &self.client_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => bail!("A client id is required (--client-id or SIGAUTH_CLIENT_ID)"),
        };
        self.config_for(client_id)
    }

    fn config_for(&self, client_id: String) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(client_id, self.key_dir()?);
        config.server_url = self.server.clone();
        config.timeout = self.timeout.map(Duration::from_secs);
        Ok(config)
    }
}

fn connect(config: &ClientConfig) -> Result<Client> {
    Client::connect(config)
        .with_context(|| format!("Could not connect to {}", config.server_url))
}

fn cmd_keys_generate(key_dir: PathBuf, force: bool) -> Result<()> {
    let store = KeyStore::client(key_dir);
    if store.private_path().exists() {
        if !force {
            bail!(
                "Keys already exist at {}. Use --force to overwrite.",
                store.private_path().display()
            );
        }
        for path in [store.private_path(), store.public_path()] {
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Could not remove {}", path.display()))?;
            }
        }
    }

    let keys = store.ensure_keys()?;

    println!("Generated new key pair:");
    println!("  Fingerprint: {}", keys.public_key().fingerprint());
    println!("  Private key: {}", store.private_path().display());
    println!("  Public key:  {}", store.public_path().display());

    Ok(())
}

fn cmd_keys_show(key_dir: PathBuf) -> Result<()> {
    let store = KeyStore::client(key_dir);
    let public_key = store
        .load_public()
        .context("No client keys found. Run `sigauth keys generate` first.")?;

    println!("Client key:");
    println!("  Fingerprint: {}", public_key.fingerprint());
    println!("  File: {}", store.public_path().display());
    println!();
    print!("{}", public_key.to_pem()?);

    Ok(())
}

fn cmd_register(config: ClientConfig) -> Result<()> {
    let client = connect(&config)?;
    println!("Registered '{}' with {}", client.client_id(), config.server_url);
    println!("  Server key saved to: {}", config.server_key_path().display());
    Ok(())
}

fn cmd_auth(config: ClientConfig, method: AuthMethod) -> Result<()> {
    let mut client = connect(&config)?;
    client
        .authenticate_with(method)
        .with_context(|| format!("{} authentication failed", method))?;
    println!("✓ Authenticated '{}' ({})", client.client_id(), method);
    Ok(())
}

fn cmd_send(config: ClientConfig, message: &str, method: AuthMethod) -> Result<()> {
    let mut client = connect(&config)?;
    client
        .authenticate_with(method)
        .with_context(|| format!("{} authentication failed", method))?;

    let reply = client.send_message(message)?;
    println!("Sent:     {}", reply.original_message);
    println!("Received: {}", reply.reversed_message);
    Ok(())
}

fn prompt(input: &mut impl BufRead, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn cmd_interactive(cli: &Cli) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let client_id = match &cli.client_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => match prompt(&mut input, "Client ID: ")? {
            Some(id) if !id.is_empty() => id,
            _ => bail!("A client id is required"),
        },
    };
    let config = cli.config_for(client_id)?;
    let mut client = connect(&config)?;
    println!("Connected to {} as '{}'", config.server_url, client.client_id());

    loop {
        println!();
        println!("=== Menu ===");
        println!("1. One-way authentication (timestamp)");
        println!("2. One-way authentication (nonce challenge)");
        println!("3. Mutual authentication (nonces)");
        println!("4. Send a message");
        println!("0. Exit");

        let Some(choice) = prompt(&mut input, "Choose an action: ")? else {
            break;
        };
        match choice.as_str() {
            "1" => report(&mut client, AuthMethod::Timestamp),
            "2" => report(&mut client, AuthMethod::Challenge),
            "3" => report(&mut client, AuthMethod::Mutual),
            "4" => {
                if !client.is_authenticated() {
                    println!("Authenticate first.");
                    continue;
                }
                let Some(message) = prompt(&mut input, "Message: ")? else {
                    break;
                };
                match client.send_message(&message) {
                    Ok(reply) => {
                        println!("Sent:     {}", reply.original_message);
                        println!("Received: {}", reply.reversed_message);
                    }
                    Err(e) => println!("✗ {}", e),
                }
            }
            "0" => break,
            _ => println!("Invalid choice, try again."),
        }
    }

    println!("Bye.");
    Ok(())
}

fn report<T: Transport>(client: &mut Client<T>, method: AuthMethod) {
    match client.authenticate_with(method) {
        Ok(()) => println!("✓ {} authentication successful", method),
        Err(e) => println!("✗ {} authentication failed: {}", method, e),
    }
}

fn cmd_selftest(key_dir: PathBuf, client_id: Option<String>) -> Result<()> {
    let keys = KeyStore::client(key_dir).ensure_keys()?;
    let server = Arc::new(Authenticator::new(KeyPair::generate()?));
    let client_id = client_id.unwrap_or_else(|| "selftest".to_string());

    println!("Testing protocols against an in-process server...");
    println!("  Client: {} ({})", client_id, keys.public_key().short_fingerprint());
    println!("  Server key: {}", server.server_public_key().short_fingerprint());
    println!();

    let mut client = Client::new(client_id, keys, LocalTransport::new(Arc::clone(&server)));

    client.fetch_server_public_key()?;
    println!("1. Fetched server public key");

    client.register()?;
    println!("2. Registered");

    for (step, method) in AuthMethod::ALL.into_iter().enumerate() {
        client
            .authenticate_with(method)
            .with_context(|| format!("{} authentication failed", method))?;
        println!("{}. {} authentication succeeded", step + 3, method);
    }

    let reply = client.send_message("hello")?;
    println!(
        "6. Echo: {} -> {}",
        reply.original_message, reply.reversed_message
    );

    println!();
    println!("✓ All protocols successful!");

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Keys { action } => match action {
            KeysAction::Generate { force } => cmd_keys_generate(cli.key_dir()?, *force),
            KeysAction::Show => cmd_keys_show(cli.key_dir()?),
        },
        Commands::Register => cmd_register(cli.config()?),
        Commands::Auth { method } => cmd_auth(cli.config()?, *method),
        Commands::Send { message, auth } => cmd_send(cli.config()?, message, *auth),
        Commands::Interactive => cmd_interactive(&cli),
        Commands::Selftest => cmd_selftest(cli.key_dir()?, cli.client_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from([
            "sigauth",
            "--client-id",
            "alice",
            "--key-dir",
            "/tmp/keys",
            "send",
            "hello",
            "--auth",
            "mutual",
        ])
        .unwrap();
        let Commands::Send { message, auth } = &cli.command else {
            panic!("expected send");
        };
        assert_eq!(message, "hello");
        assert_eq!(*auth, AuthMethod::Mutual);

        let config = cli.config().unwrap();
        assert_eq!(config.client_id, "alice");
        assert_eq!(config.key_dir, PathBuf::from("/tmp/keys"));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(Cli::try_parse_from(["sigauth", "auth", "password"]).is_err());
    }

    #[test]
    fn test_keys_generate_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        KeyStore::client(dir.path()).ensure_keys_with_bits(1024).unwrap();

        assert!(cmd_keys_generate(dir.path().to_path_buf(), false).is_err());
    }
}
