use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hostvault::error::Result;
use hostvault::host;
use hostvault::keyfile;
use hostvault::scope::Scope;
use hostvault::store::{self, ListEntry, StoreContext};

#[derive(Parser)]
#[command(name = "hostvault")]
#[command(about = "Host-bound password store: secrets only this machine can decrypt")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate key material for a scope (run once before first use)
    Init {
        /// Initialize the per-user scope instead of system-wide
        #[arg(short = 'r', long)]
        asuser: bool,
    },
    /// Encrypt a secret and add it to the store
    Add {
        /// Use the per-user scope instead of system-wide
        #[arg(short = 'r', long)]
        asuser: bool,
        /// Name identifying the stored object
        #[arg(short, long, value_name = "NAME")]
        name: String,
        /// Store file to use instead of the scope default
        #[arg(short, long, value_name = "FN")]
        file: Option<PathBuf>,
        /// Process identity authorized to read the secret back
        #[arg(short, long, value_name = "ID")]
        process: Option<String>,
        /// Secret value; prompted in two hidden parts when omitted
        #[arg(long, value_name = "VALUE")]
        value: Option<String>,
    },
    /// Delete an object you own from the store
    Del {
        /// Use the per-user scope instead of system-wide
        #[arg(short = 'r', long)]
        asuser: bool,
        /// Name identifying the stored object
        #[arg(short, long, value_name = "NAME")]
        name: String,
        /// Store file to use instead of the scope default
        #[arg(short, long, value_name = "FN")]
        file: Option<PathBuf>,
    },
    /// List stored objects without decrypting them
    List {
        /// Use the per-user scope instead of system-wide
        #[arg(short = 'r', long)]
        asuser: bool,
        /// Store file to use instead of the scope default
        #[arg(short, long, value_name = "FN")]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { asuser } => cmd_init(scope_of(asuser)),
        Commands::Add {
            asuser,
            name,
            file,
            process,
            value,
        } => cmd_add(scope_of(asuser), &name, file, process, value),
        Commands::Del { asuser, name, file } => cmd_del(scope_of(asuser), &name, file),
        Commands::List { asuser, file } => cmd_list(scope_of(asuser), file),
    }
}

fn scope_of(asuser: bool) -> Scope {
    if asuser {
        Scope::User
    } else {
        Scope::System
    }
}

fn cmd_init(scope: Scope) -> Result<()> {
    let user = host::current_user();
    let paths = scope.paths(None)?;

    keyfile::initialize(scope, &paths, &user)?;

    let label = match scope {
        Scope::System => "system-wide",
        Scope::User => "per-user",
    };
    println!("Initialized {label} scope ({})", paths.dir.display());
    Ok(())
}

fn cmd_add(
    scope: Scope,
    name: &str,
    file: Option<PathBuf>,
    process: Option<String>,
    value: Option<String>,
) -> Result<()> {
    let ctx = StoreContext::resolve(scope, file)?;

    let secret = match value {
        Some(v) => v.into_bytes(),
        None => prompt_secret()?,
    };
    let process = process.unwrap_or_default();

    store::add(&ctx, name, &process, &secret)?;
    println!("Stored {name}");
    Ok(())
}

fn cmd_del(scope: Scope, name: &str, file: Option<PathBuf>) -> Result<()> {
    let ctx = StoreContext::resolve(scope, file)?;
    store::delete(&ctx, name)?;
    println!("Deleted {name}");
    Ok(())
}

fn cmd_list(scope: Scope, file: Option<PathBuf>) -> Result<()> {
    let ctx = StoreContext::resolve(scope, file)?;

    let mut entries: Vec<ListEntry> = Vec::new();
    for entry in store::list(&ctx)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => tracing::warn!("skipping unreadable record: {e}"),
        }
    }

    if entries.is_empty() {
        println!("No secrets stored.");
        return Ok(());
    }
    print_table(&entries);
    Ok(())
}

/// The secret is entered as two separately prompted parts, concatenated.
fn prompt_secret() -> Result<Vec<u8>> {
    let first = rpassword::prompt_password("Enter 1st part: ")?;
    let second = rpassword::prompt_password("Enter 2nd part: ")?;

    let mut secret = first.into_bytes();
    secret.extend_from_slice(second.as_bytes());
    Ok(secret)
}

fn print_table(entries: &[ListEntry]) {
    let object_width = entries
        .iter()
        .map(|e| e.object.len())
        .chain(["OBJECT".len()])
        .max()
        .unwrap_or(0);
    let owner_width = entries
        .iter()
        .map(|e| e.owner.len())
        .chain(["OWNER".len()])
        .max()
        .unwrap_or(0);

    println!("{:<object_width$}  {:<owner_width$}  PROCESS", "OBJECT", "OWNER");
    for e in entries {
        println!(
            "{:<object_width$}  {:<owner_width$}  {}",
            e.object, e.owner, e.process_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["hostvault", "init", "--asuser"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { asuser: true }));

        let cli = Cli::try_parse_from([
            "hostvault", "add", "-r", "-n", "db-password", "-p", "/usr/bin/backup",
        ])
        .unwrap();
        if let Commands::Add {
            asuser,
            name,
            process,
            file,
            value,
        } = cli.command
        {
            assert!(asuser);
            assert_eq!(name, "db-password");
            assert_eq!(process.as_deref(), Some("/usr/bin/backup"));
            assert!(file.is_none());
            assert!(value.is_none());
        } else {
            panic!("Expected Add command");
        }

        let cli = Cli::try_parse_from(["hostvault", "del", "-n", "db-password"]).unwrap();
        if let Commands::Del { asuser, name, file } = cli.command {
            assert!(!asuser);
            assert_eq!(name, "db-password");
            assert!(file.is_none());
        } else {
            panic!("Expected Del command");
        }

        let cli = Cli::try_parse_from(["hostvault", "list", "-f", "/tmp/store"]).unwrap();
        if let Commands::List { asuser, file } = cli.command {
            assert!(!asuser);
            assert_eq!(file, Some(PathBuf::from("/tmp/store")));
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_requires_name_for_add() {
        assert!(Cli::try_parse_from(["hostvault", "add"]).is_err());
    }

    #[test]
    fn test_cli_has_no_get_subcommand() {
        assert!(Cli::try_parse_from(["hostvault", "get", "-n", "x"]).is_err());
    }
}
