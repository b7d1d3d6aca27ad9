//! cldap - LDAP explorer
//!
//! Configures access to an LDAP directory, authenticates a user against it and searches
//! user entries and group memberships.

mod commands;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use cldap_core::ConfigStore;
use commands::CommandContext;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cldap")]
#[command(version)]
#[command(about = "LDAP Explorer")]
#[command(long_about = "LDAP Explorer that allows for LDAP schema exploration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use this configuration file instead of ~/.cldap/cldap-conf.yaml
    #[arg(long, global = true, env = "CLDAP_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CLDAP_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure LDAP details from a YAML file
    Configure(ConfigureArgs),

    /// Log the user in to the LDAP instance
    Login(LoginArgs),

    /// Search users or group memberships
    Search(SearchArgs),

    /// Remove the stored configuration and credentials
    Reset,
}

/// Arguments of the `configure` command.
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Configuration YAML to load
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments of the `login` command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Username for login
    #[arg(short, long)]
    pub username: String,

    /// Password for login
    #[arg(short, long, env = "CLDAP_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments of the `search` command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["entry", "group"])))]
pub struct SearchArgs {
    /// Search user entries matching this username
    #[arg(short, long)]
    pub entry: Option<String>,

    /// List the groups this username belongs to
    #[arg(short, long)]
    pub group: Option<String>,
}

/// Output format for command results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli).await {
        println!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        print_banner();
        return Ok(());
    };

    let store = match cli.config_file {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::from_home()?,
    };
    let ctx = CommandContext::new(store, cli.output);

    match command {
        Commands::Configure(args) => commands::configure::execute(&ctx, &args),
        Commands::Login(args) => commands::login::execute(&ctx, &args).await,
        Commands::Search(args) => commands::search::execute(&ctx, &args).await,
        Commands::Reset => commands::reset::execute(&ctx),
    }
}

fn print_banner() {
    println!(
        r"
    _____ _      _____          _____
  / ____| |    |  __ \   /\   |  __ \
 | |    | |    | |  | | /  \  | |__) |
 | |    | |    | |  | |/ /\ \ |  ___/
 | |____| |____| |__| / ____ \| |
  \_____|______|_____/_/    \_\_|

   Explore LDAP Cli
   Version: {}
",
        env!("CARGO_PKG_VERSION")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_login_flags() {
        let cli =
            Cli::try_parse_from(["cldap", "login", "-u", "alice", "-p", "wonderland"]).unwrap();
        match cli.command {
            Some(Commands::Login(args)) => {
                assert_eq!(args.username, "alice");
                assert_eq!(args.password, "wonderland");
            }
            _ => panic!("expected login command"),
        }
    }

    #[test]
    fn search_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["cldap", "search"]).is_err());
        assert!(
            Cli::try_parse_from(["cldap", "search", "--entry", "a", "--group", "b"]).is_err()
        );

        let cli =
            Cli::try_parse_from(["cldap", "search", "--group", "alice", "-o", "json"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Some(Commands::Search(args)) => {
                assert_eq!(args.group.as_deref(), Some("alice"));
                assert!(args.entry.is_none());
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn configure_requires_config_path() {
        assert!(Cli::try_parse_from(["cldap", "configure"]).is_err());
        let cli = Cli::try_parse_from(["cldap", "configure", "-c", "ldap.yaml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Configure(_))));
    }

    #[test]
    fn no_subcommand_is_accepted() {
        let cli = Cli::try_parse_from(["cldap"]).unwrap();
        assert!(cli.command.is_none());
    }
}
