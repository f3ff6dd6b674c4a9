use crate::{
    ConnectionSettings, EnvAssignments, ExportPolicy, ExportSpec, GlobalConfig, GlobalDefaults,
    OutputFormat, Result, SecretSource, VaultClient, VaultEnvError, fetch_and_extract,
    request_url, resolve_exports,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{self, WrapErr};
use colored::Colorize;
use std::io::{self, IsTerminal, Write};
use std::process::Command;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main CLI structure for the vaultenv application.
#[derive(Parser)]
#[command(name = "vaultenv")]
#[command(about = "Export secrets from a Vault-style key/value store as environment variables", long_about = None)]
#[command(version)]
struct Cli {
    /// Log verbosity (VAULTENV_LOG overrides this with a full filter)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the vaultenv CLI.
#[derive(Subcommand)]
enum Commands {
    /// Print export statements for fields of one secret
    Export {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Secret path to read, relative to /v1/
        #[arg(long)]
        path: String,
        /// NAME=key mapping; NAME is set to the value of key (repeatable)
        #[arg(long = "eks", value_name = "NAME=KEY", required = true)]
        eks: Vec<ExportSpec>,
        /// Allow mapping only some of the secret's fields
        #[arg(long)]
        skip_count_check: bool,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print one string value from each of several secrets
    Extract {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Secret path to read, relative to /v1/ (repeatable)
        #[arg(long = "path", value_name = "PATH", required = true)]
        paths: Vec<String>,
        /// Key to read from the --path at the same position (repeatable)
        #[arg(long = "key", value_name = "KEY", required = true)]
        keys: Vec<String>,
        /// Variable to assign the --key at the same position to (repeatable)
        #[arg(long = "evar", value_name = "NAME", required = true)]
        env_vars: Vec<String>,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Run a command with secrets injected
    Run {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        selection: SelectionArgs,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Init or show ~/.config/vaultenv/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration-related subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize user configuration
    Init,
    /// Show current configuration
    Show,
}

/// Log levels accepted by --log-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Where the secret store is and how to authenticate against it.
#[derive(Args)]
struct ConnectionArgs {
    /// Base URL of the secret store
    #[arg(long, env = "VAULT_ADDR")]
    url: Option<String>,
    /// Access token sent in the X-Vault-Token header (prompted for if missing)
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl ConnectionArgs {
    fn connect(self, config: Option<&GlobalConfig>) -> Result<VaultClient> {
        let token = match self.token {
            Some(token) => Some(token),
            None => prompt_token()?,
        };
        let settings = ConnectionSettings::resolve(self.url, token, config)?;
        debug!(url = %settings.url, "Resolved connection settings");
        VaultClient::new(settings.url, settings.token)
    }
}

/// Which secrets `run` injects: either `--eks` mappings for a single
/// `--path`, or parallel `--path`/`--key`/`--evar` lists.
#[derive(Args)]
struct SelectionArgs {
    /// Secret path to read, relative to /v1/ (repeatable)
    #[arg(long = "path", value_name = "PATH", required = true)]
    paths: Vec<String>,
    /// NAME=key mapping for the single --path (repeatable)
    #[arg(long = "eks", value_name = "NAME=KEY", conflicts_with_all = ["keys", "env_vars"])]
    eks: Vec<ExportSpec>,
    /// Key to read from the --path at the same position (repeatable)
    #[arg(long = "key", value_name = "KEY")]
    keys: Vec<String>,
    /// Variable to assign the --key at the same position to (repeatable)
    #[arg(long = "evar", value_name = "NAME")]
    env_vars: Vec<String>,
    /// Allow --eks to map only some of the secret's fields
    #[arg(long)]
    skip_count_check: bool,
}

impl SelectionArgs {
    fn resolve(&self, source: &dyn SecretSource) -> Result<EnvAssignments> {
        if self.eks.is_empty() {
            return fetch_and_extract(source, &self.paths, &self.keys, &self.env_vars);
        }

        match self.paths.as_slice() {
            [path] => {
                let response = source.read(path)?;
                resolve_exports(&response, &self.eks, export_policy(self.skip_count_check))
            }
            paths => Err(VaultEnvError::ExpectedSinglePath(paths.len())),
        }
    }
}

fn export_policy(skip_count_check: bool) -> ExportPolicy {
    if skip_count_check {
        ExportPolicy::AllowSubset
    } else {
        ExportPolicy::ExactCount
    }
}

fn output_format(flag: Option<OutputFormat>, config: Option<&GlobalConfig>) -> OutputFormat {
    flag.or_else(|| config.and_then(|c| c.defaults.format))
        .unwrap_or_default()
}

/// Reads a token from the terminal without echoing it.
///
/// Returns `None` when stdin is not a terminal, so scripted use fails with a
/// clear error instead of hanging.
fn prompt_token() -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        return Ok(None);
    }
    eprint!("Vault token: ");
    io::stderr().flush()?;
    Ok(Some(rpassword::read_password()?))
}

/// Sets up logging to stderr, keeping stdout free for the rendered output.
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_env("VAULTENV_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{}", output);
    }
}

/// Main entry point for the vaultenv CLI application.
///
/// Nothing is written to stdout unless the whole command succeeds.
pub fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        // Print export statements for fields of a single secret
        Commands::Export {
            connection,
            path,
            eks,
            skip_count_check,
            format,
        } => {
            let config =
                GlobalConfig::load().wrap_err("Failed to load vaultenv configuration")?;
            let client = connection
                .connect(config.as_ref())
                .wrap_err("Failed to set up secret store client")?;

            let response = client
                .read(&path)
                .wrap_err_with(|| format!("Failed to read secret '{}'", path))?;
            let assignments = resolve_exports(&response, &eks, export_policy(skip_count_check))
                .wrap_err_with(|| format!("Failed to export secrets from '{}'", path))?;

            let output = assignments.render(output_format(format, config.as_ref()))?;
            print_output(&output);
            Ok(())
        }
        // Print one value from each of several secrets
        Commands::Extract {
            connection,
            paths,
            keys,
            env_vars,
            format,
        } => {
            let config =
                GlobalConfig::load().wrap_err("Failed to load vaultenv configuration")?;
            let client = connection
                .connect(config.as_ref())
                .wrap_err("Failed to set up secret store client")?;

            let assignments = fetch_and_extract(&client, &paths, &keys, &env_vars)
                .wrap_err("Failed to extract secrets")?;

            let output = assignments.render(output_format(format, config.as_ref()))?;
            print_output(&output);
            Ok(())
        }
        // Execute a command with secrets injected as environment variables
        Commands::Run {
            connection,
            selection,
            command,
        } => {
            if command.is_empty() {
                return Err(VaultEnvError::NoCommand.into());
            }

            let config =
                GlobalConfig::load().wrap_err("Failed to load vaultenv configuration")?;
            // The client owns a background thread; it is gone before the
            // environment is modified below
            let assignments = {
                let client = connection
                    .connect(config.as_ref())
                    .wrap_err("Failed to set up secret store client")?;
                selection
                    .resolve(&client)
                    .wrap_err("Failed to resolve secrets")?
            };

            info!(count = assignments.len(), command = %command[0], "Running command with secrets");
            assignments.apply_to_process();

            let status = Command::new(&command[0])
                .args(&command[1..])
                .status()
                .wrap_err_with(|| format!("Failed to run command '{}'", command[0]))?;
            std::process::exit(status.code().unwrap_or(1));
        }
        // Handle configuration management commands
        Commands::Config { action } => match action {
            // Initialize user configuration with interactive prompts
            ConfigAction::Init => {
                use inquire::{Select, Text};

                let existing = GlobalConfig::load()?.unwrap_or_default();
                let default_url = existing
                    .defaults
                    .url
                    .unwrap_or_else(|| "http://127.0.0.1:8200".to_string());

                let url = Text::new("Secret store URL:")
                    .with_default(&default_url)
                    .with_help_message("Used when neither --url nor VAULT_ADDR is set")
                    .prompt()?;
                request_url(&url, "").wrap_err("Invalid secret store URL")?;

                let formats = vec!["export", "dotenv", "json"];
                let format = match Select::new("Default output format:", formats).prompt()? {
                    "dotenv" => OutputFormat::Dotenv,
                    "json" => OutputFormat::Json,
                    _ => OutputFormat::Export,
                };

                let config = GlobalConfig {
                    defaults: GlobalDefaults {
                        url: Some(url),
                        format: Some(format),
                    },
                };

                let path = config.save()?;
                println!("\n{} Configuration saved to {}", "✓".green(), path.display());
                Ok(())
            }
            // Display current user configuration
            ConfigAction::Show => {
                match GlobalConfig::load()? {
                    Some(config) => {
                        println!("Configuration file: {}\n", GlobalConfig::path()?.display());
                        match config.defaults.url {
                            Some(url) => println!("URL:    {}", url),
                            None => println!("URL:    (none)"),
                        }
                        match config.defaults.format {
                            Some(format) => println!("Format: {}", format.as_str()),
                            None => println!("Format: (none)"),
                        }
                    }
                    None => {
                        println!(
                            "No configuration found. Run 'vaultenv config init' to create one."
                        );
                    }
                }
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("vaultenv").chain(args.iter().copied()))
    }

    #[test]
    fn test_repeated_eks_accumulate_in_order() {
        let cli = parse(&[
            "export", "--url", "http://localhost:8200", "--token", "roottoken", "--path",
            "secret/app", "--eks", "SECRET=value", "--eks", " FOO=biz ", "--eks=BAR=baz",
        ])
        .unwrap();

        match cli.command {
            Commands::Export {
                eks,
                skip_count_check,
                ..
            } => {
                assert_eq!(
                    eks,
                    vec![
                        ExportSpec::new("SECRET", "value"),
                        ExportSpec::new("FOO", "biz"),
                        ExportSpec::new("BAR", "baz"),
                    ]
                );
                assert!(!skip_count_check);
            }
            _ => panic!("Expected export command"),
        }
    }

    #[test]
    fn test_invalid_eks_rejected_by_parser() {
        let result = parse(&[
            "export", "--url", "http://localhost:8200", "--token", "t", "--path", "p", "--eks",
            "NOEQUALS",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_parallel_lists() {
        let cli = parse(&[
            "extract", "--url", "http://localhost:8200", "--token", "t", "--path", "secret/db",
            "--key", "password", "--evar", "DB_PASSWORD", "--path", "secret/api", "--key", "key",
            "--evar", "API_KEY", "--format", "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract {
                paths,
                keys,
                env_vars,
                format,
                ..
            } => {
                assert_eq!(paths, vec!["secret/db", "secret/api"]);
                assert_eq!(keys, vec!["password", "key"]);
                assert_eq!(env_vars, vec!["DB_PASSWORD", "API_KEY"]);
                assert_eq!(format, Some(OutputFormat::Json));
            }
            _ => panic!("Expected extract command"),
        }
    }

    #[test]
    fn test_run_trailing_command() {
        let cli = parse(&[
            "run", "--url", "http://localhost:8200", "--token", "t", "--path", "secret/app",
            "--eks", "FOO=biz", "--", "sh", "-c", "echo $FOO",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                selection, command, ..
            } => {
                assert_eq!(selection.paths, vec!["secret/app"]);
                assert_eq!(selection.eks.len(), 1);
                assert_eq!(command, vec!["sh", "-c", "echo $FOO"]);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_eks_conflicts_with_key_lists() {
        let result = parse(&[
            "run", "--path", "secret/app", "--eks", "FOO=biz", "--key", "biz", "--", "env",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_is_global() {
        let cli = parse(&["config", "show", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_output_format_precedence() {
        let config = GlobalConfig {
            defaults: GlobalDefaults {
                url: None,
                format: Some(OutputFormat::Dotenv),
            },
        };

        assert_eq!(
            output_format(Some(OutputFormat::Json), Some(&config)),
            OutputFormat::Json
        );
        assert_eq!(output_format(None, Some(&config)), OutputFormat::Dotenv);
        assert_eq!(output_format(None, None), OutputFormat::Export);
    }
}
