use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use mxabi::config::{self, Config};
use mxabi::domain::abi::AbiRegistry;
use mxabi::infrastructure::abi::load_abi;
use mxabi::infrastructure::network::ApiTransactionSource;
use mxabi::modules::toolkit::{self, ToolResult};

#[derive(Debug, Parser)]
#[command(
    name = "mxabi",
    version,
    about = "Decode and encode MultiversX contract data using the contract ABI"
)]
struct Cli {
    /// Config file (defaults to $MXABI_CONFIG or ~/.config/mxabi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode hex data as a single typed value
    DecodeType {
        /// ABI path, URL or configured alias (needed for custom types)
        #[arg(long)]
        abi: Option<String>,
        /// Type name, e.g. `List<u64>` or a custom type
        #[arg(long = "type")]
        type_name: String,
        /// Hex data, `0x` prefix optional
        #[arg(long, allow_hyphen_values = true)]
        data: String,
        /// Use nested framing instead of top-level
        #[arg(long)]
        nested: bool,
    },
    /// Fetch a transaction and decode one of its events
    DecodeEvent {
        #[arg(long)]
        abi: String,
        /// Event identifier as declared in the ABI
        #[arg(long)]
        event: String,
        /// Transaction hash
        #[arg(long)]
        tx: String,
        /// API base URL (overrides the config)
        #[arg(long)]
        api: Option<String>,
    },
    /// Decode `@`-separated call results (status first) for an endpoint
    DecodeOutcome {
        #[arg(long)]
        abi: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        data: String,
    },
    /// Encode a JSON value as a typed value; prints hex
    Encode {
        #[arg(long)]
        abi: Option<String>,
        #[arg(long = "type")]
        type_name: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        nested: bool,
    },
    /// Build `endpoint@arg@...` call data from a JSON array of arguments
    CallData {
        #[arg(long)]
        abi: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long, allow_hyphen_values = true)]
        args: String,
    },
    /// List the endpoints, events and custom types of an ABI
    Inspect {
        #[arg(long)]
        abi: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("Error: {}", usage_error(&err));
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// First paragraph of clap's message on one line, without the usage block
fn usage_error(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let message = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty() && !line.starts_with("Usage:"))
        .collect::<Vec<_>>()
        .join(" ");
    message
        .strip_prefix("error: ")
        .unwrap_or(&message)
        .to_string()
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "mxabi=debug,warn".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<String> {
    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let codec_config = config.codec_config();
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to create HTTP client")?;

    let result: ToolResult = match cli.command {
        Command::DecodeType {
            abi,
            type_name,
            data,
            nested,
        } => {
            let registry = registry(&config, abi.as_deref(), &http).await?;
            toolkit::decode_type(&registry, codec_config, &type_name, &data, nested)?
        }
        Command::DecodeEvent {
            abi,
            event,
            tx,
            api,
        } => {
            let registry = registry(&config, Some(abi.as_str()), &http).await?;
            let api_url = api.unwrap_or_else(|| config.api_url.clone());
            let source = ApiTransactionSource::with_client(http.clone(), api_url);
            toolkit::decode_event(&registry, codec_config, &source, &event, &tx).await?
        }
        Command::DecodeOutcome {
            abi,
            endpoint,
            data,
        } => {
            let registry = registry(&config, Some(abi.as_str()), &http).await?;
            toolkit::decode_outcome(&registry, codec_config, &endpoint, &data)?
        }
        Command::Encode {
            abi,
            type_name,
            value,
            nested,
        } => {
            let registry = registry(&config, abi.as_deref(), &http).await?;
            toolkit::encode_value(&registry, codec_config, &type_name, &value, nested)?
        }
        Command::CallData {
            abi,
            endpoint,
            args,
        } => {
            let registry = registry(&config, Some(abi.as_str()), &http).await?;
            toolkit::call_data(&registry, codec_config, &endpoint, &args)?
        }
        Command::Inspect { abi } => {
            let registry = registry(&config, Some(abi.as_str()), &http).await?;
            toolkit::describe_abi(&registry)?
        }
    };

    result.render()
}

/// Without an ABI only built-in types can be used
async fn registry(
    config: &Config,
    abi: Option<&str>,
    http: &reqwest::Client,
) -> Result<AbiRegistry> {
    match abi {
        Some(source) => load_abi(config.resolve_abi(source), http).await,
        None => Ok(AbiRegistry::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_argument_is_one_line() {
        let err = Cli::try_parse_from(["mxabi", "decode-type", "--type", "u8"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let message = usage_error(&err);
        assert!(message.contains("--data"), "{message}");
        assert!(!message.contains('\n'));
        assert!(!message.contains("Usage"));
        assert!(!message.starts_with("error:"));
    }

    #[test]
    fn test_unknown_subcommand_is_one_line() {
        let err = Cli::try_parse_from(["mxabi", "frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert!(usage_error(&err).contains("frobnicate"));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Cli::try_parse_from(["mxabi", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        let cli = Cli::try_parse_from(["mxabi", "inspect", "--abi", "vault"]).unwrap();
        assert!(matches!(cli.command, Command::Inspect { abi } if abi == "vault"));
    }
}
