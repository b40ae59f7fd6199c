mod analyze_cmd;
mod blend_cmd;
mod config_cmd;
mod serve_cmd;
mod status_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use heatlens_config::{resolve_config_path, HeatlensConfig};

#[derive(Parser)]
#[command(name = "heatlens")]
#[command(about = "heatlens: usability reports from UI screenshots and gaze heatmaps")]
#[command(version)]
struct Cli {
    /// Config file (default: $HEATLENS_CONFIG, then ~/.heatlens/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one screenshot/heatmap pair through the full pipeline
    Analyze {
        /// UI screenshot
        #[arg(long)]
        ui: PathBuf,
        /// Heatmap overlay
        #[arg(long)]
        heatmap: PathBuf,
    },
    /// Blend a heatmap over a screenshot without calling any model
    Blend {
        #[arg(long)]
        ui: PathBuf,
        #[arg(long)]
        heatmap: PathBuf,
        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Query a running gateway's health endpoint
    Status {
        /// Gateway base URL (default: derived from the config)
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a config file populated with defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config with secrets redacted
    Show {
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Serve { port } => serve_cmd::run(&config_path, port).await,
        Commands::Analyze { ui, heatmap } => analyze_cmd::run(&config_path, &ui, &heatmap).await,
        Commands::Blend { ui, heatmap, out } => {
            quiet_logging()?;
            blend_cmd::run(&ui, &heatmap, &out).await
        }
        Commands::Config { action } => {
            quiet_logging()?;
            match action {
                ConfigAction::Init { force } => config_cmd::init(&config_path, force).await,
                ConfigAction::Show { format } => config_cmd::show(&config_path, format).await,
            }
        }
        Commands::Status { url } => {
            quiet_logging()?;
            status_cmd::run(&config_path, url).await
        }
    }
}

/// Logging for long-running commands, as configured.
pub(crate) fn init_logging(config: &HeatlensConfig) -> Result<()> {
    let logging = config.logging.clone().unwrap_or_default();
    let dir = logging.dir.map(PathBuf::from);
    heatlens_logging::init_logger(
        dir.as_deref(),
        &config.log_level(),
        logging.json.unwrap_or(false),
    )?;
    Ok(())
}

/// Warnings only, for one-shot commands whose stdout is the output.
fn quiet_logging() -> Result<()> {
    heatlens_logging::init_logger(None, "warn", false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["heatlens", "serve", "--port", "8088", "-c", "x.yaml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert!(matches!(cli.command, Commands::Serve { port: Some(8088) }));
    }

    #[test]
    fn analyze_requires_both_images() {
        assert!(Cli::try_parse_from(["heatlens", "analyze", "--ui", "a.png"]).is_err());
        assert!(
            Cli::try_parse_from(["heatlens", "analyze", "--ui", "a.png", "--heatmap", "b.png"])
                .is_ok()
        );
    }

    #[test]
    fn config_show_format() {
        let cli = Cli::try_parse_from(["heatlens", "config", "show", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show {
                    format: OutputFormat::Json
                }
            }
        ));
    }
}
