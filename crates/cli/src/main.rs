mod commands;

use clap::{Args, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "site-assets")]
#[command(version, about = "Download generated site media and rewrite the asset manifest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where to find the manifest, the public directory and the config file
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Manifest to read and rewrite [default: public/generated/manifest.json]
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Site's public directory; assets land in <DIR>/assets [default: public]
    #[arg(short, long)]
    pub public_dir: Option<PathBuf>,

    /// Config file [default: ./site-assets.toml if present]
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
enum Command {
    /// Download every remote asset and point the manifest at the local copies
    Materialize {
        #[command(flatten)]
        paths: PathArgs,

        /// Simultaneous downloads
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Abort the whole run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the download plan without fetching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every manifest entry points at a non-empty local file
    Verify {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("site_assets=info,site_assets_fetch=info,site_assets_core=info,warn")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Materialize {
            paths,
            concurrency,
            timeout,
            dry_run,
        } => commands::materialize::run(paths, concurrency, timeout, dry_run).await,
        Command::Verify { paths } => commands::verify::run(paths).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "site-assets", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_materialize_needs_no_arguments() {
        let cli = Cli::try_parse_from(["site-assets", "materialize"]).unwrap();
        match cli.command {
            Command::Materialize {
                paths,
                concurrency,
                timeout,
                dry_run,
            } => {
                assert!(paths.manifest.is_none());
                assert!(concurrency.is_none());
                assert!(timeout.is_none());
                assert!(!dry_run);
            }
            _ => panic!("expected materialize"),
        }
    }

    #[test]
    fn test_materialize_flags() {
        let cli = Cli::try_parse_from([
            "site-assets",
            "materialize",
            "--manifest",
            "site/manifest.json",
            "-j",
            "8",
            "--timeout",
            "600",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Command::Materialize {
                paths,
                concurrency,
                timeout,
                dry_run,
            } => {
                assert_eq!(paths.manifest, Some(PathBuf::from("site/manifest.json")));
                assert_eq!(concurrency, Some(8));
                assert_eq!(timeout, Some(600));
                assert!(dry_run);
            }
            _ => panic!("expected materialize"),
        }
    }
}
