use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

/// bakeline - sequential Packer image bake pipeline
#[derive(Parser)]
#[command(name = "bakeline")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Destroy the named instances and build the Packer templates
  Run {
    /// Instance names destroyed before every build
    #[arg(long, value_delimiter = ',', default_value = "packer-jammy")]
    destroy_instances: Vec<String>,

    /// Template files excluded from the build list
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Template files to build (overrides the discovered list)
    #[arg(long = "template", value_delimiter = ',')]
    templates: Vec<String>,

    /// ntfy-style endpoint receiving each build log
    #[arg(long, env = "BAKELINE_NTFY_URL")]
    notify_url: Option<String>,

    /// Exit non-zero when any build fails, not only on init failure
    #[arg(long)]
    strict: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Initialize logging; --verbose lowers the default filter to debug.
  let default_filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
    )
    .without_time()
    .init();

  match cli.command {
    Commands::Run {
      destroy_instances,
      exclude,
      templates,
      notify_url,
      strict,
    } => cmd::cmd_run(destroy_instances, exclude, templates, notify_url, strict),
  }
}
