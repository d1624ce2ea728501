use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use templar::config::LoggingConfig;
use templar::{AppConfig, ClusterVersion, Kind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "templar")]
#[command(about = "Templar - compile and install search cluster templates")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TEMPLAR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the template to files instead of a cluster
    Render {
        /// Target cluster version (defaults to the product version)
        #[arg(long)]
        es_version: Option<ClusterVersion>,

        /// Output directory (defaults to output.dir from the config)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Print the document instead of writing files
        #[arg(long)]
        stdout: bool,

        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Install the template on a cluster
    Install {
        /// Cluster URL (overrides cluster.url)
        #[arg(long)]
        url: Option<String>,

        /// Replace an existing template
        #[arg(long)]
        overwrite: bool,

        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Show what a cluster version supports
    Capabilities {
        /// Version to inspect; without it the configured cluster is asked
        #[arg(long)]
        es_version: Option<ClusterVersion>,
    },
}

/// Template overrides shared by render and install.
#[derive(clap::Args, Debug)]
struct TemplateArgs {
    /// fields.yml to compile
    #[arg(short, long)]
    fields: Option<PathBuf>,

    /// Template kind: legacy, component or index
    #[arg(long, value_parser = parse_kind)]
    kind: Option<Kind>,

    /// Template name
    #[arg(long)]
    name: Option<String>,

    /// Index pattern
    #[arg(long)]
    pattern: Option<String>,

    /// Apply migration aliases
    #[arg(long)]
    migration: bool,
}

impl TemplateArgs {
    fn apply(self, config: &mut AppConfig) -> bool {
        let template = &mut config.template;
        // relative to the working directory, not the config file
        if let Some(fields) = self.fields {
            template.fields = Some(std::path::absolute(&fields).unwrap_or(fields));
        }
        if let Some(kind) = self.kind {
            template.kind = kind;
        }
        if self.name.is_some() {
            template.name = self.name;
        }
        if self.pattern.is_some() {
            template.pattern = self.pattern;
        }
        self.migration
    }
}

fn parse_kind(s: &str) -> std::result::Result<Kind, String> {
    match s {
        "legacy" | "component" | "index" => s.parse().map_err(|_| s.to_string()),
        other => Err(format!(
            "unknown kind '{}', expected legacy, component or index",
            other
        )),
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let json = logging.format.eq_ignore_ascii_case("json");

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .init();
            } else {
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
        }
        None => {
            let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if json {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.json())
                    .init();
            } else {
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_or_default(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Render {
            es_version,
            output,
            stdout,
            template,
        } => {
            let migration = template.apply(&mut config);
            if let Some(output) = output {
                config.output.dir = output;
            }
            commands::run_render(&config, es_version, stdout, migration).await?;
        }
        Commands::Install {
            url,
            overwrite,
            template,
        } => {
            let migration = template.apply(&mut config);
            if let Some(url) = url {
                config.cluster.url = url;
            }
            if overwrite {
                config.template.overwrite = true;
            }
            commands::run_install(&config, migration).await?;
        }
        Commands::Capabilities { es_version } => {
            commands::run_capabilities(&config, es_version).await?;
        }
    }

    Ok(())
}
