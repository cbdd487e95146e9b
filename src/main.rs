use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use docpress::{ComponentRegistry, SiteBuilder, Theme};

#[derive(Parser)]
#[command(name = "docpress")]
#[command(about = "Navigation, sidebar and theme configuration for documentation sites")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composed site configuration as JSON
    Config {
        /// Site manifest
        #[arg(default_value = "site.toml")]
        manifest: PathBuf,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compose the configuration, rewrite content and bootstrap the theme
    Build {
        #[arg(default_value = "site.toml")]
        manifest: PathBuf,

        /// Override the manifest's output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Remove the output directory first
        #[arg(long)]
        clean: bool,
    },
    /// Report nav and sidebar links that point at missing pages
    Check {
        #[arg(default_value = "site.toml")]
        manifest: PathBuf,

        /// Exit with an error if any link dangles
        #[arg(long)]
        strict: bool,
    },
    /// Register a theme's components and list the result
    Components {
        /// Theme directory containing theme.toml
        theme_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Config { manifest, output } => {
            let builder = SiteBuilder::from_manifest_path(&manifest)?;
            let json = builder.build_config()?.to_json_pretty()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!("Wrote site configuration to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Build {
            manifest,
            output,
            jobs,
            clean,
        } => {
            let mut builder = SiteBuilder::from_manifest_path(&manifest)?;
            if let Some(output) = output {
                builder.set_output_dir(output);
            }
            if let Some(jobs) = jobs {
                builder.set_parallel_jobs(jobs);
            }
            if clean {
                builder.clean().await?;
            }

            let stats = builder.build().await?;
            info!("Documents rewritten: {}", stats.documents_rewritten);
            info!("Files copied: {}", stats.files_copied);
            info!(
                "Sidebar sections: {}, nav entries: {}",
                stats.sidebar_sections, stats.nav_entries
            );
            info!(
                "Components registered: {} ({} failed)",
                stats.components_registered, stats.component_failures
            );
            if !stats.dangling_links.is_empty() {
                info!("Dangling links: {}", stats.dangling_links.len());
            }
            info!("Build time: {:?}", stats.build_time);
        }
        Commands::Check { manifest, strict } => {
            let builder = SiteBuilder::from_manifest_path(&manifest)?;
            let config = builder.build_config()?;
            let dangling = builder.check_links(&config);

            for link in &dangling {
                println!("{}", link);
            }
            if dangling.is_empty() {
                info!("All links resolve");
            } else if strict {
                error!("{} dangling link(s)", dangling.len());
                std::process::exit(1);
            }
        }
        Commands::Components { theme_dir } => {
            let theme = Theme::from_path(&theme_dir)?;
            let registry = ComponentRegistry::new();
            let report = theme.enhance_app(&registry).await?;

            for name in registry.names() {
                if let Some(definition) = registry.get(&name) {
                    println!("{}\t{}", name, definition.source.as_deref().unwrap_or("-"));
                }
            }
            for collision in &report.collisions {
                println!(
                    "collision: '{}' now from {}, replaced {}",
                    collision.name,
                    collision.winner,
                    collision.replaced.as_deref().unwrap_or("-")
                );
            }
            for (module, message) in &report.failed {
                println!("failed: {}: {}", module, message);
            }
        }
    }

    Ok(())
}
