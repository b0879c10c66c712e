//! stackplan - multi-stack deployment plans for web applications
//!
//! This is the main entry point for the stackplan CLI.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use stackplan::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; a broken config file is fatal
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    // Initialize logging based on verbosity
    init_logging(
        cli.verbosity(),
        config.logging.level.as_deref(),
        cli.log_json || config.logging.json,
    );

    if cli.verbosity() >= 2 {
        eprintln!("stackplan v{}", VERSION);
    }

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command() {
        Commands::Synth(args) => args.execute(&mut ctx).await,
        Commands::Deploy(args) => args.execute(&mut ctx).await,
        Commands::Graph(args) => args.execute(&mut ctx).await,
        Commands::Outputs(args) => args.execute(&mut ctx).await,
        Commands::Init(args) => init_project(&args.path, args.force, &mut ctx),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            ctx.output.error(&format!("{:#}", e));
            e.downcast_ref::<stackplan::Error>()
                .map_or(1, stackplan::Error::exit_code)
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
///
/// Logs go to stderr so plan documents on stdout stay pipeable.
fn init_logging(verbosity: u8, configured: Option<&str>, json: bool) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Write a configuration file with every default spelled out
fn init_project(path: &std::path::Path, force: bool, ctx: &mut CommandContext) -> Result<i32> {
    let target = if path.is_dir() {
        path.join("stackplan.toml")
    } else {
        path.to_path_buf()
    };

    if target.exists() && !force {
        ctx.output.error(&format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        ));
        return Ok(1);
    }

    let content = format!(
        "# stackplan configuration\n# Unset account/region fall back to STACKPLAN_* and CDK_DEFAULT_* variables.\n\n{}",
        toml::to_string_pretty(&Config::default())?
    );
    std::fs::write(&target, content)?;

    ctx.output.banner("STACKPLAN INIT");
    ctx.output.success(&format!("Created {}", target.display()));
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
