//! Command-line interface for `vo-search`.

use std::{env, ffi::OsString};

use clap::{Parser, Subcommand};
use serde_json::to_writer_pretty;

use crate::{cone_search, registry_search};

#[derive(Parser)]
#[command(name = "vo-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a cone search against a service URL
    Cone {
        /// Cone search service URL (or env VO_SCS_URL)
        #[arg(long, env = "VO_SCS_URL")]
        url: String,

        /// Right ascension in degrees
        #[arg(long)]
        ra: f64,

        /// Declination in degrees
        #[arg(long)]
        dec: f64,

        /// Search radius in degrees
        #[arg(long)]
        radius: f64,
    },
    /// Discover services in the registry by keyword
    Registry {
        /// Keywords matched against registry text columns
        keywords: Vec<String>,

        /// Registry endpoint URL (or env VO_REGISTRY_URL)
        #[arg(long, env = "VO_REGISTRY_URL")]
        registry: Option<String>,

        /// Restrict to a service type (sia, ssa, scs, sla, tap)
        #[arg(long)]
        servicetype: Option<String>,

        /// Restrict to a waveband (radio, ir, optical, uv, xray, ...)
        #[arg(long)]
        waveband: Option<String>,

        /// Require every keyword to match instead of any
        #[arg(long)]
        and: bool,
    },
}

/// Execute the command-line interface with a custom argv iterator.
pub fn run_with_args<I, T>(args: I) -> Result<(), Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let summary = match cli.command {
        Command::Cone {
            url,
            ra,
            dec,
            radius,
        } => cone_search(&url, ra, dec, radius)?,
        Command::Registry {
            keywords,
            registry,
            servicetype,
            waveband,
            and,
        } => {
            let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
            registry_search(
                registry.as_deref(),
                &keywords,
                servicetype.as_deref(),
                waveband.as_deref(),
                and,
            )?
        }
    };

    to_writer_pretty(std::io::stdout(), &summary)?;
    Ok(())
}

/// Execute the command-line interface against the process arguments.
pub fn cli() -> Result<(), Box<dyn std::error::Error>> {
    run_with_args(env::args_os())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
