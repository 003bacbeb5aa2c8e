//! # Weave - Fiber Lineage Tracking
//!
//! The main binary for the Weave fiber lineage model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              apps/weave (THE BINARY)         │
//! │                                              │
//! │   ┌─────────────┐        ┌──────────────┐    │
//! │   │    CLI      │        │   Config     │    │
//! │   │   (clap)    │        │   (toml)     │    │
//! │   └──────┬──────┘        └──────┬───────┘    │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │              ┌───────────────┐               │
//! │              │  weave-core   │               │
//! │              │  (THE LOGIC)  │               │
//! │              └───────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! weave create --id note-1 --label audio --role warp
//! weave transform --id note-1 --stage spin --label text -x "whisper pass"
//! weave lineage --id note-1
//! weave filter --file cards.json --query bar
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weave::cli;
use weave::config::{self, LogFormat};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Config errors are reported after tracing is up; defaults keep us going until then.
    let loaded = config::load(cli.config.as_deref());
    let log_format = loaded
        .as_ref()
        .map(|l| l.config.log_format)
        .unwrap_or_default();

    init_tracing(log_format, cli.verbose, cli.quiet);

    let config = match loaded {
        Ok(loaded) => {
            for warning in &loaded.warnings {
                tracing::warn!("{}", warning);
            }
            loaded.config
        }
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(format: LogFormat, verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "weave=debug"
    } else if quiet {
        "weave=warn"
    } else {
        "weave=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
