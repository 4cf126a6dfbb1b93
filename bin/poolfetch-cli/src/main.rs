// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # poolfetch
//!
//! Command-line interface for the pooled fetch pipeline.
//!
//! ## Usage
//! ```bash
//! # Fetch a file through the producer chain
//! poolfetch fetch --source ./data/image.jpg
//!
//! # Thumbnail-gated fetch
//! poolfetch fetch --source ./data/image.jpg --thumbnail 512x384
//!
//! # Show system memory pressure
//! poolfetch status
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "poolfetch",
    about = "Bucketed-pool backed, cancelable local fetch pipeline",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides built-in defaults).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a local source into pooled buffers and report pool stats.
    Fetch {
        /// Path to the source file.
        #[arg(short, long)]
        source: std::path::PathBuf,

        /// Thumbnail dimensions as WxH (e.g., "512x384"); routes the
        /// request through the thumbnail policy gate.
        #[arg(short, long)]
        thumbnail: Option<String>,
    },

    /// Display system memory state and the classified pressure level.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Fetch { source, thumbnail } => {
            commands::fetch::execute(source, thumbnail, cli.config).await
        }
        Commands::Status => commands::status::execute().await,
    }
}
