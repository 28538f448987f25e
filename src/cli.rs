//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// framehost - frame size negotiation and event relay tooling
#[derive(Parser, Debug)]
#[command(name = "framehost")]
#[command(version)]
#[command(about = "Decode frame protocol messages and replay scripted host sessions")]
#[command(
    long_about = "framehost inspects the size-channel and event-channel strings exchanged between a host page and its frames, replays JSON-lines scripts against an in-memory host page, and builds widget embeds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a raw transport string and print it as JSON
    Decode {
        /// The string exactly as posted, e.g. "[iFrameSizer]f1:420:0:init"
        raw: String,
    },

    /// Replay a JSON-lines script against an in-memory host page
    Replay {
        /// Script path, one step per line
        script: PathBuf,

        /// Host configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the transcript as a single JSON array
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the frame id and src URL for a new widget frame
    Embed {
        /// URL of the embedding page; its query and fragment are dropped
        #[arg(long)]
        parent_url: String,

        #[arg(long, default_value = "https://instafeed.pixlee.com/widget")]
        root_url: String,

        #[arg(long)]
        widget_id: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        /// Ad-hoc widget type, used when no widget id is given
        #[arg(long = "type")]
        widget_type: Option<String>,

        #[arg(long)]
        account_id: Option<String>,

        /// Turn the widget's own lightbox off
        #[arg(long, default_value_t = false)]
        no_lightbox: bool,

        /// Host configuration (TOML), for the widget id marker
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
