//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Answer legal and tax questions with a group of specialised agents.
#[derive(Parser, Debug)]
#[command(name = "paralegal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and per-environment overrides
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Text or Markdown files to index when the in-memory corpus is used
    #[arg(long, global = true)]
    pub corpus: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and print the answer with its transcript
    Ask {
        /// The question
        query: Vec<String>,

        /// Continue an existing session instead of starting a fresh one
        #[arg(short, long)]
        session: Option<String>,

        /// Print only the answer text
        #[arg(long)]
        brief: bool,
    },

    /// Search the corpus directly
    Search {
        /// Search text
        text: Vec<String>,

        /// Number of hits to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Inspect or clear stored sessions
    Session {
        #[command(subcommand)]
        cmd: SessionCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// List stored session ids
    List,
    /// Show the stored history of a session
    Show { id: String },
    /// Delete a session
    Clear { id: String },
}
