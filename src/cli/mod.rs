//! CLI module for Prate.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Prate - project-based audio transcription and RAG
///
/// Ingest audio from files or links into projects, transcribe locally,
/// and chat with the content. The name "Prate" comes from the Norwegian
/// word for "chat."
#[derive(Parser, Debug)]
#[command(name = "prate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Storage root (default: ~/.prate)
    #[arg(short, long, global = true)]
    pub root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize storage and verify system requirements
    Init,

    /// Create a new project
    New {
        /// Project name (unsafe characters are replaced with '_')
        name: String,

        /// Project description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Transcription model for this project (default: from app config)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List projects
    List,

    /// Delete a project and everything in it
    Delete {
        /// Project name
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Add audio to a project from a URL or local file
    Add {
        /// Project name
        project: String,

        /// Media URL or local audio/video file path
        source: String,
    },

    /// Transcribe all audio files in a project
    Transcribe {
        /// Project name
        project: String,
    },

    /// Rebuild a project's search index from its transcripts
    Index {
        /// Project name
        project: String,
    },

    /// Full run: transcribe everything, then rebuild the index
    Process {
        /// Project name
        project: String,
    },

    /// Ask a question about a project's content
    Ask {
        /// Project name
        project: String,

        /// The question to ask
        question: String,
    },

    /// Start an interactive chat session over a project
    Chat {
        /// Project name
        project: String,
    },

    /// Remove an audio file and its transcript from a project
    Remove {
        /// Project name
        project: String,

        /// Audio base name (file name without extension)
        name: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "rag.top_k")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}
