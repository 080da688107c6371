use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinedex")]
#[command(author, version, about = "Movie catalog backed by a hosted real-time database")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a config file with default settings
    Init {
        /// Where to write it
        #[arg(default_value = "./cinedex.toml")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Sign in with email and password
    Login {
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,

        /// Password again (read from stdin if omitted)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List all movies
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only movies with exactly this name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show one movie
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a movie
    Add {
        #[command(flatten)]
        fields: MovieFields,
    },

    /// Change fields of an existing movie
    Update {
        id: String,

        #[command(flatten)]
        fields: MovieFields,
    },

    /// Delete a movie
    Delete { id: String },

    /// Print the movie list every time it changes
    Watch,

    /// Upload an image and print its URL
    Upload {
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Add the built-in sample movies
    Seed,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Movie fields settable from the command line.
#[derive(Args, Debug, Default)]
pub struct MovieFields {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Rating from 1 to 10
    #[arg(long)]
    pub rating: Option<f64>,

    /// Poster file to upload
    #[arg(long, conflicts_with = "image_url")]
    pub image: Option<PathBuf>,

    /// Poster URL to store as-is
    #[arg(long)]
    pub image_url: Option<String>,

    #[arg(long)]
    pub trailer_url: Option<String>,

    #[arg(long)]
    pub release_year: Option<String>,

    /// Running time, e.g. "2h 49m"
    #[arg(long)]
    pub duration: Option<String>,

    #[arg(long)]
    pub age_rating: Option<String>,

    /// Genre (repeatable)
    #[arg(long = "genre")]
    pub genres: Vec<String>,
}
