use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use fetchtask::config::TransferMode;

#[derive(Parser, Debug)]
#[command(name = "fetchtask")]
#[command(about = "Fetch a URL and decode the response into a declared shape", long_about = None)]
pub struct Cli {
    /// Configuration file (overrides FETCHTASK_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL and print the decoded body
    Get(GetArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// URL to fetch
    pub url: reqwest::Url,

    /// Shape the response body is expected in
    #[arg(long = "as", value_enum, default_value_t = Shape::Text)]
    pub shape: Shape,

    /// Override the configured transfer mode
    #[arg(long, value_enum)]
    pub transfer: Option<Transfer>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Raw,
    Data,
    File,
    Text,
    Json,
    Urlencoded,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    Data,
    File,
    Auto,
}

impl From<Transfer> for TransferMode {
    fn from(transfer: Transfer) -> Self {
        match transfer {
            Transfer::Data => TransferMode::Data,
            Transfer::File => TransferMode::File,
            Transfer::Auto => TransferMode::Auto,
        }
    }
}
