use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fithq")]
#[command(about = "Custom forms domain validation and client table tools")]
pub struct Cli {
    /// TOML 配置檔，未指定時全部使用預設值
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate and configure the custom forms domain
    #[command(subcommand)]
    Domain(DomainCommand),

    /// Filter and sort exported records
    Records(RecordsArgs),

    /// Manage client table column preferences
    #[command(subcommand)]
    Columns(ColumnsCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum DomainCommand {
    /// Run a single DNS check
    Check { subdomain: String },

    /// Poll DNS until the subdomain points at the expected IP
    Validate {
        subdomain: String,

        /// Configure the domain on the backend once verified
        #[arg(long)]
        configure: bool,
    },

    /// Resume a saved validation run
    Resume,

    /// Show the saved validation state
    Status,

    /// Clear a verified domain
    Reset,

    /// Remove the configured domain from the backend
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Args)]
pub struct RecordsArgs {
    /// JSON or CSV export to read
    #[arg(long)]
    pub input: PathBuf,

    /// TOML file with [[filters]] entries
    #[arg(long)]
    pub filters: Option<PathBuf>,

    /// Sort column, e.g. `ltv:desc`
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Output columns; defaults to every column
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Use the visible client table columns from saved preferences
    #[arg(long, conflicts_with = "columns")]
    pub visible_columns: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ColumnsCommand {
    /// List columns in display order
    List,
    Show { id: String },
    Hide { id: String },
    /// Move a column to a new position (0-based)
    Move { id: String, to: usize },
    /// Restore default columns
    Reset,
}
