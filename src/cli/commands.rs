use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - a task board with optimistic edits"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Task store file (default: ./tasks.json)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file (default: taskboard.toml next to the store)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty task store and a default config
    Init(InitArgs),
    /// Add a task
    Add(AddArgs),
    /// List tasks, optionally filtered
    List(ListArgs),
    /// Show tasks grouped into board columns
    Board,
    /// Show task details
    Show(ShowArgs),
    /// Move tasks to another status column
    Mv(MvArgs),
    /// Move a scheduled task along the timeline, in half-day steps
    Shift(ShiftArgs),
    /// Run a bulk action over several tasks
    Bulk(BulkArgs),
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Do not write a taskboard.toml
    #[arg(long)]
    pub no_config: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Initial status (backlog, todo, in_progress, review, done)
    #[arg(long, default_value = "todo")]
    pub status: String,
    /// Priority (low, medium, high)
    #[arg(long)]
    pub priority: Option<String>,
    /// Project id
    #[arg(long)]
    pub project: Option<u64>,
    /// Schedule start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// Scheduled length in days (with --start)
    #[arg(long, default_value_t = 1.0)]
    pub days: f64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long)]
    pub status: Option<String>,
    /// Filter by priority
    #[arg(long)]
    pub priority: Option<String>,
    /// Filter by project id
    #[arg(long)]
    pub project: Option<u64>,
    /// Case-insensitive text search in title and description
    #[arg(long)]
    pub search: Option<String>,
    /// Only completed tasks
    #[arg(long, conflicts_with = "open")]
    pub completed: bool,
    /// Only open tasks
    #[arg(long)]
    pub open: bool,
    /// Tasks per page fetched from the store
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: u64,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task IDs to move
    #[arg(required = true)]
    pub ids: Vec<u64>,
    /// Target status
    #[arg(long)]
    pub to: String,
}

#[derive(Args)]
pub struct ShiftArgs {
    /// Task ID
    pub id: u64,
    /// Days to move by (negative moves earlier), snapped to half days
    #[arg(allow_hyphen_values = true)]
    pub days: f64,
}

#[derive(Args)]
pub struct BulkArgs {
    /// Action: complete, delete, move, set_priority, set_status
    pub action: String,
    /// Task IDs
    #[arg(required = true)]
    pub ids: Vec<u64>,
    /// Value for move (project id), set_priority and set_status
    #[arg(long)]
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Show entries after this timestamp (ISO-8601)
    #[arg(long)]
    pub since: Option<String>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
    /// Print the absolute path to the recovery log
    Path,
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
