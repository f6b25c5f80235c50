use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "td", about = concat!("td v", env!("CARGO_PKG_VERSION"), " - a tiny to-do list"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks (default command)
    List(ListArgs),
    /// Add a task to the end of the list
    Add(AddArgs),
    /// Mark a task completed
    Done(PositionArgs),
    /// Mark a task not completed
    Undo(PositionArgs),
    /// Flip a task between completed and not completed
    Toggle(PositionArgs),
    /// Change a task's title
    Rename(RenameArgs),
    /// Delete a task
    Rm(PositionArgs),
    /// Move a task to another position
    Mv(MvArgs),
    /// Delete every task
    Clear,
    /// Show or hide completed tasks
    Hide(HideArgs),
    /// List themes, or select one
    Theme(ThemeArgs),
    /// View or clear the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args, Default)]
pub struct ListArgs {
    /// Include completed tasks even when they are hidden
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title (words are joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
}

#[derive(Args)]
pub struct PositionArgs {
    /// Position as shown by `td list` (1-based)
    pub position: usize,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Position as shown by `td list` (1-based)
    pub position: usize,
    /// New title (words are joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Position of the task to move
    pub from: usize,
    /// Position it should end up at
    pub to: usize,
}

#[derive(Args)]
pub struct HideArgs {
    /// Whether completed tasks are hidden
    pub value: Toggle,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

#[derive(Args)]
pub struct ThemeArgs {
    /// Theme id to select
    #[arg(allow_negative_numbers = true)]
    pub id: Option<i64>,
}

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Show at most this many entries
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Delete the recovery log
    Clear,
}
