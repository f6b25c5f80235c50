use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::kv::FileStore;
use crate::io::recovery;
use crate::model::config::Config;
use crate::model::task::TaskId;
use crate::model::theme::{self, THEMES};
use crate::ops::task_store::TaskStore;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Settings shared by every command of one invocation
struct Context {
    json: bool,
    color: bool,
    data_dir: PathBuf,
    config: Config,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let config = config_io::read_config()?;
    let data_dir = config_io::resolve_data_dir(&config, cli.data_dir.as_deref().map(Path::new));
    let ctx = Context {
        json: cli.json,
        color: config.ui.color && !cli.no_color && std::io::stdout().is_terminal(),
        data_dir,
        config,
    };

    match cli.command {
        None => cmd_list(&ctx, ListArgs::default()),
        Some(cmd) => match cmd {
            Commands::List(args) => cmd_list(&ctx, args),
            Commands::Add(args) => cmd_add(&ctx, args),
            Commands::Done(args) => cmd_set_completed(&ctx, args.position, true),
            Commands::Undo(args) => cmd_set_completed(&ctx, args.position, false),
            Commands::Toggle(args) => cmd_toggle(&ctx, args),
            Commands::Rename(args) => cmd_rename(&ctx, args),
            Commands::Rm(args) => cmd_rm(&ctx, args),
            Commands::Mv(args) => cmd_mv(&ctx, args),
            Commands::Clear => cmd_clear(&ctx),
            Commands::Hide(args) => cmd_hide(&ctx, args),
            Commands::Theme(args) => cmd_theme(&ctx, args),
            Commands::Recovery(args) => cmd_recovery(&ctx, args),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_store(ctx: &Context) -> TaskStore<FileStore> {
    let recovery_log = ctx.config.store.recovery_log;
    let kv = FileStore::open(&ctx.data_dir, recovery_log);
    tracing::debug!(path = %kv.path().display(), writable = kv.is_writable(), "opened store");
    let mut store = if recovery_log {
        TaskStore::load_with_recovery(kv, ctx.data_dir.clone())
    } else {
        TaskStore::load(kv)
    };
    store.subscribe(|change, state| {
        tracing::debug!(?change, tasks = state.tasks.len(), "state changed");
    });
    store
}

fn list_style(ctx: &Context, store: &TaskStore<FileStore>) -> ListStyle {
    ListStyle {
        accent: ctx.color.then(|| store.theme_color()),
        max_title_width: ctx.config.ui.max_title_width,
    }
}

/// Resolve a 1-based position in the visible listing to a task id
fn id_at(store: &TaskStore<FileStore>, position: usize) -> Result<TaskId, String> {
    let visible = store.visible_tasks();
    position
        .checked_sub(1)
        .and_then(|i| visible.get(i))
        .map(|t| t.id)
        .ok_or_else(|| out_of_range(position, visible.len()))
}

/// Resolve a 1-based visible position to an index in the full list
fn index_at(store: &TaskStore<FileStore>, position: usize) -> Result<usize, String> {
    let id = id_at(store, position)?;
    store
        .position_of(id)
        .ok_or_else(|| out_of_range(position, store.visible_tasks().len()))
}

fn out_of_range(position: usize, len: usize) -> String {
    match len {
        0 => format!("no task at position {} (the list is empty)", position),
        1 => format!("no task at position {} (only position 1 exists)", position),
        _ => format!("no task at position {} (positions are 1-{})", position, len),
    }
}

fn print_task(ctx: &Context, store: &TaskStore<FileStore>, id: TaskId, verb: &str) -> CmdResult {
    let Some(task) = store.task(id) else {
        return Ok(());
    };
    let position = store
        .visible_tasks()
        .iter()
        .position(|t| t.id == id)
        .map_or(0, |i| i + 1);
    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&task_to_json(position, task))?
        );
    } else if position == 0 {
        println!("{} (hidden): {}", verb, task.title);
    } else {
        let style = list_style(ctx, store);
        println!("{}: {}", verb, format_task_line(position, 1, task, &style).trim_start());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let store = open_store(ctx);
    let tasks: Vec<_> = if args.all {
        store.tasks().iter().collect()
    } else {
        store.visible_tasks()
    };
    let hidden = store.tasks().len() - tasks.len();

    if ctx.json {
        let out = ListJson {
            hide_completed: store.hide_completed(),
            theme: store.theme(),
            tasks: tasks
                .iter()
                .enumerate()
                .map(|(i, t)| task_to_json(i + 1, t))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for line in format_listing(&tasks, hidden, &list_style(ctx, &store)) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let mut store = open_store(ctx);
    let id = store.add_task(args.title.join(" "));
    print_task(ctx, &store, id, "Added")
}

fn cmd_set_completed(ctx: &Context, position: usize, completed: bool) -> CmdResult {
    let mut store = open_store(ctx);
    let id = id_at(&store, position)?;
    store.set_completed(id, completed);
    print_task(ctx, &store, id, if completed { "Completed" } else { "Reopened" })
}

fn cmd_toggle(ctx: &Context, args: PositionArgs) -> CmdResult {
    let mut store = open_store(ctx);
    let id = id_at(&store, args.position)?;
    let completed = store.toggle_completed(id).unwrap_or_default();
    print_task(ctx, &store, id, if completed { "Completed" } else { "Reopened" })
}

fn cmd_rename(ctx: &Context, args: RenameArgs) -> CmdResult {
    let mut store = open_store(ctx);
    let id = id_at(&store, args.position)?;
    store.rename_task(id, args.title.join(" "));
    print_task(ctx, &store, id, "Renamed")
}

fn cmd_rm(ctx: &Context, args: PositionArgs) -> CmdResult {
    let mut store = open_store(ctx);
    let index = index_at(&store, args.position)?;
    let task = store.remove_task(index)?;
    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&task_to_json(args.position, &task))?
        );
    } else {
        println!("Removed: {}", task.title);
    }
    Ok(())
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    let mut store = open_store(ctx);
    let id = id_at(&store, args.from)?;
    let from = index_at(&store, args.from)?;
    let to = index_at(&store, args.to)?;
    store.move_task(from, to)?;
    print_task(ctx, &store, id, "Moved")
}

fn cmd_clear(ctx: &Context) -> CmdResult {
    let mut store = open_store(ctx);
    let count = store.tasks().len();
    store.remove_all();
    if ctx.json {
        println!("{}", serde_json::json!({ "removed": count }));
    } else {
        println!("Removed {} task{}.", count, if count == 1 { "" } else { "s" });
    }
    Ok(())
}

fn cmd_hide(ctx: &Context, args: HideArgs) -> CmdResult {
    let mut store = open_store(ctx);
    store.set_hide_completed(args.value.is_on());
    if ctx.json {
        println!(
            "{}",
            serde_json::json!({ "hide_completed": store.hide_completed() })
        );
    } else if store.hide_completed() {
        println!("Completed tasks are hidden.");
    } else {
        println!("Completed tasks are shown.");
    }
    Ok(())
}

fn cmd_theme(ctx: &Context, args: ThemeArgs) -> CmdResult {
    let mut store = open_store(ctx);
    if let Some(id) = args.id {
        store.set_theme(id);
        if theme::find_theme(id).is_none() {
            eprintln!(
                "warning: no built-in theme {}; the neutral color will be used",
                id
            );
        }
    }

    let selected = store.theme();
    if ctx.json {
        let themes: Vec<ThemeJson> = THEMES.iter().map(|t| theme_to_json(t, selected)).collect();
        println!("{}", serde_json::to_string_pretty(&themes)?);
    } else {
        for t in &THEMES {
            println!("{}", format_theme_line(t, selected, ctx.color));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(ctx: &Context, args: RecoveryCmd) -> CmdResult {
    if let Some(RecoveryAction::Clear) = args.action {
        let removed = recovery::clear_recovery(&ctx.data_dir)?;
        if ctx.json {
            println!("{}", serde_json::json!({ "removed": removed }));
        } else {
            println!("Removed {} recovery entr{}.", removed, if removed == 1 { "y" } else { "ies" });
        }
        return Ok(());
    }

    let entries = recovery::read_recovery_entries(&ctx.data_dir, args.limit);
    if ctx.json {
        let json: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if entries.is_empty() {
        println!("No recovery entries.");
    } else {
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                println!();
            }
            for line in format_recovery_entry(entry) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
