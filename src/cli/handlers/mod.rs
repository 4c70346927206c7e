mod init;
pub use init::cmd_init;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::board::coordinator::{Coordinator, Notification, Settlement};
use crate::board::session::BoardSession;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::memory_service::InMemoryService;
use crate::io::recovery::{self, RecoveryEntry};
use crate::io::service::TaskService;
use crate::io::store_io::{self, STORE_FILE};
use crate::model::config::EngineConfig;
use crate::model::intent::{BulkAction, MutationIntent};
use crate::model::query::{ListFilter, QueryKey};
use crate::model::task::{Priority, ScheduleWindow, TaskId, TaskPatch, TaskStatus};
use crate::ops::schedule;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Resolved file locations for one invocation
struct Paths {
    store: PathBuf,
    config: PathBuf,
    /// Directory holding the store; the recovery log lives here
    dir: PathBuf,
}

impl Paths {
    fn resolve(store: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        let store = store.unwrap_or_else(|| PathBuf::from(STORE_FILE));
        let dir = match store.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let config = config.unwrap_or_else(|| dir.join(CONFIG_FILE));
        Paths { store, config, dir }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let paths = Paths::resolve(cli.store, cli.config);

    match cli.command {
        Commands::Init(args) => cmd_init(args, &paths.store, &paths.config),
        Commands::Add(args) => cmd_add(args, &paths),
        Commands::List(args) => cmd_list(args, &paths, json),
        Commands::Board => cmd_board(&paths, json),
        Commands::Show(args) => cmd_show(args, &paths, json),
        Commands::Mv(args) => cmd_mv(args, &paths, json),
        Commands::Shift(args) => cmd_shift(args, &paths, json),
        Commands::Bulk(args) => cmd_bulk(args, &paths, json),
        Commands::Recovery(args) => cmd_recovery(args, &paths.dir, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(paths: &Paths) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    Ok(config_io::read_config(&paths.config)?)
}

fn open_service(paths: &Paths, config: &EngineConfig) -> Result<InMemoryService, Box<dyn std::error::Error>> {
    let tasks = store_io::load_store(&paths.store)?;
    Ok(InMemoryService::new(tasks, config.remote.clone()))
}

/// Open a session over every task in the store, all pages loaded
fn open_session(paths: &Paths) -> Result<BoardSession<InMemoryService>, Box<dyn std::error::Error>> {
    let config = load_config(paths)?;
    let service = open_service(paths, &config)?;
    let mut session = BoardSession::open(
        service,
        QueryKey::tasks(None),
        ListFilter::default(),
        config,
        Utc::now(),
    )?;
    while session.load_more()? {}
    Ok(session)
}

fn not_found(ids: &[TaskId]) -> Box<dyn std::error::Error> {
    let ids: Vec<String> = ids.iter().map(|id| format!("#{}", id)).collect();
    format!("task not found: {}", ids.join(", ")).into()
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse_status(s).ok_or_else(|| {
        let names: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("invalid status: {} (expected one of: {})", s, names.join(", "))
    })
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse_priority(s).ok_or_else(|| format!("invalid priority: {} (expected low, medium or high)", s))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date: {} (expected YYYY-MM-DD)", s))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| parse_date(s))
        .map_err(|_| format!("invalid timestamp: {}", s))
}

/// Apply one intent through a board session, then persist or report.
///
/// A failed edit is written to the recovery log before the error is
/// returned, so the attempted change can be found later.
fn run_mutation(paths: &Paths, intent: MutationIntent, json: bool) -> CmdResult {
    let mut session = open_session(paths)?;
    let missing: Vec<TaskId> = intent
        .task_ids
        .iter()
        .copied()
        .filter(|id| session.task(*id).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(not_found(&missing));
    }

    let seen: Rc<RefCell<Vec<Notification>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session
        .coordinator_mut()
        .on_notification(move |n| sink.borrow_mut().push(n.clone()));

    let key = session.key().clone();
    let settlement = session.apply(intent.clone());
    if let Some(entry) = RecoveryEntry::for_settlement(&key, &intent, &settlement) {
        recovery::log_recovery(&paths.dir, entry);
    }

    let notification = seen.borrow().last().cloned();
    match (settlement, notification) {
        (Settlement::Committed, Some(n)) => {
            store_io::save_store(&paths.store, session.service().tasks())?;
            if json {
                let tasks = intent.task_ids.iter().filter_map(|id| session.task(*id)).collect();
                println!("{}", serde_json::to_string_pretty(&mutation_to_json(&n, tasks))?);
            } else {
                println!("{}", n.message);
            }
            Ok(())
        }
        (Settlement::Skipped, _) => Err(not_found(&intent.task_ids)),
        (Settlement::RolledBack(err) | Settlement::Superseded(err), n) => {
            Err(n.map_or_else(|| err.to_string(), |n| n.message).into())
        }
        (Settlement::Committed, None) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, paths: &Paths, json: bool) -> CmdResult {
    let filter = ListFilter {
        status: args.status.as_deref().map(parse_status).transpose()?,
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        project_id: args.project,
        is_completed: match (args.completed, args.open) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
        search: args.search,
        page_size: args.page_size,
        page_token: None,
    };

    let service = open_service(paths, &load_config(paths)?)?;
    let key = QueryKey::new("list");
    let mut coordinator = Coordinator::new();
    coordinator.load(&service, &key, filter)?;
    while coordinator.load_more(&service, &key)? {}
    let tasks = coordinator.tasks(&key);

    if json {
        println!("{}", serde_json::to_string_pretty(tasks)?);
    } else {
        for task in tasks {
            println!("{}", format_task_line(task));
        }
    }
    Ok(())
}

fn cmd_board(paths: &Paths, json: bool) -> CmdResult {
    let session = open_session(paths)?;
    let columns = session.columns();
    if json {
        println!("{}", serde_json::to_string_pretty(&columns_to_json(&columns))?);
    } else {
        for line in format_board(&columns) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, paths: &Paths, json: bool) -> CmdResult {
    let service = open_service(paths, &load_config(paths)?)?;
    let task = service.get(args.id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        for line in format_task_detail(&task) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, paths: &Paths) -> CmdResult {
    let status = parse_status(&args.status)?;
    let mut patch = TaskPatch {
        priority: args.priority.as_deref().map(parse_priority).transpose()?,
        project_id: args.project,
        ..Default::default()
    };
    if let Some(start) = args.start.as_deref() {
        let start = parse_date(start)?;
        if args.days <= 0.0 {
            return Err("--days must be positive".into());
        }
        patch.schedule = Some(ScheduleWindow::new(start, start + schedule::days_to_duration(args.days)));
    }

    let mut service = open_service(paths, &load_config(paths)?)?;
    let task = service.create(args.title, status);
    let task = if patch.is_empty() {
        task
    } else {
        service.patch(task.id, &patch)?
    };
    store_io::save_store(&paths.store, service.tasks())?;
    println!("added #{} {}", task.id, task.title);
    Ok(())
}

fn cmd_mv(args: MvArgs, paths: &Paths, json: bool) -> CmdResult {
    let status = parse_status(&args.to)?;
    run_mutation(paths, MutationIntent::move_container(args.ids, status), json)
}

fn cmd_shift(args: ShiftArgs, paths: &Paths, json: bool) -> CmdResult {
    let snapped = schedule::snap_half_days(args.days);
    if snapped == 0.0 {
        println!("{} days snaps to 0; nothing to do", args.days);
        return Ok(());
    }
    let tasks = store_io::load_store(&paths.store)?;
    let task = tasks
        .iter()
        .find(|t| t.id == args.id)
        .ok_or_else(|| format!("task not found: #{}", args.id))?;
    let window = task
        .schedule
        .ok_or_else(|| format!("task #{} is not scheduled", args.id))?;
    let intent = MutationIntent::reschedule(args.id, schedule::reschedule(&window, snapped));
    run_mutation(paths, intent, json)
}

fn cmd_bulk(args: BulkArgs, paths: &Paths, json: bool) -> CmdResult {
    let action = BulkAction::parse_action(&args.action, args.value.as_deref()).ok_or_else(|| {
        format!(
            "invalid bulk action: {}{} (expected complete, delete, move <project>, set_priority <p>, set_status <s>)",
            args.action,
            args.value.as_deref().map(|v| format!(" {}", v)).unwrap_or_default()
        )
    })?;
    run_mutation(paths, MutationIntent::bulk(args.ids, action), json)
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(args: RecoveryCmd, dir: &Path, json: bool) -> CmdResult {
    match args.action {
        Some(RecoveryAction::Prune(prune)) => {
            let before = prune.before.as_deref().map(parse_timestamp).transpose()?;
            let removed = recovery::prune_recovery(dir, before, prune.all)?;
            println!("removed {} entries", removed);
        }
        Some(RecoveryAction::Path) => {
            let path = recovery::recovery_log_path(dir);
            let abs = std::path::absolute(&path).unwrap_or(path);
            println!("{}", abs.display());
        }
        None => {
            let since = args.since.as_deref().map(parse_timestamp).transpose()?;
            let entries = recovery::read_recovery_entries(dir, Some(args.limit.unwrap_or(10)), since);
            if json {
                let values: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if entries.is_empty() {
                println!("recovery log is empty");
            } else {
                if let Some(summary) = recovery::recovery_summary(dir) {
                    let oldest = summary
                        .oldest
                        .map(|t| format!(", oldest {}", t.format("%Y-%m-%d %H:%M")))
                        .unwrap_or_default();
                    println!("{} entries in log{}\n", summary.entry_count, oldest);
                }
                for entry in &entries {
                    print!("{}", entry.to_display_markdown());
                }
            }
        }
    }
    Ok(())
}
