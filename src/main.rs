use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use todo_agenda_lib::calendar::marked_dates;
use todo_agenda_lib::datetime::today;
use todo_agenda_lib::logging::init_logging;
use todo_agenda_lib::{
    CalendarDate, Command, FileStore, KvTaskRepository, Outcome, SelectionModeController, Task,
    TaskDraft, TaskId, TaskPatch, TodoSession,
};

#[derive(Debug, Parser)]
#[command(name = "todo-agenda", about = "Dated todo list with an agenda view")]
struct Cli {
    /// Where tasks, settings and logs are kept.
    #[arg(long, default_value = ".todo-agenda")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Print every task in stored order.
    List,
    /// Add a task. Dates are YYYY-MM-DD (DD-MM-YYYY also accepted), times HH:MM.
    Add {
        title: String,
        date: String,
        time: String,
    },
    /// Change some fields of a task.
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Flip a task between done and not done.
    Toggle { id: u64 },
    Delete { id: u64 },
    /// Select several tasks and delete them in one go.
    DeleteMany {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Tasks on one day (today by default).
    Agenda {
        #[arg(long)]
        date: Option<String>,
    },
    /// Days that have at least one task.
    Dates,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let store = FileStore::new(cli.data_dir.clone());
    if let Err(err) = store.ensure_dirs() {
        eprintln!("cannot prepare {}: {err}", cli.data_dir.display());
        return ExitCode::FAILURE;
    }
    let settings = store.load_settings_or_default();
    let _logger = match init_logging(&cli.data_dir, settings.log_spec.as_deref()) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("logging disabled: {err}");
            None
        }
    };

    let repo = Arc::new(KvTaskRepository::with_key(store, settings.storage_key.clone()));
    let mut session = TodoSession::init(repo, &settings);
    let code = run(&mut session, cli.command);
    session.shutdown().await;
    code
}

fn run(session: &mut TodoSession, action: Action) -> ExitCode {
    let command = match action {
        Action::List => {
            for task in session.tasks() {
                println!("{}", row(task));
            }
            return ExitCode::SUCCESS;
        }
        Action::Agenda { date } => {
            let selected = match date {
                Some(raw) => match raw.parse::<CalendarDate>() {
                    Ok(date) => date,
                    Err(err) => {
                        eprintln!("{err}");
                        return ExitCode::FAILURE;
                    }
                },
                None => today(),
            };
            let view = session.agenda(selected);
            println!("{}", view.selected.display_long());
            if view.is_empty() {
                println!("  No todos for this date");
            }
            for item in &view.items {
                let mark = if item.completed { "x" } else { " " };
                println!("  [{mark}] {:>11}  {}  (#{})", item.time_label, item.title, item.id);
            }
            return ExitCode::SUCCESS;
        }
        Action::Dates => {
            let markers = marked_dates(session.tasks(), today());
            let mut dates: Vec<_> = markers.into_iter().filter(|(_, m)| m.marked).collect();
            dates.sort_by_key(|(date, _)| *date);
            for (date, marker) in dates {
                let cursor = if marker.selected { " <- today" } else { "" };
                println!("{date}{cursor}");
            }
            return ExitCode::SUCCESS;
        }
        Action::DeleteMany { ids } => {
            let mut controller = SelectionModeController::new(session);
            let mut ids = ids.into_iter().map(TaskId);
            if let Some(first) = ids.next() {
                controller.on_long_press(first);
            }
            for id in ids {
                controller.on_press(id);
            }
            return report(controller.on_confirm_delete());
        }
        Action::Add { title, date, time } => {
            Command::AddTask(TaskDraft::from_input(&title, &date, &time))
        }
        Action::Edit {
            id,
            title,
            date,
            time,
            completed,
        } => match TaskPatch::from_input(title, date.as_deref(), time.as_deref(), completed) {
            Ok(patch) => Command::UpdateTask(TaskId(id), patch),
            Err(err) => {
                eprintln!("Warning! {err}");
                return ExitCode::FAILURE;
            }
        },
        Action::Toggle { id } => Command::ToggleCompleted(TaskId(id)),
        Action::Delete { id } => Command::DeleteTask(TaskId(id)),
    };

    match session.dispatch(command) {
        Ok(outcome) => report(outcome),
        Err(err) => {
            eprintln!("Warning! {err}");
            ExitCode::FAILURE
        }
    }
}

fn report(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Added(id) => println!("added #{id}"),
        Outcome::Updated(id) => println!("updated #{id}"),
        Outcome::Removed(ids) => println!("deleted {} task(s)", ids.len()),
        Outcome::Completed { id, completed } => {
            println!("#{id} {}", if completed { "done" } else { "not done" })
        }
        Outcome::NotFound(id) => {
            eprintln!("no task #{id}");
            return ExitCode::FAILURE;
        }
        Outcome::Unchanged | Outcome::Ignored => println!("nothing to do"),
        Outcome::ModeChanged(_) | Outcome::Checked { .. } | Outcome::Replaced(_) | Outcome::Reset => {}
    }
    ExitCode::SUCCESS
}

fn row(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let date = task
        .date
        .map(|date| date.display_long())
        .unwrap_or_else(|| "-".to_string());
    let time = task
        .time
        .map(|time| time.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("[{mark}] #{:<4} {:<12} {:<5}  {}", task.id, date, time, task.title)
}
