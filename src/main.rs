use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;

use todostore::{
    ChecklistPatch, JsonFileStorage, NewTodo, SubtaskItemPatch, TodoPatch, TodoStore,
    config::{Config, DATA_DIR_ENV},
    logging,
};

use crate::cli::{
    CliError, move_to_position, resolve_checklist, resolve_item, resolve_todo, visible_todos,
};

mod cli;
mod ui;

type Store = TodoStore<JsonFileStorage>;

#[derive(Parser)]
#[command(
    name = "todostore",
    about = "Tasks with checklists and follow-ups, kept in a local JSON store"
)]
struct Cli {
    /// Directory holding the store file and its backups
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks (active by default)
    List {
        /// Show hidden tasks instead
        #[arg(long)]
        hidden: bool,

        /// Show every task
        #[arg(long, conflicts_with = "hidden")]
        all: bool,
    },

    /// Show a task with its checklists
    Show { task: String },

    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Add notes
        #[arg(short, long)]
        notes: Option<String>,

        /// Create the task hidden
        #[arg(long)]
        hidden: bool,
    },

    /// Edit a task's title or notes
    Edit {
        task: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Toggle a task's completion
    Done { task: String },

    /// Toggle whether a task is hidden
    Hide { task: String },

    /// Delete a task and its follow-ups
    Rm { task: String },

    /// Move an active task to a new position
    Move { task: String, position: usize },

    /// Manage checklists
    #[command(subcommand)]
    Checklist(ChecklistCommands),

    /// Manage checklist items
    #[command(subcommand)]
    Item(ItemCommands),

    /// Repair broken follow-up links
    Cleanup,
}

#[derive(Debug, Subcommand)]
enum ChecklistCommands {
    /// Add a checklist to a task
    Add { task: String, title: Option<String> },
    /// Rename a checklist
    Rename {
        task: String,
        checklist: String,
        title: String,
    },
    /// Collapse or expand a checklist
    Collapse { task: String, checklist: String },
    /// Move a checklist to a new position
    Move {
        task: String,
        checklist: String,
        position: usize,
    },
    /// Delete a checklist and its items
    Rm { task: String, checklist: String },
}

#[derive(Debug, Subcommand)]
enum ItemCommands {
    /// Add an item to a checklist
    Add {
        task: String,
        checklist: String,
        text: String,
    },
    /// Check or uncheck an item, creating or removing its follow-up task
    Toggle { task: String, item: String },
    /// Change an item's text
    Edit {
        task: String,
        item: String,
        text: String,
    },
    /// Move an item within its checklist
    Move {
        task: String,
        item: String,
        position: usize,
    },
    /// Delete an item
    Rm { task: String, item: String },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir.clone());
    logging::init(&config.log_filter);
    config.log_warnings();

    let storage = JsonFileStorage::new(config.data_dir.clone())
        .with_backups_to_keep(config.backups_to_keep);
    let store = TodoStore::new(storage)
        .with_key(config.storage_key.clone())
        .with_notifier(ui::render_toast);

    let report = store.cleanup_orphaned_follow_ups();
    if !report.is_clean() {
        tracing::info!("Startup cleanup repaired {} link(s)", report.total_cleaned);
    }

    if let Err(e) = run(&store, cli.command) {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
}

fn run(store: &Store, command: Option<Commands>) -> Result<(), CliError> {
    match command.unwrap_or(Commands::List {
        hidden: false,
        all: false,
    }) {
        Commands::List { hidden, all } => {
            let todos = store.get_all();
            let shown = visible_todos(&todos, hidden, all);
            let title = match (all, hidden) {
                (true, _) => "All",
                (false, true) => "Hidden",
                (false, false) => "Tasks",
            };

            if shown.is_empty() {
                println!("No tasks");
            } else {
                ui::render_view_header(title, shown.len());
                for (index, todo) in shown.iter().enumerate() {
                    ui::render_todo_line(index + 1, todo, store);
                }
                println!();
            }
        }
        Commands::Show { task } => {
            let todos = store.get_all();
            let todo = resolve_todo(&todos, &task)?;
            ui::render_todo_detail(todo, store);
        }
        Commands::Add {
            title,
            notes,
            hidden,
        } => {
            let todo = store.add(NewTodo {
                title: Some(title),
                notes,
                hidden,
                subtasks: vec![],
            });
            ui::render_success(&format!("Added '{}'", todo.title));
        }
        Commands::Edit { task, title, notes } => {
            let id = todo_id(store, &task)?;
            let updated = store
                .update(
                    &id,
                    TodoPatch {
                        title,
                        notes,
                        ..TodoPatch::default()
                    },
                )
                .ok_or_else(|| missing(cli::Kind::Task, &task))?;
            // An empty title means the task should go away.
            if updated.title.is_empty() {
                store.delete(&id);
                ui::render_success("Deleted untitled task");
            } else {
                ui::render_success(&format!("Updated '{}'", updated.title));
            }
        }
        Commands::Done { task } => {
            let id = todo_id(store, &task)?;
            let todo = store
                .toggle(&id)
                .ok_or_else(|| missing(cli::Kind::Task, &task))?;
            let state = if todo.completed { "Completed" } else { "Reopened" };
            ui::render_success(&format!("{} '{}'", state, todo.title));
        }
        Commands::Hide { task } => {
            let id = todo_id(store, &task)?;
            let todo = store
                .toggle_hidden(&id)
                .ok_or_else(|| missing(cli::Kind::Task, &task))?;
            let state = if todo.hidden { "Hid" } else { "Unhid" };
            ui::render_success(&format!("{} '{}'", state, todo.title));
        }
        Commands::Rm { task } => {
            let id = todo_id(store, &task)?;
            let follow_ups = store
                .get(&id)
                .map(|todo| todo.follow_up_ids().count())
                .unwrap_or(0);
            if !store.delete(&id) {
                return Err(missing(cli::Kind::Task, &task));
            }
            if follow_ups > 0 {
                ui::render_success(&format!("Deleted task and {} follow-up(s)", follow_ups));
            } else {
                ui::render_success("Deleted task");
            }
        }
        Commands::Move { task, position } => {
            let todos = store.get_all();
            let todo = resolve_todo(&todos, &task)?;
            let active: Vec<String> = visible_todos(&todos, false, false)
                .iter()
                .map(|t| t.id.clone())
                .collect();
            let ordered = move_to_position(&active, &todo.id, position)?;
            if !store.reorder(&ordered) {
                return Err(CliError::SaveFailed);
            }
            ui::render_success(&format!("Moved '{}' to {}", todo.title, position));
        }
        Commands::Checklist(command) => run_checklist(store, command)?,
        Commands::Item(command) => run_item(store, command)?,
        Commands::Cleanup => {
            let report = store.cleanup_orphaned_follow_ups();
            if report.is_clean() {
                println!("Nothing to clean up");
            } else {
                ui::render_success(&format!(
                    "Removed {} orphaned task(s), fixed {} broken reference(s)",
                    report.orphaned_tasks_removed, report.broken_references_fixed
                ));
            }
        }
    }

    Ok(())
}

fn run_checklist(store: &Store, command: ChecklistCommands) -> Result<(), CliError> {
    match command {
        ChecklistCommands::Add { task, title } => {
            let id = todo_id(store, &task)?;
            let todo = store
                .add_checklist(&id, title)
                .ok_or_else(|| missing(cli::Kind::Task, &task))?;
            if let Some(checklist) = todo.checklists.last() {
                ui::render_success(&format!("Added checklist '{}'", checklist.title));
            }
        }
        ChecklistCommands::Rename {
            task,
            checklist,
            title,
        } => {
            let (todo_id, checklist_id) = checklist_ids(store, &task, &checklist)?;
            store
                .update_checklist(
                    &todo_id,
                    &checklist_id,
                    ChecklistPatch {
                        title: Some(title.clone()),
                        ..ChecklistPatch::default()
                    },
                )
                .ok_or_else(|| missing(cli::Kind::Checklist, &checklist))?;
            ui::render_success(&format!("Renamed checklist to '{}'", title));
        }
        ChecklistCommands::Collapse { task, checklist } => {
            let todos = store.get_all();
            let todo = resolve_todo(&todos, &task)?;
            let target = resolve_checklist(todo, &checklist)?;
            store
                .update_checklist(
                    &todo.id,
                    &target.id,
                    ChecklistPatch {
                        is_collapsed: Some(!target.is_collapsed),
                        ..ChecklistPatch::default()
                    },
                )
                .ok_or_else(|| missing(cli::Kind::Checklist, &checklist))?;
            let state = if target.is_collapsed { "Expanded" } else { "Collapsed" };
            ui::render_success(&format!("{} '{}'", state, target.title));
        }
        ChecklistCommands::Move {
            task,
            checklist,
            position,
        } => {
            let todos = store.get_all();
            let todo = resolve_todo(&todos, &task)?;
            let target = resolve_checklist(todo, &checklist)?;
            let ids: Vec<String> = todo.checklists.iter().map(|c| c.id.clone()).collect();
            let ordered = move_to_position(&ids, &target.id, position)?;
            store
                .reorder_checklists(&todo.id, &ordered)
                .ok_or_else(|| missing(cli::Kind::Task, &task))?;
            ui::render_success(&format!("Moved '{}' to {}", target.title, position));
        }
        ChecklistCommands::Rm { task, checklist } => {
            let (todo_id, checklist_id) = checklist_ids(store, &task, &checklist)?;
            store
                .delete_checklist(&todo_id, &checklist_id)
                .ok_or_else(|| missing(cli::Kind::Checklist, &checklist))?;
            ui::render_success("Deleted checklist");
        }
    }

    Ok(())
}

fn run_item(store: &Store, command: ItemCommands) -> Result<(), CliError> {
    match command {
        ItemCommands::Add {
            task,
            checklist,
            text,
        } => {
            let (todo_id, checklist_id) = checklist_ids(store, &task, &checklist)?;
            store
                .add_subtask_item(&todo_id, &checklist_id, text.clone())
                .ok_or_else(|| missing(cli::Kind::Checklist, &checklist))?;
            ui::render_success(&format!("Added '{}'", text));
        }
        ItemCommands::Toggle { task, item } => {
            let (todo_id, item_id) = item_ids(store, &task, &item)?;
            store
                .toggle_subtask_item(&todo_id, &item_id)
                .ok_or_else(|| missing(cli::Kind::Item, &item))?;
        }
        ItemCommands::Edit { task, item, text } => {
            let (todo_id, item_id) = item_ids(store, &task, &item)?;
            store
                .update_subtask_item(
                    &todo_id,
                    &item_id,
                    SubtaskItemPatch {
                        text: Some(text.clone()),
                        ..SubtaskItemPatch::default()
                    },
                )
                .ok_or_else(|| missing(cli::Kind::Item, &item))?;
            ui::render_success(&format!("Updated '{}'", text));
        }
        ItemCommands::Move {
            task,
            item,
            position,
        } => {
            let todos = store.get_all();
            let todo = resolve_todo(&todos, &task)?;
            let target = resolve_item(todo, &item)?;
            let location = store
                .find_subtask_in_todo(todo, &target.id)
                .ok_or_else(|| missing(cli::Kind::Item, &item))?;
            let ids: Vec<String> = location.checklist.items.iter().map(|i| i.id.clone()).collect();
            let ordered = move_to_position(&ids, &target.id, position)?;
            store
                .reorder_subtask_items(&todo.id, &location.checklist.id, &ordered)
                .ok_or_else(|| missing(cli::Kind::Checklist, &location.checklist.title))?;
            ui::render_success(&format!("Moved '{}' to {}", target.text, position));
        }
        ItemCommands::Rm { task, item } => {
            let (todo_id, item_id) = item_ids(store, &task, &item)?;
            store
                .delete_subtask_item(&todo_id, &item_id)
                .ok_or_else(|| missing(cli::Kind::Item, &item))?;
            ui::render_success("Deleted item");
        }
    }

    Ok(())
}

fn missing(kind: cli::Kind, reference: &str) -> CliError {
    CliError::NotFound {
        kind,
        reference: reference.to_string(),
    }
}

fn todo_id(store: &Store, task: &str) -> Result<String, CliError> {
    let todos = store.get_all();
    Ok(resolve_todo(&todos, task)?.id.clone())
}

fn checklist_ids(store: &Store, task: &str, checklist: &str) -> Result<(String, String), CliError> {
    let todos = store.get_all();
    let todo = resolve_todo(&todos, task)?;
    let checklist = resolve_checklist(todo, checklist)?;
    Ok((todo.id.clone(), checklist.id.clone()))
}

fn item_ids(store: &Store, task: &str, item: &str) -> Result<(String, String), CliError> {
    let todos = store.get_all();
    let todo = resolve_todo(&todos, task)?;
    let item = resolve_item(todo, item)?;
    Ok((todo.id.clone(), item.id.clone()))
}
