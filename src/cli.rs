use std::fmt;

use thiserror::Error;
use todostore::{Checklist, SubtaskItem, Todo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Task,
    Checklist,
    Item,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Task => write!(f, "Task"),
            Kind::Checklist => write!(f, "Checklist"),
            Kind::Item => write!(f, "Item"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{kind} '{reference}' not found")]
    NotFound { kind: Kind, reference: String },

    #[error("{kind} is ambiguous. Multiple matches found: {}", .matches.join(", "))]
    Ambiguous { kind: Kind, matches: Vec<String> },

    #[error("Position {0} is out of range")]
    InvalidPosition(usize),

    #[error("Failed to save changes")]
    SaveFailed,
}

/// Resolve `reference` as a 1-based position (when `by_position`), an exact id, or a
/// unique case-insensitive substring of the label.
fn resolve<'a, T>(
    kind: Kind,
    entries: &[&'a T],
    reference: &str,
    by_position: bool,
    id_of: impl Fn(&T) -> &str,
    label_of: impl Fn(&T) -> &str,
) -> Result<&'a T, CliError> {
    if by_position
        && let Ok(position) = reference.parse::<usize>()
        && let Some(entry) = position.checked_sub(1).and_then(|i| entries.get(i).copied())
    {
        return Ok(entry);
    }

    if let Some(entry) = entries.iter().copied().find(|e| id_of(e) == reference) {
        return Ok(entry);
    }

    let needle = reference.to_lowercase();
    let matching: Vec<&'a T> = entries
        .iter()
        .copied()
        .filter(|e| label_of(e).to_lowercase().contains(&needle))
        .collect();

    match matching.len() {
        0 => Err(CliError::NotFound {
            kind,
            reference: reference.to_string(),
        }),
        1 => Ok(matching[0]),
        _ => Err(CliError::Ambiguous {
            kind,
            matches: matching.iter().map(|e| label_of(e).to_string()).collect(),
        }),
    }
}

/// Todos shown by `list`, in display order.
pub fn visible_todos(todos: &[Todo], hidden: bool, all: bool) -> Vec<&Todo> {
    todos
        .iter()
        .filter(|t| all || t.hidden == hidden)
        .collect()
}

/// Positions count over the active list; ids and titles match any todo.
pub fn resolve_todo<'a>(todos: &'a [Todo], reference: &str) -> Result<&'a Todo, CliError> {
    let active = visible_todos(todos, false, false);
    if let Ok(position) = reference.parse::<usize>()
        && let Some(todo) = position.checked_sub(1).and_then(|i| active.get(i).copied())
    {
        return Ok(todo);
    }

    let everything: Vec<&Todo> = todos.iter().collect();
    resolve(Kind::Task, &everything, reference, false, |t| &t.id, |t| &t.title)
}

pub fn resolve_checklist<'a>(todo: &'a Todo, reference: &str) -> Result<&'a Checklist, CliError> {
    let checklists: Vec<&Checklist> = todo.checklists.iter().collect();
    resolve(Kind::Checklist, &checklists, reference, true, |c| &c.id, |c| &c.title)
}

/// Positions count over every item of the todo, checklist by checklist.
pub fn resolve_item<'a>(todo: &'a Todo, reference: &str) -> Result<&'a SubtaskItem, CliError> {
    let items: Vec<&SubtaskItem> = todo
        .checklists
        .iter()
        .flat_map(|c| c.items.iter())
        .collect();
    resolve(Kind::Item, &items, reference, true, |i| &i.id, |i| &i.text)
}

/// `ids` with `id` moved to the 1-based `position`.
pub fn move_to_position(ids: &[String], id: &str, position: usize) -> Result<Vec<String>, CliError> {
    if position == 0 || position > ids.len() {
        return Err(CliError::InvalidPosition(position));
    }
    let mut ordered: Vec<String> = ids.iter().filter(|i| *i != id).cloned().collect();
    ordered.insert((position - 1).min(ordered.len()), id.to_string());
    Ok(ordered)
}
