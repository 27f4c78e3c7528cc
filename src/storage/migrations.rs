//! Migrations run on the raw JSON document every time the collection is read.
//!
//! Each migration works on one todo object and returns whether it changed anything, so
//! the caller can persist the result once and never run a migration twice per record.

use serde_json::{Map, Value, json};

use crate::models::{generate_id, todo::DEFAULT_CHECKLIST_TITLE};

type MigrationFn = fn(&mut Map<String, Value>) -> bool;

fn get_migrations() -> Vec<MigrationFn> {
    vec![
        wrap_legacy_subtasks,
        ensure_checklists,
        ensure_source_links,
        ensure_follow_up_links,
    ]
}

/// Apply every migration to every todo in `todos`. Non-object entries are left alone.
pub fn apply_migrations(todos: &mut [Value]) -> bool {
    let migrations = get_migrations();
    let mut changed = false;

    for todo in todos.iter_mut() {
        let Some(todo) = todo.as_object_mut() else {
            continue;
        };
        for migration in &migrations {
            changed |= migration(todo);
        }
    }

    changed
}

/// Flat `subtasks` arrays become one default checklist.
fn wrap_legacy_subtasks(todo: &mut Map<String, Value>) -> bool {
    let Some(subtasks) = todo.remove("subtasks") else {
        return false;
    };

    let has_checklists = todo.get("checklists").is_some_and(Value::is_array);
    let items = match subtasks {
        Value::Array(items) if !items.is_empty() => items,
        _ => return true,
    };

    if !has_checklists {
        todo.insert(
            "checklists".to_string(),
            json!([{
                "id": generate_id("cl"),
                "title": DEFAULT_CHECKLIST_TITLE,
                "isCollapsed": false,
                "items": items,
            }]),
        );
    }

    true
}

fn ensure_checklists(todo: &mut Map<String, Value>) -> bool {
    if todo.get("checklists").is_some_and(Value::is_array) {
        return false;
    }
    todo.insert("checklists".to_string(), json!([]));
    true
}

fn ensure_source_links(todo: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for field in ["sourceSubtaskId", "sourceTaskId"] {
        if !todo.contains_key(field) {
            todo.insert(field.to_string(), Value::Null);
            changed = true;
        }
    }
    changed
}

fn ensure_follow_up_links(todo: &mut Map<String, Value>) -> bool {
    let Some(checklists) = todo.get_mut("checklists").and_then(Value::as_array_mut) else {
        return false;
    };

    let mut changed = false;
    let items = checklists
        .iter_mut()
        .filter_map(|checklist| checklist.get_mut("items"))
        .filter_map(Value::as_array_mut)
        .flat_map(|items| items.iter_mut())
        .filter_map(Value::as_object_mut);

    for item in items {
        if !item.contains_key("followUpTaskId") {
            item.insert("followUpTaskId".to_string(), Value::Null);
            changed = true;
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_legacy_subtasks() {
        let mut todos = vec![json!({
            "id": "todo-1",
            "title": "Legacy",
            "subtasks": [{"id": "sub-1", "text": "a", "completed": true}],
        })];

        assert!(apply_migrations(&mut todos));

        let todo = &todos[0];
        assert!(todo.get("subtasks").is_none());
        let checklists = todo["checklists"].as_array().unwrap();
        assert_eq!(checklists.len(), 1);
        assert_eq!(checklists[0]["title"], DEFAULT_CHECKLIST_TITLE);
        assert_eq!(checklists[0]["items"][0]["id"], "sub-1");
        assert!(checklists[0]["items"][0]["followUpTaskId"].is_null());
        assert!(todo["sourceTaskId"].is_null());
        assert!(todo["sourceSubtaskId"].is_null());
    }

    #[test]
    fn test_empty_legacy_subtasks_become_empty_checklists() {
        let mut todos = vec![json!({"id": "todo-1", "title": "t", "subtasks": []})];

        assert!(apply_migrations(&mut todos));
        assert_eq!(todos[0]["checklists"], json!([]));
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut todos = vec![json!({
            "id": "todo-1",
            "title": "Legacy",
            "subtasks": [{"id": "sub-1", "text": "a", "completed": false}],
        })];

        assert!(apply_migrations(&mut todos));
        let once = todos.clone();
        assert!(!apply_migrations(&mut todos));
        assert_eq!(todos, once);
    }

    #[test]
    fn test_current_shape_is_untouched() {
        let mut todos = vec![json!({
            "id": "todo-1",
            "title": "t",
            "checklists": [{"id": "cl-1", "title": "Steps", "isCollapsed": false,
                "items": [{"id": "sub-1", "text": "a", "completed": false, "followUpTaskId": null}]}],
            "sourceSubtaskId": null,
            "sourceTaskId": null,
        })];

        assert!(!apply_migrations(&mut todos));
    }
}
