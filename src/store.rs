//! The todo collection, persisted as one JSON array under a single key.
//!
//! Every operation reads the whole collection, changes it in memory and writes it back
//! in one `set`. The persisted document is the only source of truth; nothing is cached
//! between calls.

use serde_json::Value;

use crate::{
    models::{generate_id, todo::Todo},
    notify::{Notifier, SAVE_FAILED_MESSAGE},
    storage::{KeyValueStore, migrations::apply_migrations},
};

pub const DB_KEY: &str = "experiments_todos";

pub struct TodoStore<S: KeyValueStore> {
    storage: S,
    key: String,
    notifier: Option<Box<dyn Notifier>>,
}

impl<S: KeyValueStore> TodoStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: DB_KEY.to_string(),
            notifier: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn generate_id(&self, prefix: &str) -> String {
        generate_id(prefix)
    }

    /// Read the collection. Missing, unreadable or malformed data reads as empty.
    /// Individual records that do not decode are skipped, the rest survive.
    ///
    /// Legacy records are migrated and, if anything changed, written back before
    /// returning.
    pub fn load(&self) -> Vec<Todo> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return vec![],
            Err(e) => {
                tracing::warn!("Failed to read todos, using empty collection: {}", e);
                return vec![];
            }
        };

        let mut values = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(values)) => values,
            Ok(_) => {
                tracing::warn!("Invalid todos data structure, resetting");
                return vec![];
            }
            Err(e) => {
                tracing::warn!("Failed to parse todos, using empty collection: {}", e);
                return vec![];
            }
        };

        let migrated = apply_migrations(&mut values);

        let todos: Vec<Todo> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<Todo>(value) {
                Ok(todo) => Some(todo),
                Err(e) => {
                    tracing::warn!("Skipping unreadable todo at index {}: {}", index, e);
                    None
                }
            })
            .collect();

        if migrated {
            tracing::info!("Migrated {} todo(s) to the current format", todos.len());
            self.save(&todos);
        }

        todos
    }

    /// Write the whole collection. Failures are logged and reported to the notifier,
    /// never raised.
    pub fn save(&self, todos: &[Todo]) -> bool {
        let result = serde_json::to_string(todos)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.storage
                    .set(&self.key, &json)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save todos: {}", e);
                self.notify(SAVE_FAILED_MESSAGE);
                false
            }
        }
    }

    pub(crate) fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(message);
        }
    }

    /// Run `mutate` on the todo with `todo_id` and persist. `mutate` returns false when
    /// whatever it looked for inside the todo does not exist; nothing is written then.
    pub(crate) fn modify_todo<F>(&self, todo_id: &str, mutate: F) -> Option<Todo>
    where
        F: FnOnce(&mut Todo) -> bool,
    {
        let mut todos = self.load();
        let todo = todos.iter_mut().find(|t| t.id == todo_id)?;
        if !mutate(todo) {
            return None;
        }
        let updated = todo.clone();
        self.save(&todos);
        Some(updated)
    }
}


#[cfg(test)]
mod tests {
    use super::{test_support::*, *};
    use crate::{
        models::todo::NewTodo,
        storage::memory::MemoryKeyValueStore,
    };

    #[test]
    fn test_load_missing_is_empty() {
        let store = memory_store();
        assert!(store.load().is_empty());
        assert_eq!(store.storage().write_count(), 0);
    }

    #[test]
    fn test_load_corrupted_json_is_empty() {
        let storage = MemoryKeyValueStore::new();
        storage.insert_raw(DB_KEY, "{ this is not valid json }");
        let store = TodoStore::new(storage);

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_non_array_is_empty() {
        let storage = MemoryKeyValueStore::new();
        storage.insert_raw(DB_KEY, r#"{"id": "todo-1"}"#);
        let store = TodoStore::new(storage);

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_migrates_legacy_data_once() {
        let storage = MemoryKeyValueStore::new();
        storage.insert_raw(
            DB_KEY,
            r#"[{"id": "todo-1", "title": "Old", "notes": "", "completed": false,
                "createdAt": "2024-05-01T10:00:00.000Z",
                "subtasks": [{"id": "sub-1", "text": "first", "completed": false}]}]"#,
        );
        let store = TodoStore::new(storage);

        let first = store.load();
        assert_eq!(store.storage().write_count(), 1);
        assert_eq!(first[0].checklists.len(), 1);
        assert_eq!(first[0].checklists[0].items[0].id, "sub-1");
        assert_eq!(first[0].checklists[0].items[0].follow_up_task_id, None);

        let raw_after_first = store.storage().get(DB_KEY).unwrap();
        let second = store.load();
        assert_eq!(first, second);
        assert_eq!(store.storage().write_count(), 1);
        assert_eq!(store.storage().get(DB_KEY).unwrap(), raw_after_first);
    }

    #[test]
    fn test_load_skips_bad_records_and_keeps_the_rest() {
        let storage = MemoryKeyValueStore::new();
        storage.insert_raw(
            DB_KEY,
            r#"[{"id": "todo-1", "title": "Keep me", "notes": "", "checklists": [],
                 "completed": false, "hidden": false, "createdAt": "2024-05-01T10:00:00Z",
                 "sourceSubtaskId": null, "sourceTaskId": null},
                {"id": "todo-2", "notes": "no title here"},
                "not a todo",
                {"title": "no id"}]"#,
        );
        let store = TodoStore::new(storage);

        let loaded = store.load();
        let ids: Vec<&str> = loaded.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["todo-1", "todo-2"]);
        assert_eq!(loaded[1].title, "");
        assert_eq!(loaded[1].notes, "no title here");

        store.add(NewTodo::titled("New"));

        let after: Vec<String> = store.get_all().into_iter().map(|t| t.id).collect();
        assert_eq!(after.len(), 3);
        assert!(after.contains(&String::from("todo-1")));
        assert!(after.contains(&String::from("todo-2")));
    }

    #[test]
    fn test_save_failure_notifies_and_returns_false() {
        let notifier = RecordingNotifier::default();
        let store =
            TodoStore::new(MemoryKeyValueStore::with_quota(16)).with_notifier(notifier.clone());

        let saved = store.save(&[NewTodo::titled("Too big to fit").into_todo()]);

        assert!(!saved);
        assert_eq!(notifier.messages(), vec![SAVE_FAILED_MESSAGE.to_string()]);
    }

    #[test]
    fn test_save_failure_without_notifier_is_silent() {
        let store = TodoStore::new(MemoryKeyValueStore::with_quota(16));
        assert!(!store.save(&[NewTodo::titled("Too big to fit").into_todo()]));
    }

    #[test]
    fn test_custom_key() {
        let store = TodoStore::new(MemoryKeyValueStore::new()).with_key("other_todos");
        store.save(&[]);
        assert!(store.storage().get("other_todos").unwrap().is_some());
        assert!(store.storage().get(DB_KEY).unwrap().is_none());
    }
}
