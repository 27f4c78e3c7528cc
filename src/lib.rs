//! Todo documents with nested checklists and follow-up tasks, persisted as one JSON
//! blob in a key-value store.

pub mod config;
pub mod logging;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;
pub mod store;

pub use models::{
    lookup::{CleanupReport, SourceSubtask, SubtaskLocation},
    patch::{ChecklistPatch, SubtaskItemPatch, TodoPatch},
    todo::{Checklist, NewTodo, SubtaskItem, Todo},
};
pub use notify::Notifier;
pub use storage::{KeyValueStore, StorageError, json::JsonFileStorage, memory::MemoryKeyValueStore};
pub use store::TodoStore;
