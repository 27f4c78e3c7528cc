use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::generate_id;

pub const DEFAULT_TODO_TITLE: &str = "New Task";
pub const DEFAULT_CHECKLIST_TITLE: &str = "Checklist";

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Identifier of the todo, never changes after creation
    pub id: String,
    /// Title of the todo
    #[serde(default)]
    pub title: String,
    /// Free-text notes of the todo
    #[serde(default)]
    pub notes: String,
    /// Checklists of the todo, in display order
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    /// Whether the todo itself is done, independent of its checklists
    #[serde(default)]
    pub completed: bool,
    /// Hidden todos live outside the active view
    #[serde(default)]
    pub hidden: bool,
    /// When the todo was created
    #[serde(default)]
    pub created_at: Timestamp,
    /// Item this todo was spawned from, if it is a follow-up
    #[serde(default)]
    pub source_subtask_id: Option<String>,
    /// Todo owning the item this todo was spawned from, if it is a follow-up
    #[serde(default)]
    pub source_task_id: Option<String>,
}

impl Todo {
    /// True when both back-references are set.
    pub fn is_follow_up(&self) -> bool {
        self.source_task_id.is_some() && self.source_subtask_id.is_some()
    }

    /// Every follow-up id claimed by an item of this todo.
    pub fn follow_up_ids(&self) -> impl Iterator<Item = &str> {
        self.checklists
            .iter()
            .flat_map(|checklist| checklist.items.iter())
            .filter_map(|item| item.follow_up_task_id.as_deref())
    }

    pub fn find_item_mut(&mut self, subtask_id: &str) -> Option<&mut SubtaskItem> {
        self.checklists
            .iter_mut()
            .flat_map(|checklist| checklist.items.iter_mut())
            .find(|item| item.id == subtask_id)
    }

    pub fn checklist_mut(&mut self, checklist_id: &str) -> Option<&mut Checklist> {
        self.checklists.iter_mut().find(|c| c.id == checklist_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    #[serde(default = "default_checklist_title")]
    pub title: String,
    /// UI state, persisted alongside the data
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub items: Vec<SubtaskItem>,
}

fn default_checklist_title() -> String {
    DEFAULT_CHECKLIST_TITLE.to_string()
}

impl Checklist {
    pub fn new(title: Option<String>) -> Self {
        Self {
            id: generate_id("cl"),
            title: title.unwrap_or_else(default_checklist_title),
            is_collapsed: false,
            items: vec![],
        }
    }

    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|item| item.completed).count()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Todo spawned when this item was checked
    #[serde(default)]
    pub follow_up_task_id: Option<String>,
}

impl SubtaskItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_id("sub"),
            text: text.into(),
            completed: false,
            follow_up_task_id: None,
        }
    }
}

/// Input for [`crate::store::TodoStore::add`].
#[derive(Default, Clone, Debug)]
pub struct NewTodo {
    /// Missing titles fall back to [`DEFAULT_TODO_TITLE`]; an empty title is kept
    pub title: Option<String>,
    pub notes: Option<String>,
    pub hidden: bool,
    /// Legacy flat subtasks, wrapped into a single default checklist
    pub subtasks: Vec<SubtaskItem>,
}

impl NewTodo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn into_todo(self) -> Todo {
        let checklists = if self.subtasks.is_empty() {
            vec![]
        } else {
            let mut checklist = Checklist::new(None);
            checklist.items = self.subtasks;
            vec![checklist]
        };

        Todo {
            id: generate_id("todo"),
            title: self
                .title
                .unwrap_or_else(|| DEFAULT_TODO_TITLE.to_string()),
            notes: self.notes.unwrap_or_default(),
            checklists,
            completed: false,
            hidden: self.hidden,
            created_at: Timestamp::now(),
            source_subtask_id: None,
            source_task_id: None,
        }
    }
}
