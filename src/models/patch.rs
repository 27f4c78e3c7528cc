//! Shallow-merge patches. A `None` field leaves the target untouched.

use crate::models::todo::{Checklist, SubtaskItem, Todo};

#[derive(Default, Clone, Debug)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub checklists: Option<Vec<Checklist>>,
    pub completed: Option<bool>,
    pub hidden: Option<bool>,
    pub source_subtask_id: Option<Option<String>>,
    pub source_task_id: Option<Option<String>>,
}

impl TodoPatch {
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(notes) = self.notes {
            todo.notes = notes;
        }
        if let Some(checklists) = self.checklists {
            todo.checklists = checklists;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(hidden) = self.hidden {
            todo.hidden = hidden;
        }
        if let Some(source_subtask_id) = self.source_subtask_id {
            todo.source_subtask_id = source_subtask_id;
        }
        if let Some(source_task_id) = self.source_task_id {
            todo.source_task_id = source_task_id;
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct ChecklistPatch {
    pub title: Option<String>,
    pub is_collapsed: Option<bool>,
    pub items: Option<Vec<SubtaskItem>>,
}

impl ChecklistPatch {
    pub fn apply(self, checklist: &mut Checklist) {
        if let Some(title) = self.title {
            checklist.title = title;
        }
        if let Some(is_collapsed) = self.is_collapsed {
            checklist.is_collapsed = is_collapsed;
        }
        if let Some(items) = self.items {
            checklist.items = items;
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct SubtaskItemPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub follow_up_task_id: Option<Option<String>>,
}

impl SubtaskItemPatch {
    pub fn apply(self, item: &mut SubtaskItem) {
        if let Some(text) = self.text {
            item.text = text;
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
        if let Some(follow_up_task_id) = self.follow_up_task_id {
            item.follow_up_task_id = follow_up_task_id;
        }
    }
}
