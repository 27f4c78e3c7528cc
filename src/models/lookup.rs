use crate::models::todo::{Checklist, SubtaskItem, Todo};

/// Where an item lives inside one todo.
#[derive(Clone, Debug, PartialEq)]
pub struct SubtaskLocation {
    pub checklist: Checklist,
    pub item: SubtaskItem,
}

/// The item a follow-up todo was spawned from.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSubtask {
    pub parent_task: Todo,
    pub checklist: Checklist,
    pub subtask: SubtaskItem,
}

/// Outcome of a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub orphaned_tasks_removed: usize,
    pub broken_references_fixed: usize,
    pub total_cleaned: usize,
}

impl CleanupReport {
    pub fn new(orphaned_tasks_removed: usize, broken_references_fixed: usize) -> Self {
        Self {
            orphaned_tasks_removed,
            broken_references_fixed,
            total_cleaned: orphaned_tasks_removed + broken_references_fixed,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.total_cleaned == 0
    }
}
