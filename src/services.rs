//! Operations on [`crate::store::TodoStore`], grouped by what they touch.

pub mod checklists;
pub mod follow_ups;
pub mod subtasks;
pub mod todos;
