use crate::{
    models::{
        patch::ChecklistPatch,
        todo::{Checklist, Todo},
    },
    services::todos::order_by_ids,
    storage::KeyValueStore,
    store::TodoStore,
};

impl<S: KeyValueStore> TodoStore<S> {
    pub fn add_checklist(&self, todo_id: &str, title: Option<String>) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| {
            todo.checklists.push(Checklist::new(title));
            true
        })
    }

    pub fn update_checklist(
        &self,
        todo_id: &str,
        checklist_id: &str,
        patch: ChecklistPatch,
    ) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| match todo.checklist_mut(checklist_id) {
            Some(checklist) => {
                patch.apply(checklist);
                true
            }
            None => false,
        })
    }

    /// Drops the checklist and its items. Follow-ups spawned by those items are left for
    /// [`TodoStore::cleanup_orphaned_follow_ups`].
    pub fn delete_checklist(&self, todo_id: &str, checklist_id: &str) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| {
            let before = todo.checklists.len();
            todo.checklists.retain(|c| c.id != checklist_id);
            todo.checklists.len() != before
        })
    }

    /// Checklists not named in `ordered_checklist_ids` are dropped.
    pub fn reorder_checklists<T: AsRef<str>>(
        &self,
        todo_id: &str,
        ordered_checklist_ids: &[T],
    ) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| {
            let checklists = std::mem::take(&mut todo.checklists);
            todo.checklists = order_by_ids(checklists, ordered_checklist_ids, |c| &c.id, false);
            true
        })
    }
}
