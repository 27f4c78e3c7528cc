use crate::{
    models::{
        lookup::SubtaskLocation,
        patch::SubtaskItemPatch,
        todo::{SubtaskItem, Todo},
    },
    services::todos::order_by_ids,
    storage::KeyValueStore,
    store::TodoStore,
};

impl<S: KeyValueStore> TodoStore<S> {
    pub fn add_subtask_item(
        &self,
        todo_id: &str,
        checklist_id: &str,
        text: impl Into<String>,
    ) -> Option<Todo> {
        let item = SubtaskItem::new(text);
        self.modify_todo(todo_id, |todo| match todo.checklist_mut(checklist_id) {
            Some(checklist) => {
                checklist.items.push(item);
                true
            }
            None => false,
        })
    }

    /// Setting `completed` here never spawns a follow-up; only
    /// [`TodoStore::toggle_subtask_item`] does.
    pub fn update_subtask_item(
        &self,
        todo_id: &str,
        subtask_id: &str,
        patch: SubtaskItemPatch,
    ) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| match todo.find_item_mut(subtask_id) {
            Some(item) => {
                patch.apply(item);
                true
            }
            None => false,
        })
    }

    pub fn delete_subtask_item(&self, todo_id: &str, subtask_id: &str) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| {
            for checklist in &mut todo.checklists {
                if let Some(position) = checklist.items.iter().position(|i| i.id == subtask_id) {
                    checklist.items.remove(position);
                    return true;
                }
            }
            false
        })
    }

    /// Items not named in `ordered_ids` are dropped: a full reorder lists every item.
    pub fn reorder_subtask_items<T: AsRef<str>>(
        &self,
        todo_id: &str,
        checklist_id: &str,
        ordered_ids: &[T],
    ) -> Option<Todo> {
        self.modify_todo(todo_id, |todo| match todo.checklist_mut(checklist_id) {
            Some(checklist) => {
                let items = std::mem::take(&mut checklist.items);
                checklist.items = order_by_ids(items, ordered_ids, |i| &i.id, false);
                true
            }
            None => false,
        })
    }

    /// All items of `todo`, checklist by checklist.
    pub fn get_all_subtasks<'a>(&self, todo: &'a Todo) -> Vec<&'a SubtaskItem> {
        todo.checklists
            .iter()
            .flat_map(|checklist| checklist.items.iter())
            .collect()
    }

    /// `(completed, total)` over every item of `todo`.
    pub fn subtask_progress(&self, todo: &Todo) -> (usize, usize) {
        let items = self.get_all_subtasks(todo);
        let done = items.iter().filter(|item| item.completed).count();
        (done, items.len())
    }

    pub fn find_subtask_in_todo(&self, todo: &Todo, subtask_id: &str) -> Option<SubtaskLocation> {
        todo.checklists.iter().find_map(|checklist| {
            checklist
                .items
                .iter()
                .find(|item| item.id == subtask_id)
                .map(|item| SubtaskLocation {
                    checklist: checklist.clone(),
                    item: item.clone(),
                })
        })
    }
}
