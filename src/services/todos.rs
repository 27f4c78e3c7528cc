use std::collections::HashSet;

use crate::{
    models::{
        patch::TodoPatch,
        todo::{NewTodo, Todo},
    },
    storage::KeyValueStore,
    store::TodoStore,
};

impl<S: KeyValueStore> TodoStore<S> {
    pub fn get_all(&self) -> Vec<Todo> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Option<Todo> {
        self.load().into_iter().find(|t| t.id == id)
    }

    pub fn add(&self, data: NewTodo) -> Todo {
        let mut todos = self.load();
        let todo = data.into_todo();
        todos.push(todo.clone());
        self.save(&todos);
        tracing::debug!("Added todo {}", todo.id);
        todo
    }

    pub fn update(&self, id: &str, patch: TodoPatch) -> Option<Todo> {
        self.modify_todo(id, |todo| {
            patch.apply(todo);
            true
        })
    }

    /// Remove a todo together with every follow-up its items point at.
    ///
    /// When the todo is itself a follow-up, the source item's link is cleared first, but
    /// only if it still points at this todo.
    pub fn delete(&self, id: &str) -> bool {
        let mut todos = self.load();
        let Some(todo) = todos.iter().find(|t| t.id == id).cloned() else {
            return false;
        };

        if let (Some(source_task_id), Some(source_subtask_id)) =
            (&todo.source_task_id, &todo.source_subtask_id)
        {
            let source_item = todos
                .iter_mut()
                .find(|t| &t.id == source_task_id)
                .and_then(|parent| parent.find_item_mut(source_subtask_id));
            if let Some(item) = source_item
                && item.follow_up_task_id.as_deref() == Some(id)
            {
                item.follow_up_task_id = None;
            }
        }

        let mut doomed: HashSet<&str> = todo.follow_up_ids().collect();
        doomed.insert(id);

        let before = todos.len();
        todos.retain(|t| !doomed.contains(t.id.as_str()));
        tracing::debug!("Deleted todo {} ({} record(s) removed)", id, before - todos.len());

        self.save(&todos);
        true
    }

    pub fn toggle(&self, id: &str) -> Option<Todo> {
        self.modify_todo(id, |todo| {
            todo.completed = !todo.completed;
            true
        })
    }

    pub fn toggle_hidden(&self, id: &str) -> Option<Todo> {
        self.modify_todo(id, |todo| {
            todo.hidden = !todo.hidden;
            true
        })
    }

    /// Move the todos named in `ordered_ids` to the front, in that order. Todos not
    /// named keep their relative order after them. Unknown ids are ignored.
    pub fn reorder<T: AsRef<str>>(&self, ordered_ids: &[T]) -> bool {
        let todos = self.load();
        let reordered = order_by_ids(todos, ordered_ids, |t| &t.id, true);
        self.save(&reordered)
    }

    /// Put back a todo removed by [`TodoStore::delete`]. Refused when the id is taken.
    pub fn restore(&self, todo: Todo) -> bool {
        let mut todos = self.load();
        if todos.iter().any(|t| t.id == todo.id) {
            return false;
        }
        todos.push(todo);
        self.save(&todos)
    }
}

/// Sequence `entries` by `ordered_ids`. Duplicate ids are placed once; unknown ids are
/// skipped. With `keep_rest`, unnamed entries follow in their original order, otherwise
/// they are dropped.
pub(crate) fn order_by_ids<E, T, F>(
    entries: Vec<E>,
    ordered_ids: &[T],
    id_of: F,
    keep_rest: bool,
) -> Vec<E>
where
    T: AsRef<str>,
    F: Fn(&E) -> &String,
{
    let mut slots: Vec<Option<E>> = entries.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(slots.len());

    for wanted in ordered_ids {
        let position = slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|e| id_of(e) == wanted.as_ref()));
        if let Some(entry) = position.and_then(|p| slots[p].take()) {
            ordered.push(entry);
        }
    }

    if keep_rest {
        ordered.extend(slots.into_iter().flatten());
    }

    ordered
}
