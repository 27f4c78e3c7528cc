//! Follow-up tasks: checking an item spawns a hidden todo linked back to it, unchecking
//! removes that todo again.
//!
//! Links are not enforced on every write path. [`TodoStore::cleanup_orphaned_follow_ups`]
//! is the repair pass and should run once at startup.

use std::collections::HashSet;

use jiff::Timestamp;

use crate::{
    models::{
        generate_id,
        lookup::{CleanupReport, SourceSubtask},
        todo::Todo,
    },
    notify::{FOLLOW_UP_REMOVED_MESSAGE, follow_up_created_message},
    storage::KeyValueStore,
    store::TodoStore,
};

impl<S: KeyValueStore> TodoStore<S> {
    /// Flip an item and create or remove its follow-up in the same write.
    pub fn toggle_subtask_item(&self, todo_id: &str, subtask_id: &str) -> Option<Todo> {
        let mut todos = self.load();
        let parent = todos.iter().find(|t| t.id == todo_id)?;
        let (checklist_title, item) = parent.checklists.iter().find_map(|checklist| {
            checklist
                .items
                .iter()
                .find(|item| item.id == subtask_id)
                .map(|item| (checklist.title.clone(), item.clone()))
        })?;
        let parent_title = parent.title.clone();

        let message = if !item.completed {
            let follow_up = Todo {
                id: generate_id("todo"),
                title: item.text.clone(),
                notes: format!("Follow-up from \"{}\" › {}", parent_title, checklist_title),
                checklists: vec![],
                completed: false,
                hidden: true,
                created_at: Timestamp::now(),
                source_subtask_id: Some(subtask_id.to_string()),
                source_task_id: Some(todo_id.to_string()),
            };
            let follow_up_id = follow_up.id.clone();
            todos.push(follow_up);

            let target = find_item(&mut todos, todo_id, subtask_id)?;
            target.completed = true;
            target.follow_up_task_id = Some(follow_up_id.clone());
            tracing::debug!("Item {} spawned follow-up {}", subtask_id, follow_up_id);
            Some(follow_up_created_message(&item.text))
        } else if let Some(follow_up_id) = &item.follow_up_task_id {
            todos.retain(|t| &t.id != follow_up_id || t.id == todo_id);

            let target = find_item(&mut todos, todo_id, subtask_id)?;
            target.completed = false;
            target.follow_up_task_id = None;
            tracing::debug!("Item {} dropped follow-up {}", subtask_id, follow_up_id);
            Some(FOLLOW_UP_REMOVED_MESSAGE.to_string())
        } else {
            let target = find_item(&mut todos, todo_id, subtask_id)?;
            target.completed = false;
            None
        };

        self.save(&todos);
        if let Some(message) = message {
            self.notify(&message);
        }

        todos.into_iter().find(|t| t.id == todo_id)
    }

    /// The todo spawned by the item `subtask_id`, wherever that item lives.
    pub fn get_follow_up_task(&self, subtask_id: &str) -> Option<Todo> {
        let todos = self.load();
        let follow_up_id = todos
            .iter()
            .flat_map(|todo| self.get_all_subtasks(todo))
            .find(|item| item.id == subtask_id && item.follow_up_task_id.is_some())?
            .follow_up_task_id
            .clone()?;
        todos.into_iter().find(|t| t.id == follow_up_id)
    }

    /// The item a follow-up todo came from. `None` when `task_id` is not a follow-up or
    /// its parent or item are gone.
    pub fn get_source_subtask(&self, task_id: &str) -> Option<SourceSubtask> {
        let todos = self.load();
        let task = todos.iter().find(|t| t.id == task_id)?;
        let (Some(parent_id), Some(subtask_id)) = (&task.source_task_id, &task.source_subtask_id)
        else {
            return None;
        };
        let parent_task = todos.iter().find(|t| &t.id == parent_id)?;
        let location = self.find_subtask_in_todo(parent_task, subtask_id)?;

        Some(SourceSubtask {
            parent_task: parent_task.clone(),
            checklist: location.checklist,
            subtask: location.item,
        })
    }

    /// Remove follow-ups nobody points at (or whose parent is gone), then clear item links
    /// to todos that no longer exist. Writes once, only if something changed.
    ///
    /// Orphan removal repeats until stable, so a second run always reports nothing.
    pub fn cleanup_orphaned_follow_ups(&self) -> CleanupReport {
        let mut todos = self.load();

        let mut orphaned_tasks_removed = 0;
        loop {
            let existing: HashSet<String> = todos.iter().map(|t| t.id.clone()).collect();
            let claimed: HashSet<String> = todos
                .iter()
                .flat_map(|t| t.follow_up_ids())
                .map(String::from)
                .collect();

            let before = todos.len();
            todos.retain(|t| !is_orphaned(t, &existing, &claimed));
            let removed = before - todos.len();
            if removed == 0 {
                break;
            }
            orphaned_tasks_removed += removed;
        }

        let surviving: HashSet<String> = todos.iter().map(|t| t.id.clone()).collect();
        let mut broken_references_fixed = 0;
        let items = todos
            .iter_mut()
            .flat_map(|t| t.checklists.iter_mut())
            .flat_map(|c| c.items.iter_mut());
        for item in items {
            if item
                .follow_up_task_id
                .as_ref()
                .is_some_and(|id| !surviving.contains(id))
            {
                item.follow_up_task_id = None;
                broken_references_fixed += 1;
            }
        }

        let report = CleanupReport::new(orphaned_tasks_removed, broken_references_fixed);
        if !report.is_clean() {
            tracing::info!(
                "Cleaned up follow-ups: {} orphaned task(s) removed, {} broken reference(s) fixed",
                report.orphaned_tasks_removed,
                report.broken_references_fixed
            );
            self.save(&todos);
        }

        report
    }
}

fn find_item<'a>(
    todos: &'a mut [Todo],
    todo_id: &str,
    subtask_id: &str,
) -> Option<&'a mut crate::models::todo::SubtaskItem> {
    todos
        .iter_mut()
        .find(|t| t.id == todo_id)?
        .find_item_mut(subtask_id)
}

fn is_orphaned(todo: &Todo, existing: &HashSet<String>, claimed: &HashSet<String>) -> bool {
    let (Some(parent_id), Some(_)) = (&todo.source_task_id, &todo.source_subtask_id) else {
        return false;
    };
    !existing.contains(parent_id) || !claimed.contains(&todo.id)
}

#[cfg(test)]
mod tests {
    use crate::{
        models::{
            patch::{SubtaskItemPatch, TodoPatch},
            todo::{NewTodo, Todo},
        },
        notify::{FOLLOW_UP_REMOVED_MESSAGE, follow_up_created_message},
        storage::memory::MemoryKeyValueStore,
        store::{
            TodoStore,
            test_support::{memory_store, recording_store},
        },
    };

    struct Fixture {
        todo_id: String,
        checklist_id: String,
        item_id: String,
    }

    fn plan_trip(store: &TodoStore<MemoryKeyValueStore>) -> Fixture {
        let todo = store.add(NewTodo::titled("Plan trip"));
        let todo = store
            .add_checklist(&todo.id, Some(String::from("Steps")))
            .unwrap();
        let checklist_id = todo.checklists[0].id.clone();
        let todo = store
            .add_subtask_item(&todo.id, &checklist_id, "Book flight")
            .unwrap();
        Fixture {
            item_id: todo.checklists[0].items[0].id.clone(),
            todo_id: todo.id,
            checklist_id,
        }
    }

    fn item_of(todo: &Todo) -> &crate::models::todo::SubtaskItem {
        &todo.checklists[0].items[0]
    }

    #[test]
    fn test_check_creates_hidden_follow_up() {
        let (store, notifier) = recording_store();
        let fx = plan_trip(&store);

        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();

        let item = item_of(&parent);
        assert!(item.completed);
        let follow_up_id = item.follow_up_task_id.clone().unwrap();
        let follow_up = store.get(&follow_up_id).unwrap();
        assert_eq!(follow_up.title, "Book flight");
        assert!(follow_up.hidden);
        assert!(follow_up.notes.contains("Plan trip"));
        assert!(follow_up.notes.contains("Steps"));
        assert_eq!(follow_up.source_task_id.as_deref(), Some(fx.todo_id.as_str()));
        assert_eq!(follow_up.source_subtask_id.as_deref(), Some(fx.item_id.as_str()));
        assert_eq!(
            notifier.messages(),
            vec![follow_up_created_message("Book flight")]
        );
    }

    #[test]
    fn test_uncheck_removes_follow_up() {
        let (store, notifier) = recording_store();
        let fx = plan_trip(&store);
        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);

        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();

        assert!(!item_of(&parent).completed);
        assert_eq!(item_of(&parent).follow_up_task_id, None);
        assert_eq!(store.get_all().len(), 1);
        assert_eq!(
            notifier.messages().last().map(String::as_str),
            Some(FOLLOW_UP_REMOVED_MESSAGE)
        );
    }

    #[test]
    fn test_toggle_twice_twice_restores_collection() {
        let store = memory_store();
        let fx = plan_trip(&store);
        let before = store.get_all().len();

        for _ in 0..2 {
            store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
            store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
        }

        let parent = store.get(&fx.todo_id).unwrap();
        assert!(!item_of(&parent).completed);
        assert_eq!(item_of(&parent).follow_up_task_id, None);
        assert_eq!(store.get_all().len(), before);
    }

    #[test]
    fn test_uncheck_without_link_is_plain_flip() {
        let (store, notifier) = recording_store();
        let fx = plan_trip(&store);
        store.update_subtask_item(
            &fx.todo_id,
            &fx.item_id,
            SubtaskItemPatch {
                completed: Some(true),
                ..SubtaskItemPatch::default()
            },
        );

        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();

        assert!(!item_of(&parent).completed);
        assert_eq!(store.get_all().len(), 1);
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn test_toggle_missing_is_none() {
        let store = memory_store();
        let fx = plan_trip(&store);

        assert!(store.toggle_subtask_item("todo-missing", &fx.item_id).is_none());
        assert!(store.toggle_subtask_item(&fx.todo_id, "sub-missing").is_none());
    }

    #[test]
    fn test_delete_parent_cascades_to_follow_up() {
        let store = memory_store();
        let fx = plan_trip(&store);
        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();
        let follow_up_id = item_of(&parent).follow_up_task_id.clone().unwrap();
        let bystander = store.add(NewTodo::titled("Unrelated"));

        assert!(store.delete(&fx.todo_id));

        let ids: Vec<String> = store.get_all().into_iter().map(|t| t.id).collect();
        assert!(!ids.contains(&fx.todo_id));
        assert!(!ids.contains(&follow_up_id));
        assert_eq!(ids, vec![bystander.id]);
    }

    #[test]
    fn test_delete_follow_up_clears_source_link() {
        let store = memory_store();
        let fx = plan_trip(&store);
        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();
        let follow_up_id = item_of(&parent).follow_up_task_id.clone().unwrap();

        assert!(store.delete(&follow_up_id));

        let parent = store.get(&fx.todo_id).unwrap();
        assert_eq!(item_of(&parent).follow_up_task_id, None);
        assert!(item_of(&parent).completed);
    }

    #[test]
    fn test_delete_follow_up_leaves_newer_link_alone() {
        let store = memory_store();
        let fx = plan_trip(&store);
        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();
        let follow_up_id = item_of(&parent).follow_up_task_id.clone().unwrap();
        store.update_subtask_item(
            &fx.todo_id,
            &fx.item_id,
            SubtaskItemPatch {
                follow_up_task_id: Some(Some(String::from("todo-newer"))),
                ..SubtaskItemPatch::default()
            },
        );

        store.delete(&follow_up_id);

        let parent = store.get(&fx.todo_id).unwrap();
        assert_eq!(
            item_of(&parent).follow_up_task_id.as_deref(),
            Some("todo-newer")
        );
    }

    #[test]
    fn test_get_follow_up_task_and_source_subtask() {
        let store = memory_store();
        let fx = plan_trip(&store);
        assert!(store.get_follow_up_task(&fx.item_id).is_none());

        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);

        let follow_up = store.get_follow_up_task(&fx.item_id).unwrap();
        assert_eq!(follow_up.title, "Book flight");

        let source = store.get_source_subtask(&follow_up.id).unwrap();
        assert_eq!(source.parent_task.id, fx.todo_id);
        assert_eq!(source.checklist.id, fx.checklist_id);
        assert_eq!(source.subtask.id, fx.item_id);

        assert!(store.get_source_subtask(&fx.todo_id).is_none());
        assert!(store.get_source_subtask("todo-missing").is_none());
    }

    #[test]
    fn test_get_source_subtask_after_item_deleted() {
        let store = memory_store();
        let fx = plan_trip(&store);
        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
        let follow_up = store.get_follow_up_task(&fx.item_id).unwrap();

        store.delete_subtask_item(&fx.todo_id, &fx.item_id);

        assert!(store.get_source_subtask(&follow_up.id).is_none());
    }

    #[test]
    fn test_cleanup_removes_unclaimed_follow_up() {
        let store = memory_store();
        let fx = plan_trip(&store);
        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
        store.delete_checklist(&fx.todo_id, &fx.checklist_id);

        let report = store.cleanup_orphaned_follow_ups();

        assert_eq!(report.orphaned_tasks_removed, 1);
        assert_eq!(report.broken_references_fixed, 0);
        assert_eq!(report.total_cleaned, 1);
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn test_cleanup_removes_follow_up_of_missing_parent() {
        let store = memory_store();
        let orphan = store.add(NewTodo::titled("Stray"));
        store.update(
            &orphan.id,
            TodoPatch {
                source_task_id: Some(Some(String::from("todo-gone"))),
                source_subtask_id: Some(Some(String::from("sub-gone"))),
                ..TodoPatch::default()
            },
        );

        let report = store.cleanup_orphaned_follow_ups();

        assert_eq!(report.orphaned_tasks_removed, 1);
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_cleanup_fixes_broken_reference() {
        let store = memory_store();
        let fx = plan_trip(&store);
        store.update_subtask_item(
            &fx.todo_id,
            &fx.item_id,
            SubtaskItemPatch {
                completed: Some(true),
                follow_up_task_id: Some(Some(String::from("todo-gone"))),
                ..SubtaskItemPatch::default()
            },
        );

        let report = store.cleanup_orphaned_follow_ups();

        assert_eq!(report.orphaned_tasks_removed, 0);
        assert_eq!(report.broken_references_fixed, 1);
        let parent = store.get(&fx.todo_id).unwrap();
        assert_eq!(item_of(&parent).follow_up_task_id, None);
    }

    #[test]
    fn test_cleanup_keeps_healthy_links_and_skips_write() {
        let store = memory_store();
        let fx = plan_trip(&store);
        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
        let writes = store.storage().write_count();

        let report = store.cleanup_orphaned_follow_ups();

        assert!(report.is_clean());
        assert_eq!(store.get_all().len(), 2);
        assert_eq!(store.storage().write_count(), writes);
    }

    #[test]
    fn test_cleanup_converges() {
        let store = memory_store();
        let fx = plan_trip(&store);
        // Follow-up of a follow-up, then orphan the middle one.
        let parent = store.toggle_subtask_item(&fx.todo_id, &fx.item_id).unwrap();
        let middle_id = item_of(&parent).follow_up_task_id.clone().unwrap();
        let middle = store
            .add_checklist(&middle_id, Some(String::from("Sub")))
            .unwrap();
        let middle = store
            .add_subtask_item(&middle_id, &middle.checklists[0].id, "Deeper")
            .unwrap();
        store.toggle_subtask_item(&middle_id, &middle.checklists[0].items[0].id);
        store.delete_subtask_item(&fx.todo_id, &fx.item_id);
        store.add(NewTodo::titled("Unrelated"));

        let first = store.cleanup_orphaned_follow_ups();
        let second = store.cleanup_orphaned_follow_ups();

        assert_eq!(first.orphaned_tasks_removed, 2);
        assert_eq!(second.orphaned_tasks_removed, 0);
        assert_eq!(second.broken_references_fixed, 0);
        assert_eq!(store.get_all().len(), 2);
    }

    #[test]
    fn test_plan_trip_scenario() {
        let store = memory_store();
        let fx = plan_trip(&store);

        store.toggle_subtask_item(&fx.todo_id, &fx.item_id);
        let todos = store.get_all();
        let follow_up = todos
            .iter()
            .find(|t| t.id != fx.todo_id)
            .expect("follow-up should exist");
        assert!(follow_up.hidden);
        assert_eq!(follow_up.title, "Book flight");
        assert_eq!(follow_up.source_task_id.as_deref(), Some(fx.todo_id.as_str()));
        assert_eq!(follow_up.source_subtask_id.as_deref(), Some(fx.item_id.as_str()));
        let parent = store.get(&fx.todo_id).unwrap();
        assert_eq!(
            item_of(&parent).follow_up_task_id.as_deref(),
            Some(follow_up.id.as_str())
        );

        store.delete(&fx.todo_id);

        assert!(store.get_all().is_empty());
    }
}
