use colored::*;

use todostore::{KeyValueStore, SubtaskItem, Todo, TodoStore};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a todo
pub fn get_status_glyph(todo: &Todo) -> ColoredString {
    if todo.completed {
        "✓".dimmed()
    } else if todo.is_follow_up() {
        "↳".cyan()
    } else {
        "○".normal()
    }
}

fn get_item_glyph(item: &SubtaskItem) -> ColoredString {
    if item.completed {
        "[x]".green()
    } else {
        "[ ]".normal()
    }
}

/// Right-hand context for a todo: checklist progress and hidden marker
pub fn get_todo_context<S: KeyValueStore>(todo: &Todo, store: &TodoStore<S>) -> Option<String> {
    let mut parts = vec![];

    let (done, total) = store.subtask_progress(todo);
    if total > 0 {
        parts.push(format!("{}/{}", done, total));
    }
    if todo.hidden {
        parts.push(String::from("hidden"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("  ·  "))
    }
}

/// Render a single todo line with position, glyph, title, and right-aligned context
pub fn render_todo_line<S: KeyValueStore>(position: usize, todo: &Todo, store: &TodoStore<S>) {
    let terminal_width = get_terminal_width();

    let position_str = format!("{:>3}", position);
    let glyph = get_status_glyph(todo);
    let title = if todo.title.is_empty() {
        "(untitled)"
    } else {
        todo.title.as_str()
    };

    let left_section = format!("  {}  {}  {}", position_str, glyph, title);
    let styled_left = if todo.completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    let Some(context) = get_todo_context(todo, store) else {
        println!("{}", styled_left);
        return;
    };

    let left_visible_len = format!("  {}  {}  {}", position_str, " ", title)
        .chars()
        .count();
    let right_visible_len = context.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), context.dimmed());
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}", styled_left);
    }
}

/// Render the full detail view of one todo
pub fn render_todo_detail<S: KeyValueStore>(todo: &Todo, store: &TodoStore<S>) {
    println!(
        "\n  {} {}",
        get_status_glyph(todo),
        todo.title.cyan().bold()
    );
    println!("  {}", todo.id.dimmed());

    if let Some(source) = store.get_source_subtask(&todo.id) {
        println!(
            "  {} {} › {} › {}",
            "from".dimmed(),
            source.parent_task.title,
            source.checklist.title,
            source.subtask.text
        );
    }

    if !todo.notes.is_empty() {
        println!();
        for line in todo.notes.lines() {
            println!("    {}", line);
        }
    }

    let mut position = 0;
    for checklist in &todo.checklists {
        let marker = if checklist.is_collapsed { "▸" } else { "▾" };
        render_section_header(&format!(
            "{} {} ({}/{})",
            marker,
            checklist.title,
            checklist.done_count(),
            checklist.items.len()
        ));

        for item in &checklist.items {
            position += 1;
            if checklist.is_collapsed {
                continue;
            }
            let follow_up = store
                .get_follow_up_task(&item.id)
                .map(|task| format!("  → {}", task.title).dimmed().to_string())
                .unwrap_or_default();
            println!(
                "  {:>3}  {}  {}{}",
                position,
                get_item_glyph(item),
                item.text,
                follow_up
            );
        }
    }
    println!();
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "task" } else { "tasks" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g., a checklist title)
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Print a toast-style notification
pub fn render_toast(message: &str) {
    println!("  {} {}", "●".cyan(), message);
}

/// Render a one-line success message
pub fn render_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}
