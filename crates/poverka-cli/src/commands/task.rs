//! Task scheduler commands.

use anyhow::{Context, Result, bail};
use poverka_store::Store;
use poverka_types::{NewTask, Task, format_date};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{OutputFormat, TaskAction};
use crate::style::{dimmed, format_done, format_priority_colored};
use crate::util::{AppContext, confirm, parse_day, parse_month, to_json, write_output};

/// Execute a task subcommand.
pub fn cmd_task(action: TaskAction, ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;

    match action {
        TaskAction::Add {
            title,
            date,
            description,
            priority,
            category,
        } => {
            if title.trim().is_empty() {
                bail!("Task title cannot be empty");
            }
            let date = ctx.date_or_today(date.as_deref())?;
            let mut task = NewTask::new(title, date)
                .description(description)
                .priority(priority.into());
            if let Some(category) = category.filter(|c| !c.is_empty()) {
                task = task.category(category);
            }
            let id = store.insert_task(&task).context("Failed to save task")?;
            if !ctx.quiet {
                println!("Added task #{} for {}", id, format_date(date));
            }
            Ok(())
        }
        TaskAction::List { date, output } => {
            let date = ctx.date_or_today(date.as_deref())?;
            let tasks = store.tasks_for_date(date)?;
            if output.format == OutputFormat::Json {
                return write_output(None, &to_json(&tasks)?);
            }
            if tasks.is_empty() {
                if !ctx.quiet {
                    println!("No tasks for {}.", format_date(date));
                }
                return Ok(());
            }
            if !ctx.quiet {
                println!("Tasks for {}:", format_date(date));
            }
            println!("{}", task_table(&tasks, ctx.no_color));
            Ok(())
        }
        TaskAction::Done { id } => {
            store.set_task_completed(id, true)?;
            if !ctx.quiet {
                println!("Task #{} completed", id);
            }
            Ok(())
        }
        TaskAction::Toggle { id } => {
            let completed = store.toggle_task(id)?;
            if !ctx.quiet {
                let state = if completed { "completed" } else { "open" };
                println!("Task #{} is now {}", id, state);
            }
            Ok(())
        }
        TaskAction::Edit {
            id,
            title,
            description,
            priority,
            category,
        } => {
            let mut task = require_task(&store, id)?;
            if let Some(title) = title {
                if title.trim().is_empty() {
                    bail!("Task title cannot be empty");
                }
                task.title = title;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if let Some(priority) = priority {
                task.priority = priority.into();
            }
            if let Some(category) = category {
                task.category = Some(category).filter(|c| !c.is_empty());
            }
            store.update_task(&task)?;
            if !ctx.quiet {
                println!("Updated task #{}", id);
            }
            Ok(())
        }
        TaskAction::Move { id, date } => {
            let date = parse_day(&date, ctx.today())?;
            store.change_task_date(id, date)?;
            if !ctx.quiet {
                println!("Moved task #{} to {}", id, format_date(date));
            }
            Ok(())
        }
        TaskAction::Delete { id, yes } => {
            let task = require_task(&store, id)?;
            if !confirm(&format!("Delete task #{} \"{}\"?", id, task.title), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            store.delete_task(id)?;
            if !ctx.quiet {
                println!("Deleted task #{}", id);
            }
            Ok(())
        }
        TaskAction::Dates { month } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => {
                    let today = ctx.today();
                    (today.year(), today.month())
                }
            };
            let dates = store.dates_with_tasks(year, month)?;
            if dates.is_empty() {
                if !ctx.quiet {
                    println!("No tasks in {:02}.{}.", u8::from(month), year);
                }
                return Ok(());
            }
            for date in dates {
                let open = store.active_task_count(date)?;
                println!("{}  {} open", format_date(date), open);
            }
            Ok(())
        }
        TaskAction::Cleanup { before, yes } => {
            let before = ctx.date_or_today(before.as_deref())?;
            let prompt = format!("Delete completed tasks dated before {}?", format_date(before));
            if !confirm(&prompt, yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            let removed = store.cleanup_completed_before(before)?;
            if !ctx.quiet {
                println!("Removed {} completed tasks", removed);
            }
            Ok(())
        }
        TaskAction::Count { date, from, to } => {
            let count = match (from, to) {
                (Some(from), Some(to)) => {
                    let start = parse_day(&from, ctx.today())?;
                    let end = parse_day(&to, ctx.today())?;
                    if end < start {
                        bail!("Period end {} is before its start {}", to, from);
                    }
                    store.active_task_count_between(start, end)?
                }
                _ => store.active_task_count(ctx.date_or_today(date.as_deref())?)?,
            };
            println!("{}", count);
            Ok(())
        }
    }
}

fn require_task(store: &Store, id: i64) -> Result<Task> {
    store
        .get_task(id)?
        .with_context(|| format!("Task #{} not found", id))
}

fn task_table(tasks: &[Task], no_color: bool) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Done", "Priority", "Title", "Category"]);
    for task in tasks {
        let title = if task.completed {
            dimmed(&task.title, no_color)
        } else {
            task.title.clone()
        };
        builder.push_record([
            task.id.to_string(),
            format_done(task.completed, no_color),
            format_priority_colored(task.priority, no_color),
            title,
            task.category.clone().unwrap_or_default(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
