//! Task command handlers.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use taskflow_core::{FileCredentialStore, Taskflow};
use taskflow_types::{NewTask, Task, TaskSummary};

use super::explain;

type App = Taskflow<FileCredentialStore>;

fn require_session(app: &App) -> Result<()> {
    if app.session().current().is_none() {
        bail!("Not logged in. Run `taskflow login` first.");
    }
    Ok(())
}

pub async fn list(app: &App) -> Result<()> {
    require_session(app)?;
    let tasks = app.list_tasks().await.map_err(explain)?;
    if tasks.is_empty() {
        println!("No tasks yet.");
        return Ok(());
    }

    let now = Utc::now();
    for task in &tasks {
        println!("{}", format_task(task, now));
    }
    println!();
    println!("{}", format_summary(&TaskSummary::from_tasks(&tasks, now)));
    Ok(())
}

pub async fn add(
    app: &App,
    title: String,
    description: Option<String>,
    due: &str,
) -> Result<()> {
    require_session(app)?;
    let due_date = parse_due(due, Utc::now())?;
    let mut task = NewTask::new(title, due_date);
    if let Some(description) = description {
        task = task.with_description(description);
    }

    let created = app.add_task(task).await.map_err(explain)?;
    println!("Added {}", format_task(&created, Utc::now()));
    Ok(())
}

pub async fn toggle(app: &App, id: &str) -> Result<()> {
    require_session(app)?;
    let task = app.toggle_task(id).await.map_err(explain)?;
    let state = if task.completed { "completed" } else { "pending" };
    println!("Marked '{}' as {state}", task.title);
    Ok(())
}

pub async fn delete(app: &App, id: &str) -> Result<()> {
    require_session(app)?;
    let receipt = app.delete_task(id).await.map_err(explain)?;
    println!(
        "{}",
        receipt.message.unwrap_or_else(|| format!("Deleted task {id}"))
    );
    Ok(())
}

/// Parses an RFC 3339 timestamp or a `+<n><m|h|d>` offset from `now`.
fn parse_due(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let Some(offset) = input.strip_prefix('+') else {
        return DateTime::parse_from_rfc3339(input)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid due date '{input}' (use RFC 3339 or +30m/+2h/+1d)"));
    };

    let Some((split, _)) = offset.char_indices().next_back() else {
        bail!("invalid due offset '{input}'");
    };
    let (amount, unit) = offset.split_at(split);
    let amount: i64 = amount
        .parse()
        .with_context(|| format!("invalid due offset '{input}'"))?;
    let delta = match unit {
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        _ => bail!("invalid due offset '{input}' (unit must be m, h or d)"),
    };
    delta
        .and_then(|delta| now.checked_add_signed(delta))
        .with_context(|| format!("due offset '{input}' is out of range"))
}

fn format_task(task: &Task, now: DateTime<Utc>) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let id = task.id.as_deref().unwrap_or("-");
    let due = task.due_date.format("%Y-%m-%d %H:%M UTC");
    let when = if task.completed {
        String::new()
    } else if task.is_overdue(now) {
        ", overdue".to_string()
    } else {
        task.time_until_due(now)
            .map(|left| format!(", in {}", format_remaining(left)))
            .unwrap_or_default()
    };

    let mut line = format!("{mark} {id}  {}  (due {due}{when})", task.title);
    if let Some(description) = &task.description {
        line.push_str("\n      ");
        line.push_str(description);
    }
    line
}

fn format_remaining(left: TimeDelta) -> String {
    let days = left.num_days();
    let hours = left.num_hours() % 24;
    let minutes = left.num_minutes() % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{}m", minutes.max(1))
    }
}

fn format_summary(summary: &TaskSummary) -> String {
    format!(
        "{} tasks: {} completed, {} pending, {} overdue ({}% done)",
        summary.total,
        summary.completed,
        summary.pending,
        summary.overdue,
        summary.progress_percent
    )
}
