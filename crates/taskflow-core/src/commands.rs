use anyhow::{Context, anyhow, bail};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::render::{Renderer, short_id};
use crate::session::Session;
use crate::store::TaskStore;
use crate::task::{Status, Task, TaskDraft};
use crate::view::{FilterState, StatusFilter};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "modify", "delete", "status", "done", "start", "show", "stats", "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, renderer, inv))]
pub async fn dispatch<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    debug!(command = %inv.command, args = ?inv.args, "dispatching command");

    match inv.command.as_str() {
        "list" => cmd_list(session, renderer, &inv.args).await,
        "add" => cmd_add(session, &inv.args).await,
        "modify" => cmd_modify(session, &inv.args).await,
        "delete" => cmd_delete(session, &inv.args).await,
        "status" => cmd_status(session, &inv.args).await,
        "done" => cmd_transition(session, &inv.args, Status::Completed).await,
        "start" => cmd_transition(session, &inv.args, Status::InProgress).await,
        "show" => cmd_show(session, renderer, &inv.args).await,
        "stats" => cmd_stats(session, renderer).await,
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(session, renderer, args))]
async fn cmd_list<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command list");

    let filter = parse_list_filter(args)?;
    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;

    let view = session.view(&filter);
    renderer.print_counts(&view.counts)?;

    if view.visible.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    renderer.print_task_table(&view.visible, today)?;
    Ok(())
}

#[instrument(skip(session, args))]
async fn cmd_add<S: TaskStore>(session: &mut Session<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let draft = parse_draft_args(args, None)?;
    let created = session
        .create(draft)
        .await
        .context("failed to create task")?;

    println!("Created task {} \"{}\".", short_id(&created), created.title);
    Ok(())
}

#[instrument(skip(session, args))]
async fn cmd_modify<S: TaskStore>(session: &mut Session<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command modify");

    let Some((token, rest)) = args.split_first() else {
        bail!("modify requires a task id");
    };
    if rest.is_empty() {
        bail!("modify requires changes (title words or description:/deadline:/status: modifiers)");
    }

    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;
    let current = find_task(session.snapshot(), token)?;
    let draft = parse_draft_args(rest, Some(TaskDraft::from_task(&current)))?;

    let updated = session
        .edit(current.id, draft)
        .await
        .context("failed to update task")?;

    println!("Modified task {} \"{}\".", short_id(&updated), updated.title);
    Ok(())
}

#[instrument(skip(session, args))]
async fn cmd_delete<S: TaskStore>(session: &mut Session<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let [token] = args else {
        bail!("delete requires exactly one task id");
    };

    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;
    let id = resolve_id(session.snapshot(), token)?;

    session
        .delete(id)
        .await
        .context("failed to delete task")?;

    println!("Deleted task {}.", &id.to_string()[..8]);
    Ok(())
}

#[instrument(skip(session, args))]
async fn cmd_status<S: TaskStore>(session: &mut Session<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command status");

    let [token, status_token] = args else {
        bail!("usage: status <id> <pending|in-progress|completed>");
    };
    let target: Status = status_token.parse()?;

    change_status(session, token, target).await
}

#[instrument(skip(session, args))]
async fn cmd_transition<S: TaskStore>(
    session: &mut Session<S>,
    args: &[String],
    target: Status,
) -> anyhow::Result<()> {
    info!(status = %target, "command status shortcut");

    let [token] = args else {
        bail!("expected exactly one task id");
    };

    change_status(session, token, target).await
}

async fn change_status<S: TaskStore>(
    session: &mut Session<S>,
    token: &str,
    target: Status,
) -> anyhow::Result<()> {
    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;
    let current = find_task(session.snapshot(), token)?;

    // A task is never offered a transition to its own current status.
    if current.status == target {
        bail!("task {} is already {}", short_id(&current), target);
    }

    let updated = session
        .set_status(current.id, target)
        .await
        .context("failed to change task status")?;

    println!("Task {} is now {}.", short_id(&updated), updated.status);
    Ok(())
}

#[instrument(skip(session, renderer, args))]
async fn cmd_show<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command show");

    let [token] = args else {
        bail!("show requires exactly one task id");
    };

    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;
    let id = resolve_id(session.snapshot(), token)?;

    let task = session
        .fetch(id)
        .await
        .context("failed to fetch task")?;
    renderer.print_task_info(&task)?;
    Ok(())
}

#[instrument(skip(session, renderer))]
async fn cmd_stats<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    info!("command stats");

    session
        .refresh()
        .await
        .context("failed to fetch tasks")?;
    let view = session.view(&FilterState::default());
    renderer.print_counts(&view.counts)?;
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: taskflow [flags] <command> [args]");
    println!();
    println!("  list [terms] [status:<s>]      search and filter the task list");
    println!("  add <title> [modifiers]        create a task");
    println!("  modify <id> [title] [mods]     replace a task's fields");
    println!("  delete <id>                    delete a task");
    println!("  status <id> <s>                move a task to another status");
    println!("  done <id>                      shortcut for status <id> completed");
    println!("  start <id>                     shortcut for status <id> in-progress");
    println!("  show <id>                      print one task in full");
    println!("  stats                          print the summary counters");
    println!();
    println!("modifiers: description:<text> deadline:<YYYY-MM-DD|-> status:<s>");
    println!("ids may be abbreviated to any unique UUID prefix");
    Ok(())
}

/// Splits list arguments into search terms and an optional trailing
/// `status:` modifier; the remaining terms become the search query as-is.
fn parse_list_filter(args: &[String]) -> anyhow::Result<FilterState> {
    let mut status = StatusFilter::All;
    let mut terms: Vec<&str> = Vec::new();

    for arg in args {
        if let Some(value) = arg.strip_prefix("status:") {
            status = StatusFilter::parse(value)
                .ok_or_else(|| anyhow!("invalid status filter: {value}"))?;
        } else {
            terms.push(arg);
        }
    }

    Ok(FilterState {
        query: terms.join(" "),
        status,
    })
}

/// Builds a draft from bare title words plus `description:`/`deadline:`/
/// `status:` modifiers. With a base draft (modify), unmentioned fields keep
/// their current values and `deadline:-` clears the deadline.
fn parse_draft_args(args: &[String], base: Option<TaskDraft>) -> anyhow::Result<TaskDraft> {
    let mut draft = base.unwrap_or_default();
    let mut title_words: Vec<&str> = Vec::new();

    for arg in args {
        if let Some(value) = arg
            .strip_prefix("description:")
            .or_else(|| arg.strip_prefix("desc:"))
        {
            draft.description = value.to_string();
        } else if let Some(value) = arg.strip_prefix("deadline:") {
            draft.deadline = parse_deadline(value)?;
        } else if let Some(value) = arg.strip_prefix("status:") {
            draft.status = value.parse()?;
        } else {
            title_words.push(arg);
        }
    }

    if !title_words.is_empty() {
        draft.title = title_words.join(" ");
    }

    Ok(draft)
}

fn parse_deadline(value: &str) -> anyhow::Result<Option<NaiveDate>> {
    if value.is_empty() || value == "-" {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid deadline (expected YYYY-MM-DD): {value}"))?;
    Ok(Some(date))
}

/// A full UUID is taken at face value (the server decides whether it still
/// exists); anything shorter must match exactly one task in the snapshot.
fn resolve_id(snapshot: &[Task], token: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(token) {
        return Ok(id);
    }

    let needle = token.to_ascii_lowercase();
    let mut matches = snapshot
        .iter()
        .filter(|task| task.id.to_string().starts_with(&needle));

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id: {token}"))?;
    if matches.next().is_some() {
        bail!("ambiguous task id: {token}");
    }

    Ok(first.id)
}

fn find_task(snapshot: &[Task], token: &str) -> anyhow::Result<Task> {
    let id = resolve_id(snapshot, token)?;
    snapshot
        .iter()
        .find(|task| task.id == id)
        .cloned()
        .ok_or_else(|| anyhow!("no task matches id: {token}"))
}
