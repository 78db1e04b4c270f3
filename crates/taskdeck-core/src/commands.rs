use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::filter::{self, FilterMode};
use crate::remote::{self, PostBrowser};
use crate::render::Renderer;
use crate::store::TaskStore;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "done", "delete", "list", "stats", "posts", "config", "help", "version",
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

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();

    // Mutations refresh the counter line, whatever command drove them.
    let counts_renderer = renderer.clone();
    store.subscribe(move |tasks| {
        counts_renderer.print_counts(&filter::count_completed(tasks));
    });

    debug!(
        command = %inv.command,
        args = ?inv.command_args,
        "dispatching command"
    );

    match inv.command.as_str() {
        "add" => cmd_add(store, &inv.command_args, now),
        "done" => cmd_done(store, &inv.command_args),
        "delete" => cmd_delete(store, &inv.command_args),
        "list" => cmd_list(store, renderer, &inv.command_args),
        "stats" => cmd_stats(store, renderer),
        "posts" => cmd_posts(cfg, renderer, &inv.command_args),
        "config" => cmd_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, now))]
fn cmd_add(store: &mut TaskStore, args: &[String], now: DateTime<Utc>) -> anyhow::Result<()> {
    info!("command add");

    let title = args.join(" ");
    match store.add_task(&title, now) {
        Some(id) => println!("Created task {id}."),
        // A title that trims to nothing is dropped without complaint.
        None => debug!("add rejected empty title"),
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_done(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    let id = parse_id_arg(args, "done")?;
    if store.toggle_completed(id) {
        println!("Toggled task {id}.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &mut TaskStore, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id = parse_id_arg(args, "delete")?;
    if store.delete_task(id) {
        println!("Deleted task {id}.");
    } else {
        println!("No task with id {id}.");
    }
    Ok(())
}

#[instrument(skip(store, renderer, args))]
fn cmd_list(store: &TaskStore, renderer: &Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command list");

    let mode = match args.first() {
        Some(word) => word.parse::<FilterMode>()?,
        None => FilterMode::All,
    };

    let visible = filter::visible_tasks(store.tasks(), mode);
    debug!(?mode, visible = visible.len(), "rendering task list");

    renderer.print_task_table(&visible)?;
    renderer.print_counts(&filter::count_completed(store.tasks()));
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_stats(store: &TaskStore, renderer: &Renderer) -> anyhow::Result<()> {
    info!("command stats");

    renderer.print_counts(&filter::count_completed(store.tasks()));
    Ok(())
}

#[instrument(skip(cfg, renderer, args))]
fn cmd_posts(cfg: &Config, renderer: &Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command posts");

    let mut query = String::new();
    let mut page = 1usize;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--search" => {
                query = iter
                    .next()
                    .context("--search requires a value")?
                    .clone();
            }
            "--page" => {
                let raw = iter.next().context("--page requires a value")?;
                page = raw
                    .parse()
                    .with_context(|| format!("invalid page number: {raw}"))?;
            }
            other => return Err(anyhow!("unknown posts argument: {other}")),
        }
    }

    let url = cfg
        .get("posts.url")
        .unwrap_or_else(|| remote::DEFAULT_POSTS_URL.to_string());
    let page_size = cfg
        .get_usize("posts.page.size")?
        .unwrap_or(remote::DEFAULT_PAGE_SIZE);

    let mut browser = PostBrowser::new(page_size);
    browser.begin_fetch();
    browser.apply_fetch(remote::fetch_posts(&url).map_err(|err| format!("{err:#}")));

    if let Some(message) = browser.error() {
        // Fetch failures are an inline message, not a hard error.
        renderer.print_error(message);
        return Ok(());
    }

    browser.set_query(&query);
    browser.set_page(page);

    let visible = browser.visible();
    debug!(
        page = browser.page(),
        total_pages = browser.total_pages(),
        visible = visible.len(),
        "rendering posts"
    );
    renderer.print_post_table(&visible, browser.page(), browser.total_pages())?;
    Ok(())
}

#[instrument(skip(cfg))]
fn cmd_config(cfg: &Config) -> anyhow::Result<()> {
    info!("command config");

    let mut entries: Vec<(String, String)> = cfg
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    entries.sort();

    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: taskdeck [options] <command> [args]");
    println!();
    println!("commands:");
    println!("  add <title words>             create a task");
    println!("  done <id>                     toggle a task's completion flag");
    println!("  delete <id>                   remove a task");
    println!("  list [all|active|completed]   show tasks (default: all)");
    println!("  stats                         show completion counters");
    println!("  posts [--search <q>] [--page <n>]");
    println!("                                browse the remote post collection");
    println!("  config                        print effective configuration");
    println!("  help                          this text");
    println!("  version                       print version");
    Ok(())
}

fn parse_id_arg(args: &[String], command: &str) -> anyhow::Result<i64> {
    let raw = args
        .first()
        .with_context(|| format!("{command} requires a task id"))?;
    raw.parse::<i64>()
        .with_context(|| format!("invalid task id: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_names_and_unique_prefixes_expand() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("add", &known), Some("add"));
        assert_eq!(expand_command_abbrev("l", &known), Some("list"));
        assert_eq!(expand_command_abbrev("po", &known), Some("posts"));
        assert_eq!(expand_command_abbrev("do", &known), Some("done"));
        assert_eq!(expand_command_abbrev("de", &known), Some("delete"));
    }

    #[test]
    fn ambiguous_or_unknown_prefixes_do_not_expand() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("d", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }

    #[test]
    fn id_argument_parsing() {
        assert!(parse_id_arg(&[], "done").is_err());
        assert!(parse_id_arg(&["abc".to_string()], "done").is_err());
        assert_eq!(
            parse_id_arg(&["17".to_string()], "done").expect("parses"),
            17
        );
    }
}
