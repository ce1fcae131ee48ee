//! Purpose: Hold top-level CLI command dispatch for `redlist`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `fetch` prints either one JSON document or one JSON line per link.
//! Invariants: Links fetched before a failing page are printed before the error is reported.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    config: &ClientConfig,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "redlist", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Locator {
            subreddit,
            sort,
            after,
        } => {
            let subreddit = normalize_subreddit(subreddit.as_deref())?;
            let mut list = LinkList::new(subreddit, sort);
            if let Some(after) = after {
                list.push(redlist::api::Link {
                    id: Some(after),
                    ..Default::default()
                });
            }
            let transport = config.transport()?;
            let client = ListingClient::new(transport);
            let url = client.transport().url_for(&client.locator(&list))?;
            println!("{url}");
            Ok(RunOutcome::ok())
        }
        Command::Fetch {
            subreddit,
            sort,
            pages,
            format,
        } => {
            if pages == 0 {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--pages must be at least 1"));
            }
            let subreddit = normalize_subreddit(subreddit.as_deref())?;
            let mut list = LinkList::new(subreddit, sort);
            let client = ListingClient::new(config.transport()?);
            let fetched = client.fetch_pages(&mut list, pages);
            if fetched.is_ok() || !list.is_empty() {
                emit_links(&list, format);
            }
            fetched?;
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_links(list: &LinkList, format: OutputFormat) {
    match format {
        OutputFormat::Pretty => emit_json(link_json::link_list_json(list)),
        OutputFormat::Jsonl => {
            for link in list {
                let line = serde_json::to_string(&link_json::link_json(link))
                    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
                println!("{line}");
            }
        }
    }
}
