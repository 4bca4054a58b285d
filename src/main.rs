use anyhow::{anyhow, bail, Result};
use crossterm::style::Stylize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use clover_client::api::models::*;
use clover_client::config::Config;
use clover_client::logging::init_tracing;
use clover_client::query::{InfiniteQuery, QueryClient};
use clover_client::{ApiClient, Hooks};

mod table_display;

use table_display::{display_feed, display_groups, display_user, display_users};

type CloverHooks = Hooks<ApiClient>;

fn print_help() {
    println!("{}", "Clover - command line client for the Clover network".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  clover [--token TOKEN] <COMMAND> [ARGS]");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}     - Bearer token (or set CLOVER_TOKEN)", "--token".green());
    println!(
        "  {} - Print a commented config file",
        "--generate-config".green()
    );
    println!("  {}      - Show this help", "--help".green());
    println!();
    println!("{}", "Commands:".yellow());
    println!(
        "  {}  - Log in and print the access token",
        "login <email> <password>".green()
    );
    println!("  {}                 - End the session for a token", "logout [token]".green());
    println!("  {}                              - Show your profile", "me".green());
    println!("  {}                - Find users", "search <keyword>".green());
    println!(
        "  {}                     - Search as you type, one keyword per line",
        "search-live".green()
    );
    println!(
        "  {}  - Show the news feed or a group's feed",
        "feed [--group ID] [--pages N]".green()
    );
    println!("  {}                          - List all groups", "groups".green());
    println!("  {}                        - Show one group", "group <id>".green());
    println!("  {}      - Post to a group", "post <group-id> <content>".green());
    println!("  {}    - Comment on a post", "comment <post-id> <content>".green());
    println!("  {} - Create a group", "create-group <name> [description]".green());
    println!("  {}                   - Upload an image", "upload <file>".green());
    println!();
}

/// Pull `flag VALUE` out of `args`, returning the value
fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    if pos + 1 >= args.len() {
        args.remove(pos);
        return None;
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Some(value)
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{}>", name))
}

fn rest(args: &[String], from: usize, name: &str) -> Result<String> {
    if args.len() <= from {
        bail!("missing <{}>", name);
    }
    Ok(args[from..].join(" "))
}

fn report<T>(response: &ApiResponse<T>) {
    match &response.message {
        Some(message) => println!("{} {}", "OK".green(), message),
        None => println!("{}", "OK".green()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|a| a == "--generate-config") {
        print!("{}", Config::create_default_with_comments());
        return Ok(());
    }

    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    let token = take_flag(&mut args, "--token").or_else(|| std::env::var("CLOVER_TOKEN").ok());

    let mut api = ApiClient::from_config(&config.api)?;
    if let Some(token) = token {
        api = api.with_token(token);
    }
    let hooks = Hooks::with_client(
        Arc::new(api),
        QueryClient::with_defaults(config.query.defaults()),
    )
    .with_search_delay(config.search.debounce_delay());

    if let Err(e) = run(&hooks, args).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(hooks: &CloverHooks, mut args: Vec<String>) -> Result<()> {
    let command = args.remove(0);

    match command.as_str() {
        "login" => {
            let body = LoginRequest {
                email: arg(&args, 0, "email")?.to_string(),
                password: arg(&args, 1, "password")?.to_string(),
            };
            let response = hooks.post_login().mutate(body).await?;
            match response.data.and_then(|d| d.token) {
                Some(token) => println!("{}", token),
                None => report(&ApiResponse::<()> {
                    code: response.code,
                    message: response.message,
                    data: None,
                }),
            }
        }
        "logout" => {
            let token = match args.first() {
                Some(token) => token.clone(),
                None => hooks
                    .api()
                    .access_token()
                    .ok_or_else(|| anyhow!("no token given; pass one or use --token"))?,
            };
            report(&hooks.delete_logout().mutate(token).await?);
        }
        "me" => {
            if let Some(user) = hooks.get_user_info(None).await?.and_then(|r| r.data) {
                display_user(&user);
            }
        }
        "search" => {
            let keyword = rest(&args, 0, "keyword")?;
            let users = hooks
                .get_search_user_info(&keyword, None)
                .await?
                .and_then(|r| r.data)
                .unwrap_or_default();
            display_users(&users);
        }
        "search-live" => search_live(hooks).await?,
        "feed" => {
            let group = take_flag(&mut args, "--group");
            let pages: usize = match take_flag(&mut args, "--pages") {
                Some(n) => n.parse().map_err(|_| anyhow!("--pages takes a number"))?,
                None => 1,
            };
            let mut query = match &group {
                Some(group_id) => hooks.get_list_feed_of_group(group_id).await?,
                None => hooks.get_list_feed().await?,
            };
            load_pages(&mut query, pages).await?;

            let posts: Vec<FeedItem> = query
                .pages()
                .iter()
                .filter_map(|page| page.data.clone())
                .flatten()
                .collect();
            display_feed(&posts);
            if query.has_next_page() {
                println!("{}", "More posts available (--pages)".dark_grey());
            }
        }
        "groups" => {
            let groups = hooks
                .get_list_all_group(None)
                .await?
                .and_then(|r| r.data)
                .unwrap_or_default();
            display_groups(&groups);
        }
        "group" => {
            let id = arg(&args, 0, "id")?;
            if let Some(group) = hooks.get_group_info(id, None).await?.and_then(|r| r.data) {
                display_groups(std::slice::from_ref(&group));
            }
        }
        "post" => {
            let body = FeedPostRequest {
                to_group_id: arg(&args, 0, "group-id")?.to_string(),
                content: rest(&args, 1, "content")?,
                privacy_type: None,
                image_urls: None,
            };
            report(&hooks.post_feed().mutate(body).await?);
        }
        "comment" => {
            let body = FeedCommentRequest {
                post_id: arg(&args, 0, "post-id")?.to_string(),
                content: rest(&args, 1, "content")?,
                parent_id: None,
            };
            report(&hooks.post_comment().mutate(body).await?);
        }
        "create-group" => {
            let body = CreateGroupRequest {
                name: arg(&args, 0, "name")?.to_string(),
                description: args.get(1..).filter(|d| !d.is_empty()).map(|d| d.join(" ")),
                avatar_img_url: None,
                banner_img_url: None,
                group_privacy: None,
            };
            let response = hooks.post_create_group().mutate(body).await?;
            match response.data {
                Some(group) => display_groups(&[group]),
                None => report(&response),
            }
        }
        "upload" => {
            let path = Path::new(arg(&args, 0, "file")?);
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = ImageUpload::content_type_for(&file_name);
            let upload = ImageUpload::new(file_name, content_type, bytes);

            let response = hooks.post_image().mutate(upload).await?;
            match response.data.and_then(|d| d.url) {
                Some(url) => println!("{}", url),
                None => println!("{}", "Uploaded".green()),
            }
        }
        other => {
            print_help();
            bail!("unknown command '{}'", other);
        }
    }

    Ok(())
}

async fn load_pages(query: &mut InfiniteQuery<FeedPage>, wanted: usize) -> Result<()> {
    while query.pages().len() < wanted {
        if query.fetch_next_page().await?.is_none() {
            break;
        }
    }
    Ok(())
}

/// Read keywords from stdin and search once typing settles
async fn search_live(hooks: &CloverHooks) -> Result<()> {
    println!("{}", "Type a keyword per line, Ctrl+D to stop".dark_grey());

    let mut keyword = hooks.debounced_keyword("");
    let mut settled = keyword.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => keyword.set(line.trim().to_string()),
                None => break,
            },
            changed = settled.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = settled.borrow_and_update().clone();
                match hooks.get_search_user_info(&current, None).await {
                    Ok(Some(response)) => display_users(&response.data.unwrap_or_default()),
                    Ok(None) => {}
                    Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
                }
            }
        }
    }

    Ok(())
}
