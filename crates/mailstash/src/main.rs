//! mailstash CLI: mirror an IMAP inbox into a local JSON cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mailstash_core::{
    CacheStore, DEFAULT_CACHE_PATH, DEFAULT_FETCH_WINDOW, EmailMessage, ImapConfig, JsonFileStore,
    MailCache, OpenAiAssistant, count, sort_ascending, sort_descending, take_first,
};

const BRIEF_INSTRUCTIONS: &str = "You are given a batch of emails. Summarize them briefly: who \
wrote, what they want, and anything time-sensitive. Answer in plain text.";

#[derive(Parser)]
#[command(name = "mailstash", version, about = "Mirror an IMAP inbox into a local JSON cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch new messages from the server into the local cache
    Fetch {
        /// IMAP server hostname
        #[arg(long, env = "MAILSTASH_IMAP_HOST")]
        host: String,

        /// IMAP server port (implicit TLS)
        #[arg(long, env = "MAILSTASH_IMAP_PORT", default_value_t = 993)]
        port: u16,

        /// IMAP account username
        #[arg(long, env = "MAILSTASH_IMAP_USERNAME")]
        username: String,

        /// How many of the most recent messages to consider
        #[arg(long, default_value_t = DEFAULT_FETCH_WINDOW)]
        window: u32,

        /// Cache document path
        #[arg(long, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,
    },
    /// List cached messages, sorted by date
    List {
        /// Cache document path
        #[arg(long, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,

        /// Newest first instead of oldest first
        #[arg(long)]
        descending: bool,

        /// Show at most this many messages
        #[arg(long)]
        take: Option<usize>,
    },
    /// Print the number of cached messages
    Count {
        /// Cache document path
        #[arg(long, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,
    },
    /// Ask an LLM assistant for a digest of the most recent cached mail
    Brief {
        /// Cache document path
        #[arg(long, default_value = DEFAULT_CACHE_PATH)]
        cache: PathBuf,

        /// How many of the most recent messages to include
        #[arg(long, default_value_t = 10)]
        take: usize,

        /// Model name for the chat-completions provider
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Override the chat-completions endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Fetch {
            host,
            port,
            username,
            window,
            cache,
        } => fetch(host, port, username, window, cache).await,
        Command::List {
            cache,
            descending,
            take,
        } => list(cache, descending, take).await,
        Command::Count { cache } => {
            let messages = JsonFileStore::new(cache).load().await?;
            println!("{}", count(&messages));
            Ok(())
        }
        Command::Brief {
            cache,
            take,
            model,
            endpoint,
        } => brief(cache, take, model, endpoint).await,
    }
}

async fn fetch(
    host: String,
    port: u16,
    username: String,
    window: u32,
    cache: PathBuf,
) -> Result<()> {
    let password = std::env::var("MAILSTASH_IMAP_PASSWORD")
        .context("MAILSTASH_IMAP_PASSWORD is not set")?;
    let config = ImapConfig {
        host,
        port,
        username,
        password,
    };

    let cache = MailCache::new(JsonFileStore::new(cache)).with_window(window);
    let messages = cache.fetch_all(&config).await?;
    println!("{} messages in cache", messages.len());
    Ok(())
}

async fn list(cache: PathBuf, descending: bool, take: Option<usize>) -> Result<()> {
    let messages = JsonFileStore::new(cache).load().await?;
    let sorted = if descending {
        sort_descending(&messages)
    } else {
        sort_ascending(&messages)
    };
    let shown = take.map_or(sorted.clone(), |n| take_first(&sorted, n));

    for message in &shown {
        print_line(message);
    }
    if shown.len() < sorted.len() {
        println!("... and {} more", sorted.len() - shown.len());
    }
    Ok(())
}

fn print_line(message: &EmailMessage) {
    let date = if message.date.is_empty() {
        "(no date)"
    } else {
        &message.date
    };
    println!("{date}  {}  {}", message.from, message.subject);
}

async fn brief(
    cache: PathBuf,
    take: usize,
    model: String,
    endpoint: Option<String>,
) -> Result<()> {
    let messages = JsonFileStore::new(cache).load().await?;
    if messages.is_empty() {
        println!("cache is empty; run `mailstash fetch` first");
        return Ok(());
    }

    let recent = take_first(&sort_descending(&messages), take);
    let mut context = String::new();
    for message in &recent {
        context.push_str(&format!(
            "From: {}\nDate: {}\nSubject: {}\n\n{}\n---\n",
            message.from, message.date, message.subject, message.body
        ));
    }

    let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
    let mut assistant = OpenAiAssistant::new(api_key).with_model(model);
    if let Some(endpoint) = endpoint {
        assistant = assistant.with_endpoint(endpoint);
    }

    let digest = mailstash_core::Assistant::advise(&assistant, BRIEF_INSTRUCTIONS, &context).await?;
    println!("{digest}");
    Ok(())
}
