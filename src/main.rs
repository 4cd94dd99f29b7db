use anyhow::Context as _;
use chrono::Utc;
use std::io::{self, Read};

use wk::config::Config;
use wk::handle::{new_handle, HandleOption};
use wk::heartbeat::{Category, EntityType, HeartBeat};
use wk::iterext::IterExt;
use wk::language::BuiltinCatalog;
use wk::sender::jsonl::JsonLinesSender;
use wk::{filestats, filter, language, project};

fn env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("failed to get \"{}\" environment variable", key))
}

/// Reads a JSON array of heartbeats from stdin, enriches and filters them,
/// and writes the survivors to stdout as JSON lines.
fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let use_ansi = env("NO_COLOR").is_err();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(use_ansi)
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read heartbeats from stdin")?;

    let msg: Vec<HeartBeatJson> =
        serde_json::from_str(&input).context("failed to parse heartbeats")?;

    let user_agent = config.user_agent.clone();
    let heartbeats: Vec<HeartBeat> = msg
        .into_iter()
        .map(HeartBeat::from)
        .edit(move |h| {
            if h.user_agent.is_empty() {
                h.user_agent = user_agent.clone();
            }
        })
        .collect();

    let stdout = io::stdout();
    let sender = JsonLinesSender::new(stdout.lock());

    // project detection runs before filtering so unknown projects can be dropped
    let opts: Vec<HandleOption> = vec![
        project::with_detection(config.project),
        filter::with_filtering(config.filter),
        language::with_detection(config.language, BuiltinCatalog),
        filestats::with_detection(),
    ];

    let received = heartbeats.len();
    let mut handle = new_handle(sender, opts);
    let results = handle(heartbeats).context("failed to handle heartbeats")?;

    tracing::info!(received, sent = results.len(), "handled heartbeats");

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct HeartBeatJson {
    branch: Option<String>,
    category: Option<Category>,
    cursorpos: Option<i32>,
    #[serde(default)]
    dependencies: Vec<String>,
    entity: String,
    #[serde(rename = "type")]
    entity_type: Option<EntityType>,
    is_write: Option<bool>,
    language: Option<String>,
    lineno: Option<i32>,
    lines: Option<i32>,
    project: Option<String>,
    time: Option<f64>,
    user_agent: Option<String>,
}

impl From<HeartBeatJson> for HeartBeat {
    fn from(h: HeartBeatJson) -> Self {
        let time = h.time.unwrap_or_else(|| {
            let now = Utc::now();
            now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6
        });

        let entity_type = h.entity_type.unwrap_or(EntityType::File);

        // language and lines only describe files
        let (language, lines) = match entity_type {
            EntityType::File => (h.language, h.lines),
            EntityType::App | EntityType::Domain => (None, None),
        };

        HeartBeat {
            branch: h.branch,
            category: h.category.unwrap_or(Category::Coding),
            cursor_position: h.cursorpos,
            dependencies: h.dependencies,
            entity: h.entity,
            entity_type,
            is_write: h.is_write,
            language,
            line_number: h.lineno,
            lines,
            project: h.project,
            time,
            user_agent: h.user_agent.unwrap_or_default(),
        }
    }
}
