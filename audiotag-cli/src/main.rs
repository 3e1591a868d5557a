//! A thin CLI over [`audiotag::extract`]: reads one audio file, prints the
//! requested tags as JSON.

use std::collections::BTreeMap;
use std::process::ExitCode;

use audiotag::{RequestedTags, TagKey, TagValue, TaggedFile};
use clap::Parser;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "audiotag", about = "Extract tags from a FLAC, MP3, or MP4/M4A file")]
struct Args {
    /// Path to the audio file (.flac, .mp3, .m4a, .mp4)
    path: String,

    /// Comma-separated tag keys to extract (default: all seven)
    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Output {
    file_type: String,
    format: String,
    metadata: BTreeMap<String, serde_json::Value>,
}

fn requested_tags(tags: &Option<Vec<String>>) -> anyhow::Result<RequestedTags> {
    match tags {
        None => Ok(TagKey::ALL.into_iter().collect()),
        Some(names) => names
            .iter()
            .map(|name| {
                TagKey::from_str(name.trim())
                    .ok_or_else(|| anyhow::anyhow!("unknown tag key: {name}"))
            })
            .collect(),
    }
}

fn to_output(tagged: TaggedFile) -> Output {
    let metadata = tagged
        .metadata
        .into_iter()
        .map(|(key, value)| {
            let json = match value {
                Some(TagValue::Text(text)) => serde_json::Value::String(text),
                Some(TagValue::Integer(n)) => serde_json::Value::Number(n.into()),
                None => serde_json::Value::Null,
            };
            (key.as_str().to_string(), json)
        })
        .collect();
    Output { file_type: tagged.file_type, format: tagged.format, metadata }
}

async fn run(args: Args) -> anyhow::Result<Output> {
    let requested = requested_tags(&args.tags)?;
    let provider = audiotag_provider::LocalFileProvider::new();
    let tagged = audiotag::extract(&provider, &args.path, &requested).await?;
    Ok(to_output(tagged))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match run(args).await {
        Ok(output) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).expect("Output always serializes")
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
