//! The `imgshift transform` command.
//!
//! Registers a local file as an image owned by the invoking user, runs the
//! same handler a server would, and prints the JSON response.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use imgshift::{
    Config, FsStorage, HttpFetcher, ImageRepository, InMemoryImageRepository, ObjectStorage,
    TransformHandler,
};

/// User id the CLI acts as.
const CLI_USER: u64 = 1;

/// Arguments for the `transform` command.
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Image to transform (JPEG, PNG or GIF)
    pub input: PathBuf,

    /// Request body as JSON, or @FILE to read it from a file
    #[arg(short, long, default_value = "{}")]
    pub request: String,

    /// Storage root, overriding `storage.root_dir`
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Execute the transform command.
pub fn execute(args: TransformArgs, mut config: Config) -> anyhow::Result<ExitCode> {
    if let Some(root) = args.root {
        config.storage.root_dir = root;
    }

    let body = read_request(&args.request)?;

    let storage = Arc::new(FsStorage::new(
        config.storage.root_dir.clone(),
        config.storage.base_url.clone(),
    ));
    let key = register_source(&storage, &args.input)?;

    let records = Arc::new(InMemoryImageRepository::new());
    let record = records.insert(CLI_USER, &key);
    tracing::debug!(id = record.id, key = %key, "registered source image");

    let fetcher = HttpFetcher::new(&config.fetch).context("Failed to build watermark fetcher")?;
    let handler = TransformHandler::new(&config, storage, records, Arc::new(fetcher));

    let response = handler.handle(CLI_USER, record.id, body.as_bytes());
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.status == 200 {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::debug!(status = response.status, "transform failed");
        Ok(ExitCode::FAILURE)
    }
}

fn read_request(arg: &str) -> anyhow::Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path)),
        None => Ok(arg.to_string()),
    }
}

/// Storage key for the input. Files already under the storage root are used
/// in place; anything else is copied to `uploads/`.
fn register_source(storage: &FsStorage, input: &Path) -> anyhow::Result<String> {
    let input = input
        .canonicalize()
        .with_context(|| format!("Input not found: {}", input.display()))?;

    if let Ok(root) = storage.root().canonicalize() {
        if let Ok(relative) = input.strip_prefix(&root) {
            if let Some(key) = relative.to_str() {
                return Ok(key.replace(std::path::MAIN_SEPARATOR, "/"));
            }
        }
    }

    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .context("Input file name is not valid UTF-8")?;
    let key = format!("uploads/{}", name);
    let bytes = std::fs::read(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    storage.put(&key, &bytes)?;
    Ok(key)
}
