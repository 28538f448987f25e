//! CLI command handlers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use framehost::decode::describe;
use framehost::replay::{Entry, Replay};
use framehost_host::{EmbedRequest, HostConfig};
use serde_json::json;
use tracing::info;

use crate::cli::Commands;

/// Execute a CLI command.
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Decode { raw } => cmd_decode(&raw),
        Commands::Replay {
            script,
            config,
            json,
        } => cmd_replay(&script, config.as_deref(), json),
        Commands::Embed {
            parent_url,
            root_url,
            widget_id,
            api_key,
            widget_type,
            account_id,
            no_lightbox,
            config,
        } => {
            let request = EmbedRequest {
                widget_id,
                api_key,
                widget_type,
                account_id,
                lightbox: no_lightbox.then_some(false),
                ..EmbedRequest::default()
            };
            cmd_embed(&request, &root_url, &parent_url, config.as_deref())
        }
    }
}

fn cmd_decode(raw: &str) -> Result<()> {
    let value = describe(raw).with_context(|| format!("Could not decode {raw:?}"))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<HostConfig> {
    match path {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(HostConfig::default()),
    }
}

fn cmd_embed(
    request: &EmbedRequest,
    root_url: &str,
    parent_url: &str,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let embed = request
        .build(root_url, parent_url, &config.widget_id_marker)
        .context("Could not build widget embed")?;
    let value = json!({ "id": embed.id.as_str(), "src": embed.src.as_str() });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_replay(script: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let source = read_script(script)?;

    let mut replay = Replay::new(config);
    let transcript = replay
        .run_script(&source)
        .with_context(|| format!("Replay of {} stopped", script.display()))?;
    info!(entries = transcript.len(), "Replay finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        for entry in &transcript {
            println!("{}", render(entry));
        }
    }
    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))
}

fn render(entry: &Entry) -> String {
    match entry {
        Entry::Outcome { line, outcome } => format!("[{line}] {outcome}"),
        Entry::Post { frame, message } => format!("  -> {frame}: {message}"),
        Entry::ParentPost { message } => format!("  -> parent: {message}"),
        Entry::Style {
            frame,
            property,
            value,
        } => format!("  {frame}.style.{property} = {value}"),
        Entry::Removed { frame } => format!("  {frame} removed"),
        Entry::Callback { name, detail } => format!("  {name}({detail})"),
        Entry::Scroll { x, y } => format!("  scroll to {x},{y}"),
        Entry::Unhandled { error } => format!("  unhandled: {error}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_replay_reads_script_and_config_files() {
        let mut script = NamedTempFile::new().unwrap();
        writeln!(
            script,
            r#"{{"step":"register","id":"w1","src":"https://widgets.pixlee.com/w"}}"#
        )
        .unwrap();
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "load_more_throttle_ms = 250").unwrap();

        assert!(cmd_replay(script.path(), Some(config.path()), true).is_ok());
    }

    #[test]
    fn test_replay_reports_missing_and_invalid_inputs() {
        let missing = Path::new("/nonexistent/framehost/script.jsonl");
        let err = cmd_replay(missing, None, false).unwrap_err();
        assert!(err.to_string().contains("Failed to read script"));

        let script = NamedTempFile::new().unwrap();
        let mut config = NamedTempFile::new().unwrap();
        writeln!(config, "load_more_ratio = \"lots\"").unwrap();
        let err = cmd_replay(script.path(), Some(config.path()), false).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_embed_needs_a_widget() {
        let root = "https://instafeed.pixlee.com/widget";
        let named = EmbedRequest {
            widget_id: Some("42".to_string()),
            ..EmbedRequest::default()
        };
        assert!(cmd_embed(&named, root, "https://shop.example.com/", None).is_ok());

        let err = cmd_embed(&EmbedRequest::default(), root, "https://shop.example.com/", None)
            .unwrap_err();
        assert!(err.to_string().contains("Could not build widget embed"));
    }

    #[test]
    fn test_render_lines() {
        assert_eq!(
            render(&Entry::Outcome {
                line: 2,
                outcome: "handled".to_string()
            }),
            "[2] handled"
        );
        assert_eq!(
            render(&Entry::Style {
                frame: "f1".to_string(),
                property: "height".to_string(),
                value: "500px".to_string()
            }),
            "  f1.style.height = 500px"
        );
    }
}
