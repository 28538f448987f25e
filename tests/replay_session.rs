//! Integration tests for scripted replay sessions.
//!
//! Scripts are written to disk and read back the way the CLI does, then run
//! against a fresh in-memory page.

#![allow(clippy::panic)]

use std::fs;
use std::io::Write;

use framehost::decode::describe;
use framehost::replay::{Entry, Replay};
use framehost_host::HostConfig;
use serde_json::json;
use tempfile::NamedTempFile;

fn unwrap_result<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{context}: {err}"),
    }
}

fn script_file(lines: &[&str]) -> NamedTempFile {
    let mut file = unwrap_result(NamedTempFile::new(), "create script");
    for line in lines {
        unwrap_result(writeln!(file, "{line}"), "write script");
    }
    file
}

fn run_file(file: &NamedTempFile, config: HostConfig) -> Vec<Entry> {
    let source = unwrap_result(fs::read_to_string(file.path()), "read script");
    let mut replay = Replay::new(config);
    unwrap_result(replay.run_script(&source), "run script")
}

fn posts_to(transcript: &[Entry], frame: &str) -> Vec<String> {
    transcript
        .iter()
        .filter_map(|entry| match entry {
            Entry::Post { frame: to, message } if to == frame => Some(message.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Size channel
// ============================================================================

#[test]
fn test_registration_sends_handshake_and_init_applies_size() {
    // GIVEN: a frame registered with a minimum height
    let file = script_file(&[
        r#"{"step":"register","id":"f1","src":"https://a.example.com/x","options":{"minHeight":200}}"#,
        r#"{"step":"message","data":"[iFrameSizer]f1:120:300:init","origin":"https://a.example.com"}"#,
    ]);

    // WHEN: the script runs
    let transcript = run_file(&file, HostConfig::default());

    // THEN: the handshake went out and init applied the raised height at once
    let posts = posts_to(&transcript, "f1");
    assert!(
        posts.iter().any(|message| message.starts_with("[iFrameSizer]f1:")),
        "handshake missing: {posts:?}"
    );
    assert!(transcript.contains(&Entry::Style {
        frame: "f1".to_string(),
        property: "height".to_string(),
        value: "200px".to_string(),
    }));
    assert!(transcript.contains(&Entry::Callback {
        name: "init".to_string(),
        detail: json!({"frameId": "f1"}),
    }));
}

#[test]
fn test_handshake_decodes_back_to_fields() {
    // GIVEN: the handshake a default registration produces
    let file = script_file(&[r#"{"step":"register","id":"f1","src":"https://a.example.com/x"}"#]);
    let transcript = run_file(&file, HostConfig::default());
    let posts = posts_to(&transcript, "f1");
    let Some(handshake) = posts.first() else {
        panic!("no handshake in {transcript:?}");
    };

    // WHEN: it is decoded
    let value = unwrap_result(describe(handshake), "decode handshake");

    // THEN: it reads as a host-to-frame init for f1
    assert_eq!(value.get("direction"), Some(&json!("host-to-frame")));
    assert_eq!(value.get("frameId"), Some(&json!("f1")));
}

// ============================================================================
// Event channel
// ============================================================================

#[test]
fn test_widget_relay_reaches_every_widget() {
    // GIVEN: two widget frames and a lightbox
    let file = script_file(&[
        r#"{"step":"frame","id":"pixlee_widget_iframe_a","src":"https://widgets.pixlee.com/a"}"#,
        r#"{"step":"frame","id":"pixlee_widget_iframe_b","src":"https://widgets.pixlee.com/b"}"#,
        r#"{"step":"frame","id":"pixlee_lightbox_iframe","src":"https://widgets.pixlee.com/l"}"#,
        r#"{"step":"message","data":"{\"name\":\"pixlee:x\",\"type\":\"relay\",\"destination\":\"widget\"}","origin":"https://widgets.pixlee.com"}"#,
    ]);

    // WHEN: a widget-bound relay arrives
    let transcript = run_file(&file, HostConfig::default());

    // THEN: both widgets receive it and the lightbox does not
    assert!(transcript.contains(&Entry::Outcome {
        line: 4,
        outcome: "relayed to 2".to_string(),
    }));
    assert_eq!(posts_to(&transcript, "pixlee_widget_iframe_a").len(), 1);
    assert_eq!(posts_to(&transcript, "pixlee_widget_iframe_b").len(), 1);
    assert!(posts_to(&transcript, "pixlee_lightbox_iframe").is_empty());
}

#[test]
fn test_config_file_changes_namespace() {
    // GIVEN: a config that renames the namespace
    let mut config_file = unwrap_result(NamedTempFile::new(), "create config");
    unwrap_result(writeln!(config_file, "namespace = \"acme:\""), "write config");
    let config = unwrap_result(HostConfig::load(config_file.path()), "load config");

    let file = script_file(&[
        r#"{"step":"frame","id":"pixlee_widget_iframe_a","src":"https://widgets.pixlee.com/a"}"#,
        r#"{"step":"message","data":"{\"name\":\"pixlee:x\",\"type\":\"relay\",\"destination\":\"widget\"}","origin":"https://evil.example.com"}"#,
        r#"{"step":"message","data":"{\"name\":\"acme:x\",\"type\":\"relay\",\"destination\":\"widget\"}","origin":"https://evil.example.com"}"#,
    ]);

    // WHEN: untrusted senders post under each prefix
    let transcript = run_file(&file, config);

    // THEN: only the configured namespace is accepted
    assert!(transcript.contains(&Entry::Outcome {
        line: 2,
        outcome: "ignored".to_string(),
    }));
    assert!(transcript.contains(&Entry::Outcome {
        line: 3,
        outcome: "relayed to 1".to_string(),
    }));
}
