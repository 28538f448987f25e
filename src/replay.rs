//! Scripted sessions against the in-memory page.
//!
//! A script is JSON lines, one step per line:
//!
//! ```text
//! {"step":"register","id":"f1","src":"https://a.example.com/x","options":{"maxHeight":500}}
//! {"step":"message","data":"[iFrameSizer]f1:900:0:interval","origin":"https://a.example.com"}
//! {"step":"animation_frame"}
//! ```
//!
//! Running a step yields the transcript entries it produced: outbound posts,
//! style changes, callbacks, page scrolls and surfaced errors.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use framehost_core::Position;
use framehost_host::{
    Callbacks, FrameElement, FrameOptions, HostConfig, HostController, InboundMessage,
    MemoryFrame, MemoryPage, MessageOutcome, RelayOutcome, Target,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// Style properties reported in the transcript.
const WATCHED_STYLES: [&str; 5] = ["height", "width", "display", "position", "z-index"];

fn default_origin() -> String {
    "null".to_string()
}

fn default_tag() -> String {
    "iframe".to_string()
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Add an element to the page without registering it.
    Frame {
        id: String,
        #[serde(default)]
        src: String,
        #[serde(default = "default_tag")]
        tag: String,
    },
    /// Add the element if needed, then register it. Without an `id` the
    /// controller assigns one.
    Register {
        #[serde(default)]
        id: String,
        #[serde(default)]
        src: String,
        #[serde(default = "default_tag")]
        tag: String,
        #[serde(default)]
        options: Value,
    },
    /// Deliver a transport string, optionally from a frame's content window.
    Message {
        data: String,
        #[serde(default = "default_origin")]
        origin: String,
        #[serde(default)]
        from: Option<String>,
    },
    Loaded {
        id: String,
    },
    AnimationFrame,
    Timers {
        #[serde(default)]
        now_ms: u64,
    },
    /// Move the page and deliver a scroll event.
    Scroll {
        #[serde(default)]
        now_ms: u64,
        #[serde(default)]
        x: i64,
        #[serde(default)]
        y: i64,
    },
    Close {
        id: String,
    },
}

/// One observable effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Entry {
    Outcome { line: usize, outcome: String },
    Post { frame: String, message: String },
    ParentPost { message: String },
    Style { frame: String, property: String, value: String },
    Removed { frame: String },
    Callback { name: String, detail: Value },
    Scroll { x: i64, y: i64 },
    Unhandled { error: String },
}

#[derive(Debug)]
struct Tracked {
    element: MemoryFrame,
    styles: BTreeMap<&'static str, String>,
    attached: bool,
}

/// A replay session: a controller over a fresh [`MemoryPage`].
pub struct Replay {
    host: HostController<MemoryPage>,
    page: MemoryPage,
    frames: BTreeMap<String, Tracked>,
    callbacks: Rc<RefCell<Vec<Entry>>>,
    seen_parent_posts: usize,
    seen_scrolls: usize,
    seen_unhandled: usize,
}

impl Replay {
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        let page = MemoryPage::new();
        let mut host = HostController::new(page.clone(), config);
        host.init();
        Self {
            host,
            page,
            frames: BTreeMap::new(),
            callbacks: Rc::default(),
            seen_parent_posts: 0,
            seen_scrolls: 0,
            seen_unhandled: 0,
        }
    }

    /// Parse and run a whole script. Blank lines and `#` comments are skipped.
    ///
    /// # Errors
    ///
    /// Fails on the first line that is not a valid step, or on a step that
    /// names an element the session does not know.
    pub fn run_script(&mut self, script: &str) -> Result<Vec<Entry>> {
        let mut transcript = Vec::new();
        for (index, line) in script.lines().enumerate() {
            let line_no = index.saturating_add(1);
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let step: Step = serde_json::from_str(trimmed)
                .with_context(|| format!("line {line_no}: not a replay step"))?;
            let entries = self
                .run_step(line_no, step)
                .with_context(|| format!("line {line_no}: step failed"))?;
            transcript.extend(entries);
        }
        Ok(transcript)
    }

    /// Run one step and collect what it changed.
    ///
    /// # Errors
    ///
    /// Fails when the step names an unknown element or the controller
    /// rejects a registration, reload or close.
    pub fn run_step(&mut self, line: usize, step: Step) -> Result<Vec<Entry>> {
        debug!(line, ?step, "Replaying step");
        let outcome = match step {
            Step::Frame { id, src, tag } => {
                self.add_element(&tag, &id, &src);
                "added".to_string()
            }
            Step::Register {
                id,
                src,
                tag,
                options,
            } => self.register(&id, &src, &tag, &options)?,
            Step::Message { data, origin, from } => {
                let mut message = InboundMessage::new(data, origin);
                if let Some(sender) = from {
                    let element = self.element(&sender)?;
                    message = message.from_window(element.window());
                }
                describe_outcome(&self.host.handle_message(message))
            }
            Step::Loaded { id } => {
                self.host.frame_loaded(&id)?;
                "loaded".to_string()
            }
            Step::AnimationFrame => format!("ran {}", self.host.run_animation_frame()),
            Step::Timers { now_ms } => format!("ran {}", self.host.run_timers(now_ms)),
            Step::Scroll { now_ms, x, y } => {
                self.page.set_scroll(Position::new(x, y));
                self.host.page_scrolled(now_ms);
                "scrolled".to_string()
            }
            Step::Close { id } => {
                self.host.close_frame(&id)?;
                "closed".to_string()
            }
        };

        let mut entries = vec![Entry::Outcome { line, outcome }];
        entries.extend(self.collect());
        Ok(entries)
    }

    fn add_element(&mut self, tag: &str, id: &str, src: &str) -> MemoryFrame {
        let element = self.page.add_element(tag, id, src);
        self.frames.insert(
            id.to_string(),
            Tracked {
                element: element.clone(),
                styles: BTreeMap::new(),
                attached: true,
            },
        );
        element
    }

    fn element(&self, id: &str) -> Result<MemoryFrame> {
        self.frames
            .get(id)
            .map(|tracked| tracked.element.clone())
            .ok_or_else(|| anyhow!("no element with id {id:?} in this session"))
    }

    fn register(&mut self, id: &str, src: &str, tag: &str, options: &Value) -> Result<String> {
        let element = match self.frames.get(id) {
            Some(tracked) => tracked.element.clone(),
            None => self.add_element(tag, id, src),
        };
        let options = FrameOptions::from_json(options)?;
        let handles = self.host.register(
            options,
            Target::Element(element.clone()),
            recording_callbacks(&self.callbacks),
        )?;
        let assigned = element.id();
        if assigned != id {
            if let Some(tracked) = self.frames.remove(id) {
                self.frames.insert(assigned, tracked);
            }
        }
        Ok(format!("registered {}", handles.len()))
    }

    /// Drain everything observable since the last call.
    fn collect(&mut self) -> Vec<Entry> {
        let mut entries = Vec::new();

        for (id, tracked) in &mut self.frames {
            for message in tracked.element.messages() {
                entries.push(Entry::Post {
                    frame: id.clone(),
                    message,
                });
            }
            tracked.element.clear_messages();

            for property in WATCHED_STYLES {
                let Some(value) = tracked.element.style(property) else {
                    continue;
                };
                if tracked.styles.get(property) != Some(&value) {
                    tracked.styles.insert(property, value.clone());
                    entries.push(Entry::Style {
                        frame: id.clone(),
                        property: property.to_string(),
                        value,
                    });
                }
            }

            if tracked.attached && !tracked.element.is_attached() {
                tracked.attached = false;
                entries.push(Entry::Removed { frame: id.clone() });
            }
        }

        let parent_posts = self.page.parent_posts();
        entries.extend(
            parent_posts
                .iter()
                .skip(self.seen_parent_posts)
                .map(|message| Entry::ParentPost {
                    message: message.clone(),
                }),
        );
        self.seen_parent_posts = parent_posts.len();

        entries.append(&mut self.callbacks.borrow_mut());

        let scrolls = self.page.scroll_history();
        entries.extend(
            scrolls
                .iter()
                .skip(self.seen_scrolls)
                .map(|position| Entry::Scroll {
                    x: position.x,
                    y: position.y,
                }),
        );
        self.seen_scrolls = scrolls.len();

        let unhandled = self.page.unhandled_errors();
        entries.extend(
            unhandled
                .iter()
                .skip(self.seen_unhandled)
                .map(|error| Entry::Unhandled {
                    error: error.clone(),
                }),
        );
        self.seen_unhandled = unhandled.len();

        entries
    }
}

fn recording_callbacks(log: &Rc<RefCell<Vec<Entry>>>) -> Callbacks<MemoryFrame> {
    let record = |log: &Rc<RefCell<Vec<Entry>>>, name: &'static str| {
        let log = Rc::clone(log);
        move |detail: Value| {
            log.borrow_mut().push(Entry::Callback {
                name: name.to_string(),
                detail,
            });
        }
    };
    let resized = record(log, "resized");
    let closed = record(log, "closed");
    let init = record(log, "init");
    let message = record(log, "message");
    let scroll = record(log, "scroll");

    Callbacks::new()
        .on_resized(move |event| {
            resized(serde_json::to_value(event)?);
            Ok(())
        })
        .on_closed(move |id| {
            closed(json!({ "frameId": id.as_str() }));
            Ok(())
        })
        .on_init(move |element: &MemoryFrame| {
            init(json!({ "frameId": element.id() }));
            Ok(())
        })
        .on_message(move |event| {
            message(json!({ "frameId": event.element.id(), "message": event.message }));
            Ok(())
        })
        .on_scroll(move |position| {
            scroll(json!({ "x": position.x, "y": position.y }));
            Ok(true)
        })
}

fn describe_outcome(outcome: &MessageOutcome) -> String {
    match outcome {
        MessageOutcome::Ignored => "ignored".to_string(),
        MessageOutcome::Stale => "stale".to_string(),
        MessageOutcome::Handled => "handled".to_string(),
        MessageOutcome::Relayed(RelayOutcome::Delivered(count)) => format!("relayed to {count}"),
        MessageOutcome::Relayed(RelayOutcome::NoTargets) => "relay found no targets".to_string(),
        MessageOutcome::Relayed(RelayOutcome::Terminated) => "relay ended at host".to_string(),
        MessageOutcome::Relayed(RelayOutcome::UnknownDestination(destination)) => {
            format!("relay to unknown destination {destination:?}")
        }
        MessageOutcome::Failed(kind) => format!("failed ({kind})"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_step_parsing_defaults() {
        let step: Step =
            serde_json::from_str(r#"{"step":"message","data":"[iFrameSizer]f1:1:1:init"}"#)
                .unwrap();
        assert_eq!(
            step,
            Step::Message {
                data: "[iFrameSizer]f1:1:1:init".to_string(),
                origin: "null".to_string(),
                from: None,
            }
        );
        let step: Step = serde_json::from_str(r#"{"step":"animation_frame"}"#).unwrap();
        assert_eq!(step, Step::AnimationFrame);
        assert!(serde_json::from_str::<Step>(r#"{"step":"explode"}"#).is_err());
    }

    #[test]
    fn test_clamped_resize_transcript() {
        let mut replay = Replay::new(HostConfig::default());
        let transcript = replay
            .run_script(
                r#"
# f1 is capped at 500px
{"step":"register","id":"f1","src":"https://a.example.com/x","options":{"maxHeight":500}}
{"step":"message","data":"[iFrameSizer]f1:900:0:interval","origin":"https://a.example.com"}
{"step":"animation_frame"}
"#,
            )
            .unwrap();

        assert!(transcript.contains(&Entry::Style {
            frame: "f1".to_string(),
            property: "height".to_string(),
            value: "500px".to_string(),
        }));
        assert!(transcript.contains(&Entry::Outcome {
            line: 4,
            outcome: "handled".to_string(),
        }));
        let resized = transcript
            .iter()
            .find(|entry| matches!(entry, Entry::Callback { name, .. } if name == "resized"))
            .unwrap();
        assert_eq!(
            resized,
            &Entry::Callback {
                name: "resized".to_string(),
                detail: json!({"frameId": "f1", "height": 500, "width": 0, "type": "interval"}),
            }
        );
    }

    #[test]
    fn test_errors_and_removals_are_reported() {
        let mut replay = Replay::new(HostConfig::default());
        let transcript = replay
            .run_script(
                r#"{"step":"register","id":"f1","src":"https://a.example.com/x"}
{"step":"message","data":"[iFrameSizer]f1:100:0:interval","origin":"https://evil.example.com"}
{"step":"timers","now_ms":0}
{"step":"message","data":"[iFrameSizer]f1:0:0:close","origin":"https://a.example.com"}"#,
            )
            .unwrap();

        assert!(transcript.contains(&Entry::Outcome {
            line: 2,
            outcome: "failed (protocol)".to_string(),
        }));
        assert!(transcript
            .iter()
            .any(|entry| matches!(entry, Entry::Unhandled { error } if error.contains("evil"))));
        assert!(transcript.contains(&Entry::Removed {
            frame: "f1".to_string()
        }));
    }

    #[test]
    fn test_bad_lines_name_their_position() {
        let mut replay = Replay::new(HostConfig::default());
        let err = replay
            .run_script("{\"step\":\"animation_frame\"}\nnot json")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = replay
            .run_script(r#"{"step":"message","data":"x","from":"ghost"}"#)
            .unwrap_err();
        assert!(format!("{err:#}").contains("ghost"));
    }
}
