use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::error::TurnError;
use crate::image::{encode_image_file, EncodedImage};
use crate::session::{Session, TurnSummary};

/// One recorded turn: what was dictated, the optional photo, and what the
/// extraction service answered.
#[derive(Debug, Deserialize)]
pub struct ReplayEntry {
    pub transcript: String,
    #[serde(default)]
    pub image: Option<String>, // path relative to the replay file, or a data URL
    pub response: serde_json::Value, // a JSON string is taken as the raw body
}

#[derive(Debug, Default)]
pub struct ReplaySummary {
    pub applied: Vec<TurnSummary>,
    pub dropped: Vec<(usize, String)>, // (line number, reason)
}

fn load_image(source: &str, base_dir: &Path) -> Result<EncodedImage, TurnError> {
    if source.starts_with("data:") {
        EncodedImage::from_data_url(source)
    } else {
        encode_image_file(&base_dir.join(source))
    }
}

/// Feeds JSON-lines recorded turns through the normal session path, without
/// the network. A bad line drops that turn only.
pub fn replay_lines(session: &mut Session, input: &str, base_dir: &Path) -> ReplaySummary {
    let mut summary = ReplaySummary::default();

    for (idx, line) in input.lines().enumerate() {
        let lineno = idx + 1;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let entry: ReplayEntry = match serde_json::from_str(line) {
            Ok(e) => e,
            Err(e) => {
                warn!("Replay line skipped - line={}, error={}", lineno, e);
                summary.dropped.push((lineno, format!("invalid replay entry: {e}")));
                continue;
            }
        };

        let image = match entry.image.as_deref().map(|s| load_image(s, base_dir)).transpose() {
            Ok(img) => img,
            Err(e) => {
                warn!("Turn aborted before extraction - line={}, error={}", lineno, e);
                summary.dropped.push((lineno, e.to_string()));
                continue;
            }
        };

        let body = match &entry.response {
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };

        let outcome = session
            .begin_turn(entry.transcript, image)
            .and_then(|ticket| session.complete_turn(&ticket, &body));
        match outcome {
            Ok(turn) => summary.applied.push(turn),
            Err(e) => {
                warn!("Turn dropped - line={}, error={}", lineno, e);
                summary.dropped.push((lineno, e.to_string()));
            }
        }
    }

    info!(
        "Replay completed - applied={}, dropped={}",
        summary.applied.len(),
        summary.dropped.len()
    );
    summary
}
