// Versioned `key:value;key:value` note encoding.
use tracing::debug;

use crate::models::{NoteMetadata, NOTE_VERSION};

const SEGMENT_SEPARATOR: char = ';';
const KEY_SEPARATOR: char = ':';

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parses a gateway note. Never fails: malformed segments are skipped and a
/// later duplicate of a key replaces the earlier one.
pub fn parse_note(note: &str) -> NoteMetadata {
    let mut metadata = NoteMetadata::default();

    for segment in note.split(SEGMENT_SEPARATOR) {
        let Some((key, value)) = segment.split_once(KEY_SEPARATOR) else {
            if !segment.trim().is_empty() {
                debug!("Skipping note segment without a key: {:?}", segment);
            }
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if !is_valid_key(key) {
            debug!("Skipping note segment with invalid key: {:?}", segment);
            continue;
        }
        if value.is_empty() {
            continue;
        }

        let value = value.to_string();
        match key {
            "v" => match value.parse::<u32>() {
                Ok(version) => metadata.version = version,
                Err(_) => debug!("Ignoring unreadable note version {:?}", value),
            },
            "pid" | "patient_id" => metadata.patient_id = Some(value),
            "product" | "product_code" => metadata.product_code = Some(value),
            "mode" => metadata.mode = Some(value),
            "reorder" | "reorder_id" => metadata.reorder_id = Some(value),
            _ => {
                metadata.extra.insert(key.to_string(), value);
            }
        }
    }

    metadata
}

/// Encodes metadata for a checkout note. `;` inside values cannot be
/// represented and is replaced with `,`.
pub fn encode_note(metadata: &NoteMetadata) -> String {
    let clean = |value: &str| value.replace(SEGMENT_SEPARATOR, ",").trim().to_string();

    let mut segments = vec![format!("v:{}", metadata.version.max(NOTE_VERSION))];
    let known = [
        ("pid", &metadata.patient_id),
        ("product", &metadata.product_code),
        ("mode", &metadata.mode),
        ("reorder", &metadata.reorder_id),
    ];
    for (key, value) in known {
        if let Some(value) = value.as_deref().map(clean).filter(|v| !v.is_empty()) {
            segments.push(format!("{}:{}", key, value));
        }
    }
    for (key, value) in &metadata.extra {
        let value = clean(value);
        if is_valid_key(key) && !value.is_empty() {
            segments.push(format!("{}:{}", key, value));
        }
    }

    segments.join(";")
}
