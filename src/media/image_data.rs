//! Decoding of the `image_data` column.
//!
//! New rows store a JSON envelope `{"contentType": ..., "data": <base64>}`;
//! legacy rows hold the bare base64 text. The formats drifted across
//! iterations of the feature, so the read path detects which one it is
//! looking at instead of assuming. The write path only ever produces the
//! envelope; unifying stored rows is a data-migration task, not something
//! to guess at read time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "contentType")]
    content_type: String,
    data: String,
}

/// Decoded database-resident image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encode an image for the `image_data` column.
pub fn encode(content_type: &str, bytes: &[u8]) -> String {
    let envelope = Envelope {
        content_type: content_type.to_string(),
        data: BASE64.encode(bytes),
    };
    // Both fields are plain strings; serialization cannot fail.
    serde_json::to_string(&envelope).unwrap_or_default()
}

/// Decode a stored `image_data` value. Attempts the JSON envelope first,
/// then falls back to treating the whole value as raw base64 from a legacy
/// row, with an assumed JPEG content type.
pub fn decode(raw: &str) -> Option<DbImage> {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(raw) {
        let bytes = BASE64.decode(envelope.data.trim()).ok()?;
        return Some(DbImage {
            content_type: envelope.content_type,
            bytes,
        });
    }
    let bytes = BASE64.decode(raw.trim()).ok()?;
    Some(DbImage {
        content_type: "image/jpeg".to_string(),
        bytes,
    })
}
