//! Five-slot media resolution.
//!
//! A product can carry an uploaded image path, an image stored in the
//! database, an uploaded PDF path, a PDF stored in the database, and an
//! external URL, all at the same time. Nothing enforces mutual exclusivity
//! at the schema level; this module is the single place that decides which
//! slot gets rendered. Every call site (list payloads, single-product
//! payloads, binary serving fallbacks) goes through [`resolve`].

/// What the selected slot contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Pdf,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Pdf => "pdf",
        }
    }
}

/// Where the renderable bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Relative path under the public uploads tree, servable as-is.
    LocalPath(String),
    /// API endpoint that decodes the database slot and streams it.
    ApiEndpoint(String),
    /// External URL, fetched through the CORS-bypass proxy.
    ProxiedUrl(String),
}

impl MediaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSource::LocalPath(_) => "local_path",
            MediaSource::ApiEndpoint(_) => "api_endpoint",
            MediaSource::ProxiedUrl(_) => "proxied_url",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            MediaSource::LocalPath(u) | MediaSource::ApiEndpoint(u) | MediaSource::ProxiedUrl(u) => {
                u
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub kind: MediaKind,
    pub source: MediaSource,
}

/// Borrowed view of the five slot columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaSlots<'a> {
    pub image_file: Option<&'a str>,
    pub image_data: Option<&'a str>,
    pub pdf_file: Option<&'a str>,
    pub pdf_data: Option<&'a str>,
    pub storage_url: Option<&'a str>,
}

fn populated(slot: Option<&str>) -> Option<&str> {
    slot.map(str::trim).filter(|s| !s.is_empty())
}

/// Select the slot to render. Pure: depends only on the five fields and the
/// product id used to build API endpoint paths. Returns `None` when every
/// slot is empty (the "no content" placeholder).
///
/// Priority, highest first: image file, image in DB, PDF file, PDF in DB,
/// external URL. A later slot is consulted only when all earlier ones are
/// empty, regardless of field population order in the row.
pub fn resolve(product_id: i32, slots: &MediaSlots<'_>) -> Option<ResolvedMedia> {
    if let Some(path) = populated(slots.image_file) {
        return Some(ResolvedMedia {
            kind: MediaKind::Image,
            source: MediaSource::LocalPath(format!("/uploads/{path}")),
        });
    }
    if populated(slots.image_data).is_some() {
        return Some(ResolvedMedia {
            kind: MediaKind::Image,
            source: MediaSource::ApiEndpoint(format!("/api/products/{product_id}/img")),
        });
    }
    if let Some(path) = populated(slots.pdf_file) {
        return Some(ResolvedMedia {
            kind: MediaKind::Pdf,
            source: MediaSource::LocalPath(format!("/uploads/{path}")),
        });
    }
    if populated(slots.pdf_data).is_some() {
        return Some(ResolvedMedia {
            kind: MediaKind::Pdf,
            source: MediaSource::ApiEndpoint(format!("/api/products/{product_id}/pdf")),
        });
    }
    if let Some(url) = populated(slots.storage_url) {
        let kind = classify_url(url);
        let endpoint = match kind {
            MediaKind::Image => "image",
            MediaKind::Pdf => "pdf",
        };
        return Some(ResolvedMedia {
            kind,
            source: MediaSource::ProxiedUrl(format!(
                "/api/proxy/{endpoint}?url={}",
                urlencode(url)
            )),
        });
    }
    None
}

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".svg"];
const IMAGE_HINTS: &[&str] = &["image", "img", "photo", "picture"];

/// Best-effort classification of an external URL. Known to produce false
/// positives/negatives; the proxy sniffs the real payload server-side.
pub fn classify_url(url: &str) -> MediaKind {
    let lower = url.to_ascii_lowercase();
    // Query strings are tolerated after the extension.
    let base = lower.split('?').next().unwrap_or(&lower);

    if base.ends_with(".pdf") {
        return MediaKind::Pdf;
    }
    if IMAGE_EXTENSIONS.iter().any(|ext| base.ends_with(ext)) {
        return MediaKind::Image;
    }
    if IMAGE_HINTS.iter().any(|hint| lower.contains(hint)) {
        return MediaKind::Image;
    }
    // Unknown URLs default to image rendering.
    MediaKind::Image
}

/// Percent-encode a URL for embedding as a single query parameter value.
fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
