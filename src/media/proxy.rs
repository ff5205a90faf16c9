//! URL normalization and payload classification for the external-URL proxy.
//!
//! Share links from the big storage providers do not point at the raw
//! bytes; each provider gets a light rewrite before the fetch. Everything
//! here is pure string work so it can be exercised without a network; the
//! fetch itself lives in `services::proxy_service`.

/// Provider classification of a URL, driving request headers and retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    GooglePhotos,
    GoogleUserContent,
    GoogleDrive,
    Dropbox,
    OneDrive,
    Supabase,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUrl {
    pub url: String,
    pub provider: Provider,
}

/// Apply the provider rewrites. Short-link resolution (goo.gl) happens
/// before this in the service, since it needs a HEAD request.
pub fn prepare_url(url: &str) -> PreparedUrl {
    let lower = url.to_ascii_lowercase();

    if lower.contains("lh3.googleusercontent.com") {
        return PreparedUrl {
            url: url.to_string(),
            provider: Provider::GoogleUserContent,
        };
    }

    if lower.contains("photos.google.com") || lower.contains("photos.app.goo.gl") {
        if let Some(id) = extract_google_photo_id(url) {
            return PreparedUrl {
                url: format!("https://lh3.googleusercontent.com/d/{id}=w1200"),
                provider: Provider::GoogleUserContent,
            };
        }
        return PreparedUrl {
            url: url.to_string(),
            provider: Provider::GooglePhotos,
        };
    }

    if lower.contains("dropbox.com") {
        let rewritten = if lower.contains("dl=1") {
            url.to_string()
        } else if url.contains('?') {
            format!("{url}&dl=1")
        } else {
            format!("{url}?dl=1")
        };
        return PreparedUrl {
            url: rewritten,
            provider: Provider::Dropbox,
        };
    }

    if lower.contains("1drv.ms") || lower.contains("onedrive.live.com") {
        let rewritten = if lower.contains("download=1") {
            url.to_string()
        } else if url.contains('?') {
            format!("{url}&download=1")
        } else {
            format!("{url}?download=1")
        };
        return PreparedUrl {
            url: rewritten,
            provider: Provider::OneDrive,
        };
    }

    if lower.contains("drive.google.com") {
        if let Some(id) = extract_drive_file_id(url) {
            return PreparedUrl {
                url: format!("https://drive.google.com/uc?export=view&id={id}"),
                provider: Provider::GoogleDrive,
            };
        }
        return PreparedUrl {
            url: url.to_string(),
            provider: Provider::GoogleDrive,
        };
    }

    if lower.contains(".supabase.") && lower.contains("/storage/") {
        // Signed storage URLs pass through unmodified; the provider flag
        // switches the request headers instead.
        return PreparedUrl {
            url: url.to_string(),
            provider: Provider::Supabase,
        };
    }

    PreparedUrl {
        url: url.to_string(),
        provider: Provider::Other,
    }
}

/// Google Photos short links need a redirect-following HEAD before the
/// photo id can be extracted from the resolved URL.
pub fn is_google_short_link(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("photos.app.goo.gl") || lower.contains("//goo.gl/")
}

/// Extract a Google Photos id, either from a `/photo/{id}` path segment or
/// from an `AF1Qip…` token anywhere in the URL.
pub fn extract_google_photo_id(url: &str) -> Option<String> {
    if let Some(pos) = url.find("/photo/") {
        let rest = &url[pos + "/photo/".len()..];
        let id: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    if let Some(pos) = url.find("AF1Qip") {
        let token: String = url[pos..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect();
        if token.len() > "AF1Qip".len() {
            return Some(token);
        }
    }
    None
}

/// Extract the file id from a Drive `/file/d/{id}/...` link.
pub fn extract_drive_file_id(url: &str) -> Option<String> {
    let pos = url.find("/file/d/")?;
    let rest = &url[pos + "/file/d/".len()..];
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    (!id.is_empty()).then_some(id)
}

/// Broad "this is an image" check on an upstream Content-Type header.
/// Octet-stream/binary answers are accepted as a fallback since several
/// providers serve images that way.
pub fn looks_like_image(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("image/")
        || ct.contains("octet-stream")
        || ct.contains("binary")
}

/// Infer an image MIME type from the final URL's extension.
pub fn infer_image_mime_from_url(url: &str) -> Option<&'static str> {
    let lower = url.to_ascii_lowercase();
    let base = lower.split('?').next().unwrap_or(&lower);
    if base.ends_with(".jpg") || base.ends_with(".jpeg") {
        return Some("image/jpeg");
    }
    if base.ends_with(".png") {
        return Some("image/png");
    }
    if base.ends_with(".gif") {
        return Some("image/gif");
    }
    if base.ends_with(".webp") {
        return Some("image/webp");
    }
    if base.ends_with(".bmp") {
        return Some("image/bmp");
    }
    if base.ends_with(".svg") {
        return Some("image/svg+xml");
    }
    None
}

const HEIC_BRANDS: &[&[u8; 4]] = &[b"heic", b"heif", b"heix"];

/// Detect HEIC/HEIF payloads by the ISO-BMFF `ftyp` box: the box size
/// occupies bytes 0..4, the `ftyp` marker bytes 4..8, the major brand
/// bytes 8..12. Detected payloads get relabeled `image/jpeg`. That is a
/// compatibility shim, not a transcode; no pixel conversion happens.
pub fn is_heic(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let brand = &bytes[8..12];
    HEIC_BRANDS.iter().any(|b| brand == *b)
}
