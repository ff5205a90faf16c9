//! Media store: persists one uploaded asset per product in the slot
//! matching the caller's (asset type × location) choice.
//!
//! Database slots only touch the row. File slots write the payload under
//! the public uploads tree and record the relative path; no transaction
//! spans the disk write and the row update, so a half-written file can be
//! orphaned when the subsequent update fails.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use chrono::Utc;
use sea_orm::Set;
use std::path::Path;
use tokio::fs;

use crate::entity::products;
use crate::error::{AppError, AppResult};
use crate::media::image_data;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Image,
    Pdf,
}

impl AssetType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image" => Some(AssetType::Image),
            "pdf" => Some(AssetType::Pdf),
            _ => None,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            AssetType::Image => "image",
            AssetType::Pdf => "pdf",
        }
    }

    fn subdir(&self) -> &'static str {
        match self {
            AssetType::Image => "images",
            AssetType::Pdf => "pdfs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLocation {
    Database,
    File,
}

impl StorageLocation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "database" => Some(StorageLocation::Database),
            "file" => Some(StorageLocation::File),
            _ => None,
        }
    }
}

/// One of the four column-backed slots addressable by
/// `DELETE /api/products/:id/storage/:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    ImageFile,
    ImageData,
    PdfFile,
    PdfData,
}

impl MediaSlot {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "image_file" => Some(MediaSlot::ImageFile),
            "image_data" => Some(MediaSlot::ImageData),
            "pdf_file" => Some(MediaSlot::PdfFile),
            "pdf_data" => Some(MediaSlot::PdfData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Persist an upload into the chosen slot and stage the column writes onto
/// the product's active model: the target slot is set, its sibling slot of
/// the same asset type is cleared.
pub async fn save_upload(
    uploads_dir: &str,
    asset: AssetType,
    location: StorageLocation,
    file: &UploadedFile,
    active: &mut products::ActiveModel,
) -> AppResult<()> {
    match (asset, location) {
        (AssetType::Image, StorageLocation::Database) => {
            active.image_data = Set(Some(image_data::encode(&file.content_type, &file.bytes)));
            active.image_file = Set(None);
        }
        (AssetType::Pdf, StorageLocation::Database) => {
            active.pdf_data = Set(Some(BASE64.encode(&file.bytes)));
            active.pdf_file = Set(None);
        }
        (asset, StorageLocation::File) => {
            let rel_path = write_file(uploads_dir, asset, file).await?;
            match asset {
                AssetType::Image => {
                    active.image_file = Set(Some(rel_path));
                    active.image_data = Set(None);
                }
                AssetType::Pdf => {
                    active.pdf_file = Set(Some(rel_path));
                    active.pdf_data = Set(None);
                }
            }
        }
    }
    Ok(())
}

/// Write the payload under `{uploads_dir}/{images|pdfs}/` with a generated
/// unique name, returning the relative path stored in the row.
async fn write_file(uploads_dir: &str, asset: AssetType, file: &UploadedFile) -> AppResult<String> {
    let dir = Path::new(uploads_dir).join(asset.subdir());
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create uploads dir: {e}")))?;

    let filename = format!(
        "{}_{}_{}",
        asset.prefix(),
        Utc::now().timestamp_millis(),
        sanitize_filename(&file.original_name)
    );
    let path = dir.join(&filename);
    fs::write(&path, &file.bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to write upload: {e}")))?;

    Ok(format!("{}/{}", asset.subdir(), filename))
}

/// Stage clearing one slot onto the active model. For file-backed slots the
/// on-disk file is unlinked best-effort: a failed unlink is logged and the
/// request still succeeds. Clearing an already-empty slot is a no-op.
pub async fn clear_slot(
    uploads_dir: &str,
    product: &products::Model,
    slot: MediaSlot,
    active: &mut products::ActiveModel,
) {
    match slot {
        MediaSlot::ImageFile => {
            if let Some(path) = product.image_file.as_deref() {
                unlink_upload(uploads_dir, path).await;
            }
            active.image_file = Set(None);
        }
        MediaSlot::ImageData => {
            active.image_data = Set(None);
        }
        MediaSlot::PdfFile => {
            if let Some(path) = product.pdf_file.as_deref() {
                unlink_upload(uploads_dir, path).await;
            }
            active.pdf_file = Set(None);
        }
        MediaSlot::PdfData => {
            active.pdf_data = Set(None);
        }
    }
}

async fn unlink_upload(uploads_dir: &str, rel_path: &str) {
    let path = Path::new(uploads_dir).join(rel_path);
    if let Err(err) = fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %err, "failed to unlink upload");
    }
}

/// Read a file-backed slot from disk.
pub async fn read_file_slot(uploads_dir: &str, rel_path: &str) -> AppResult<Vec<u8>> {
    let path = Path::new(uploads_dir).join(rel_path);
    match fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound),
        Err(err) => Err(AppError::Internal(anyhow::anyhow!(
            "failed to read upload: {err}"
        ))),
    }
}

fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
