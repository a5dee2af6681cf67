//! Filesystem-backed image store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use super::{ImageStore, StoreError};
use crate::models::ImageUpload;

/// Stores images under `root` and hands out references of the form
/// `{url_prefix}/clothes/{uid}/{millis}-{slug}-{short}.{ext}`.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
    url_prefix: String,
}

impl FsImageStore {
    /// Open the store, creating the root directory if needed.
    pub async fn open(root: &Path, url_prefix: &str) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Map a reference back to its file, refusing anything outside the root.
    fn resolve(&self, image_ref: &str) -> Result<PathBuf, StoreError> {
        let relative = image_ref
            .strip_prefix(&self.url_prefix)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| StoreError::InvalidReference(image_ref.to_string()))?;

        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return Err(StoreError::InvalidReference(image_ref.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn put(
        &self,
        user_id: &str,
        name_hint: &str,
        image: &ImageUpload,
    ) -> Result<String, StoreError> {
        let user_dir = slugify(user_id);
        if user_dir.is_empty() {
            return Err(StoreError::InvalidReference(user_id.to_string()));
        }

        let short = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}-{}-{}.{}",
            Utc::now().timestamp_millis(),
            slugify(name_hint),
            &short[..8],
            image.extension()
        );
        let relative = format!("clothes/{}/{}", user_dir, file_name);

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &image.bytes).await?;

        Ok(format!("{}/{}", self.url_prefix, relative))
    }

    async fn delete(&self, image_ref: &str) -> Result<(), StoreError> {
        let path = self.resolve(image_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(image_ref.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
