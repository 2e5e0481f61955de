//! Local storage for profile pictures, served back under `/uploads`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{error, info, warn};

use crate::errors::ServiceError;

/// URL prefix the upload directory is mounted at.
pub const UPLOADS_ROUTE: &str = "/uploads";

const MAX_NAME_LEN: usize = 100;

/// Reduces a client file name to its last path component made of `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes `bytes` to `{dir}/{millis}-{name}` and returns the public path
/// (`uploads/{millis}-{name}`) stored on the user record.
pub async fn save_profile_picture(
    dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<String, ServiceError> {
    let file_name = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(original_name)
    );

    fs::create_dir_all(dir).await.map_err(|e| {
        error!(dir = %dir.display(), error = %e, "cannot create upload directory");
        ServiceError::InternalError(format!("upload directory unavailable: {}", e))
    })?;

    let target = publish(dir, &file_name, bytes).await.map_err(|e| {
        error!(dir = %dir.display(), file = %file_name, error = %e, "failed to store upload");
        ServiceError::InternalError(format!("failed to store upload: {}", e))
    })?;

    info!(path = %target.display(), size = bytes.len(), "stored profile picture");
    Ok(public_path(&file_name))
}

/// Writes to a temp name, then renames into place so a half-written file is never served.
/// The temp file is removed when either step fails.
async fn publish(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let target = dir.join(file_name);
    let tmp = dir.join(format!(".{}.tmp", file_name));

    let stored = match fs::write(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, &target).await,
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp upload");
            }
        }
        return Err(e);
    }
    Ok(target)
}

/// Removes a stored upload given its public path; missing files are ignored.
pub async fn remove_upload(dir: &Path, public: &str) {
    let Some(name) = public.rsplit('/').next() else {
        return;
    };
    let path: PathBuf = dir.join(name);
    if let Err(e) = fs::remove_file(&path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!(path = %path.display(), error = %e, "failed to remove upload");
        }
    }
}

fn public_path(file_name: &str) -> String {
    format!("{}/{}", UPLOADS_ROUTE.trim_start_matches('/'), file_name)
}
