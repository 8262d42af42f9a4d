use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use actix_web::{post, web::Data, HttpResponse, Responder};
use futures::StreamExt;
use uuid::Uuid;

use crate::{auth::SessionUser, errors::AppError, structs::UploadedFile, AppState};

pub const ALLOWED_EXTENSIONS: [&str; 7] = ["jpeg", "jpg", "png", "gif", "webp", "glb", "gltf"];

const GLTF_BINARY_MIME: &str = "model/gltf-binary";

/// Where uploaded assets land on disk and how large one may be.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

/// Lowercased extension of `filename` when it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn allowed_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    mime == GLTF_BINARY_MIME || ALLOWED_EXTENSIONS.iter().any(|token| mime.contains(token))
}

/// Stores one image or 3D model from the `file` field and returns its URL.
///
/// Nothing touches the disk until the name, type and size checks have passed.
#[post("/api/upload")]
pub async fn upload_handler(
    user: SessionUser,
    state: Data<AppState>,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let limits = &state.uploads;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::UploadRejected(e.to_string()))?;
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned)
            .ok_or_else(|| AppError::UploadRejected("Missing file name".into()))?;
        let extension = allowed_extension(&filename)
            .ok_or_else(|| AppError::UploadRejected("Invalid file type".into()))?;
        let mime_ok = field
            .content_type()
            .map(|mime| allowed_mime(mime.essence_str()))
            .unwrap_or(false);
        if !mime_ok {
            return Err(AppError::UploadRejected("Invalid file type".into()));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::UploadRejected(e.to_string()))?;
            if data.len() + chunk.len() > limits.max_bytes {
                log::warn!("User {} sent an upload over {} bytes", user.id(), limits.max_bytes);
                return Err(AppError::UploadRejected(format!(
                    "File exceeds {} bytes",
                    limits.max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let stored_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        tokio::fs::create_dir_all(&limits.dir).await?;
        tokio::fs::write(limits.dir.join(&stored_name), &data).await?;
        log::info!("User {} uploaded {} as {}", user.id(), filename, stored_name);

        return Ok(HttpResponse::Ok().json(UploadedFile {
            url: format!("/uploads/{stored_name}"),
        }));
    }

    Err(AppError::UploadRejected("No file uploaded".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_matched_case_insensitively() {
        assert_eq!(allowed_extension("dish.JPG").as_deref(), Some("jpg"));
        assert_eq!(allowed_extension("burger.glb").as_deref(), Some("glb"));
        assert_eq!(allowed_extension("scene.gltf").as_deref(), Some("gltf"));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("archive.png.exe"), None);
        assert_eq!(allowed_extension("noextension"), None);
    }

    #[test]
    fn mime_types_follow_the_allow_list() {
        assert!(allowed_mime("image/jpeg"));
        assert!(allowed_mime("image/webp"));
        assert!(allowed_mime("model/gltf-binary"));
        assert!(allowed_mime("model/gltf+json"));
        assert!(!allowed_mime("text/plain"));
        assert!(!allowed_mime("application/octet-stream"));
    }
}
