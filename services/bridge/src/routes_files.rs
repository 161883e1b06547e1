use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use blobstore::ObjectMeta;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::multipart::UploadForm;
use crate::state::SharedState;
use crate::types_files::{
    CreateFolderReq, CreateFolderResp, DeleteFilesReq, DownloadReq, PreviewQuery, ResourceItem, ResourceListReq,
};

const DEFAULT_UPLOAD_DIR: &str = "uploads/";
const AUDIO_EXTS: [&str; 2] = [".mp3", ".wav"];
const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Types a browser can render in place.
const INLINE_TYPES: [&str; 11] = [
    "text/plain",
    "text/html",
    "text/css",
    "application/javascript",
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "audio/mpeg",
    "audio/wav",
    "video/mp4",
];

pub fn is_audio_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    AUDIO_EXTS.iter().any(|ext| lower.ends_with(ext))
}

/// Directory an uploaded file lands in; blank paths put it at the bucket root.
fn upload_dir(path: Option<&String>) -> String {
    match path {
        None => DEFAULT_UPLOAD_DIR.to_string(),
        Some(p) => {
            let p = p.trim().trim_end_matches('/');
            if p.is_empty() {
                String::new()
            } else {
                format!("{p}/")
            }
        }
    }
}

/// Listing rows for `prefix`: directories first, then files, each in listing order.
pub fn build_resource_list(prefix: &str, listed: Vec<ObjectMeta>) -> Vec<ResourceItem> {
    let (mut dirs, mut files) = (Vec::new(), Vec::new());

    for meta in listed {
        let is_dir = meta.is_dir || meta.key.ends_with('/');
        let rel = meta.key.strip_prefix(prefix).unwrap_or(&meta.key);
        let name = if is_dir { rel.trim_end_matches('/') } else { rel };
        if name.is_empty() {
            continue;
        }

        let size_mb = meta.size as f64 / (1024.0 * 1024.0);
        let item = ResourceItem {
            file_name: name.to_string(),
            is_dir,
            size: (size_mb * 100.0).round() / 100.0,
            last_modified: meta
                .last_modified
                .map(|t| t.format(LAST_MODIFIED_FORMAT).to_string())
                .unwrap_or_default(),
            key: meta.key,
        };
        if is_dir {
            dirs.push(item);
        } else {
            files.push(item);
        }
    }

    dirs.extend(files);
    dirs
}

fn disposition(value: String, key: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_bytes(value.as_bytes())
        .map_err(|_| ApiError::bad_request(format!("key {key:?} cannot be used as a file name")))
}

pub async fn upload_files(
    State(st): State<SharedState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<&'static str, ApiError> {
    let form = UploadForm::read(mp?, "files").await?;
    if form.files.is_empty() {
        return Err(ApiError::bad_request("at least one file is required"));
    }
    // 1) reject the whole batch before anything is written
    if form.files.iter().any(|f| !is_audio_file(&f.file_name)) {
        return Err(ApiError::bad_request("Invalid file type. Only mp3 and wav are allowed"));
    }

    // 2) upload what is not there yet
    let bucket = st.files_bucket();
    let paths = form.values("filePath");
    for (i, file) in form.files.iter().enumerate() {
        let key = format!("{}{}", upload_dir(paths.get(i)), file.file_name);
        if st.store.exists(bucket, &key).await? {
            info!(%key, "file already exists, skipping upload");
            continue;
        }
        st.store
            .put(bucket, &key, file.body.clone(), &file.content_type())
            .await?;
        info!(%key, bytes = file.body.len(), "file uploaded");
    }

    Ok("Files uploaded successfully")
}

pub async fn download_file(
    State(st): State<SharedState>,
    req: Result<Json<DownloadReq>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = req?;
    if req.key.is_empty() {
        return Err(ApiError::bad_request("key is required"));
    }

    let obj = st.store.get(st.files_bucket(), &req.key).await?;
    let attachment = disposition(format!("attachment; filename={}", req.key), &req.key)?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, attachment),
        ],
        obj.body,
    )
        .into_response())
}

pub async fn delete_files(
    State(st): State<SharedState>,
    req: Result<Json<DeleteFilesReq>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = req?;
    if req.key_list.iter().any(|k| k.trim().is_empty()) {
        return Err(ApiError::bad_request("keyList must not contain empty keys"));
    }

    let bucket = st.files_bucket();
    for prefix in &req.key_list {
        // every key is a prefix: a file deletes itself, a folder everything below it
        let listed = st.store.list(bucket, prefix, true).await?;
        for meta in listed {
            match st.store.remove(bucket, &meta.key).await {
                Ok(()) => debug!(key = %meta.key, "object deleted"),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(ApiError::from(e).with_context(&format!("failed to delete object {}", meta.key)));
                }
            }
        }
        info!(%prefix, "objects deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn resource_list(
    State(st): State<SharedState>,
    req: Result<Json<ResourceListReq>, JsonRejection>,
) -> Result<Json<Vec<ResourceItem>>, ApiError> {
    let Json(req) = req?;
    let prefix = if !req.path.is_empty() {
        req.path
    } else if !req.com_id.is_empty() {
        format!("{}/resource/", req.com_id)
    } else {
        return Err(ApiError::bad_request("path or comID is required"));
    };

    let listed = st.store.list(st.files_bucket(), &prefix, false).await?;
    Ok(Json(build_resource_list(&prefix, listed)))
}

pub async fn preview_file(
    State(st): State<SharedState>,
    Query(q): Query<PreviewQuery>,
) -> Result<Response, ApiError> {
    let key = q
        .key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("Key is required"))?;

    let obj = st.store.get(st.files_bucket(), &key).await?;
    let content_type = obj
        .meta
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| mime_guess::from_path(&key).first_or_octet_stream().essence_str().to_string());

    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let kind = if INLINE_TYPES.contains(&essence.as_str()) { "inline" } else { "attachment" };

    let content_type = HeaderValue::from_str(&content_type)
        .map_err(|_| ApiError::internal(format!("stored content type of {key} is not a valid header")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition(format!("{kind}; filename=\"{key}\""), &key)?),
        ],
        obj.body,
    )
        .into_response())
}

pub async fn create_folder(
    State(st): State<SharedState>,
    req: Result<Json<CreateFolderReq>, JsonRejection>,
) -> Result<Json<CreateFolderResp>, ApiError> {
    let Json(req) = req?;
    let folder = req.folder_name.trim().trim_matches('/');
    if folder.is_empty() {
        return Err(ApiError::bad_request("folderName is required"));
    }

    let parent = req.current_path.trim().trim_end_matches('/');
    let key = if parent.is_empty() {
        format!("{folder}/")
    } else {
        format!("{parent}/{folder}/")
    };

    st.store
        .put(st.files_bucket(), &key, bytes::Bytes::new(), "application/x-directory")
        .await?;
    info!(%key, "folder created");

    Ok(Json(CreateFolderResp {
        success: true,
        message: "Folder created successfully".to_string(),
    }))
}
