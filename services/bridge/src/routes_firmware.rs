use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use firmware::{
    is_firmware_image, upload_key, validate_product, AppendOutcome, DeleteOutcome, FirmwareEntry, LatestBatch,
    NewFirmware, Version,
};
use tracing::info;

use crate::error::ApiError;
use crate::multipart::UploadForm;
use crate::state::SharedState;
use crate::types_firmware::{DeleteFirmwareReq, FirmwareListReq, LatestFirmwaresReq};

pub async fn upload_firmware(
    State(st): State<SharedState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<&'static str, ApiError> {
    let form = UploadForm::read(mp?, "files").await?;

    // 1) form fields
    let product_name = form.required("product_name")?;
    let version = form.required("version")?;
    let upload_user = form.required("upload_user")?;
    validate_product(&product_name)?;
    version.parse::<Version>().map_err(ApiError::bad_request)?;

    // 2) reject the whole batch before anything is written
    if form.files.is_empty() {
        return Err(ApiError::bad_request("at least one file is required"));
    }
    if form.files.iter().any(|f| !is_firmware_image(&f.file_name)) {
        return Err(ApiError::bad_request("Invalid file type. Only img files are allowed"));
    }

    // 3) image first, then the manifest entry
    let bucket = st.firmware_bucket();
    for file in &form.files {
        let key = upload_key(&product_name, &file.file_name);
        if st.store.exists(bucket, &key).await? {
            info!(%key, "firmware image already exists, skipping upload");
            continue;
        }
        st.store
            .put(bucket, &key, file.body.clone(), &file.content_type())
            .await?;
        info!(%key, bytes = file.body.len(), "firmware image uploaded");

        let outcome = st
            .manifests
            .append(NewFirmware {
                product_name: product_name.clone(),
                version: version.clone(),
                upload_user: upload_user.clone(),
            })
            .await?;
        if let AppendOutcome::Duplicate(existing) = outcome {
            info!(product = %product_name, %version, id = %existing.id, "manifest already lists this version");
        }
    }

    Ok("Files uploaded successfully")
}

pub async fn delete_firmware(
    State(st): State<SharedState>,
    req: Result<Json<DeleteFirmwareReq>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = req?;
    if req.id.trim().is_empty() {
        return Err(ApiError::bad_request("id is required"));
    }

    match st.manifests.delete(&req.id, &req.product_name).await? {
        DeleteOutcome::Removed { entry, image_removed, .. } => {
            info!(product = %entry.product_name, version = %entry.version, image_removed, "firmware deleted");
        }
        DeleteOutcome::NoManifest | DeleteOutcome::NoMatch => {}
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_firmware_list(
    State(st): State<SharedState>,
    req: Result<Json<FirmwareListReq>, JsonRejection>,
) -> Result<Json<Vec<FirmwareEntry>>, ApiError> {
    let Json(req) = req?;
    Ok(Json(st.manifests.list(&req.product_name).await?))
}

pub async fn get_latest_firmwares(
    State(st): State<SharedState>,
    req: Result<Json<LatestFirmwaresReq>, JsonRejection>,
) -> Result<Json<LatestBatch>, ApiError> {
    let Json(req) = req?;
    if req.product_name_list.is_empty() {
        return Err(ApiError::bad_request("product_name_list must not be empty"));
    }

    let batch = st.resolver.resolve_many(&req.product_name_list).await;
    info!(
        requested = req.product_name_list.len(),
        found = batch.latest_firmwares.len(),
        failed = batch.errors.len(),
        "latest firmware lookup finished"
    );
    Ok(Json(batch))
}
