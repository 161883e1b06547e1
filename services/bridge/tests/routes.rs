use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use blobstore::{InMemoryStore, ObjectStore};
use bytes::Bytes;
use firmware::{manifest_key, upload_key};
use minio_bridge::{app, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const FILES: &str = "nxt-tenant";
const FIRMWARE: &str = "nxt-device";
const BOUNDARY: &str = "bridge-test-boundary";

fn setup() -> (InMemoryStore, Router) {
    let store = InMemoryStore::with_buckets(&[FILES, FIRMWARE]);
    (store.clone(), router_for(store))
}

fn router_for(store: InMemoryStore) -> Router {
    let cfg = AppConfig::from_lookup(|_| None).unwrap();
    app(Arc::new(AppState::new(Arc::new(store), cfg)))
}

fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_req(uri: &str, parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Bytes {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
async fn test_latest_with_empty_list_is_bad_request() {
    let (_store, app) = setup();
    let resp = app
        .oneshot(json_req("POST", "/getLatestFirmwares", json!({"product_name_list": []})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn test_latest_reports_missing_products_in_errors() {
    let (store, app) = setup();
    store
        .put(FIRMWARE, "firmware/A/A_[Std]_V1.0.5_20211011.img", Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .unwrap();

    let resp = app
        .oneshot(json_req("POST", "/getLatestFirmwares", json!({"product_name_list": ["A", "B"]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(
        body["latest_firmwares"],
        json!([{"product_name": "A", "newest_version": "[Std]_V1.0.5_20211011"}])
    );
    assert!(body["errors"]["B"].is_string());
    assert!(body["errors"].get("A").is_none());
}

#[tokio::test]
async fn test_latest_with_no_failures_still_has_errors_object() {
    let (store, app) = setup();
    store
        .put(FIRMWARE, "firmware/A/A_[Std]_V1.0.5_20211011.img", Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .unwrap();

    let resp = app
        .oneshot(json_req("POST", "/getLatestFirmwares", json!({"product_name_list": ["A"]})))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["errors"], json!({}));
}

#[tokio::test]
async fn test_firmware_list_of_unknown_product_is_empty_array() {
    let (_store, app) = setup();
    let resp = app
        .oneshot(json_req("POST", "/getFirmwareList", json!({"product_name": "NXT2204"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn test_upload_firmware_stores_image_and_manifest() {
    let (store, app) = setup();
    let req = multipart_req(
        "/uploadFirmware",
        &[
            Part::Text("product_name", "NXT2204"),
            Part::Text("version", "1.0.5"),
            Part::Text("upload_user", "alice"),
            Part::File("files", "NXT2204_[Std]_V1.0.5_20211011.img", b"\x7fELF"),
        ],
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"Files uploaded successfully");

    let keys = store.keys(FIRMWARE).await;
    assert!(keys.contains(&upload_key("NXT2204", "NXT2204_[Std]_V1.0.5_20211011.img")));
    assert!(keys.contains(&manifest_key("NXT2204")));

    let resp = app
        .oneshot(json_req("POST", "/getFirmwareList", json!({"product_name": "NXT2204"})))
        .await
        .unwrap();
    let list = body_json(resp).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["version"], "1.0.5");
    assert_eq!(list[0]["upload_user"], "alice");
    assert_eq!(list[0]["url"], "oss://nxt-device/firmware/NXT2204/NXT2204_1.0.5.img");
}

#[tokio::test]
async fn test_upload_firmware_rejects_non_img_before_writing() {
    let (store, app) = setup();
    let req = multipart_req(
        "/uploadFirmware",
        &[
            Part::Text("product_name", "NXT2204"),
            Part::Text("version", "1.0.5"),
            Part::Text("upload_user", "alice"),
            Part::File("files", "good.img", b"a"),
            Part::File("files", "bad.bin", b"b"),
        ],
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.keys(FIRMWARE).await.is_empty());
}

#[tokio::test]
async fn test_upload_firmware_requires_valid_version() {
    let (store, app) = setup();
    let req = multipart_req(
        "/uploadFirmware",
        &[
            Part::Text("product_name", "NXT2204"),
            Part::Text("version", "1.0"),
            Part::Text("upload_user", "alice"),
            Part::File("files", "a.img", b"a"),
        ],
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.keys(FIRMWARE).await.is_empty());
}

#[tokio::test]
async fn test_upload_firmware_without_bucket_is_unavailable() {
    let store = InMemoryStore::with_buckets(&[FILES]);
    let app = router_for(store);
    let req = multipart_req(
        "/uploadFirmware",
        &[
            Part::Text("product_name", "NXT2204"),
            Part::Text("version", "1.0.5"),
            Part::Text("upload_user", "alice"),
            Part::File("files", "a.img", b"a"),
        ],
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_delete_firmware_is_no_content_and_idempotent() {
    let (store, app) = setup();
    let req = multipart_req(
        "/uploadFirmware",
        &[
            Part::Text("product_name", "P"),
            Part::Text("version", "1.0.0"),
            Part::Text("upload_user", "ops"),
            Part::File("files", "P_1.0.0.img", b"a"),
        ],
    );
    app.clone().oneshot(req).await.unwrap();

    let resp = app
        .clone()
        .oneshot(json_req("POST", "/getFirmwareList", json!({"product_name": "P"})))
        .await
        .unwrap();
    let id = body_json(resp).await[0]["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(json_req("DELETE", "/deleteFirmware", json!({"id": id, "product_name": "P"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    assert!(store.keys(FIRMWARE).await.is_empty());
}

#[tokio::test]
async fn test_upload_audio_and_list_resources() {
    let (store, app) = setup();
    store
        .put(FILES, "c1/resource/alarms/", Bytes::new(), "application/x-directory")
        .await
        .unwrap();

    let req = multipart_req(
        "/upload",
        &[
            Part::File("files", "door.mp3", b"ID3"),
            Part::Text("filePath", "c1/resource/"),
        ],
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(store.get(FILES, "c1/resource/door.mp3").await.unwrap().meta.content_type.as_deref(), Some("audio/mpeg"));

    let resp = app
        .oneshot(json_req("POST", "/resourceList", json!({"path": "", "comID": "c1"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let items = body_json(resp).await;
    assert_eq!(items[0]["fileName"], "alarms");
    assert_eq!(items[0]["isDir"], true);
    assert_eq!(items[1]["fileName"], "door.mp3");
    assert_eq!(items[1]["key"], "c1/resource/door.mp3");
    assert_eq!(items[1]["isDir"], false);
}

#[tokio::test]
async fn test_upload_rejects_non_audio() {
    let (store, app) = setup();
    let req = multipart_req(
        "/upload",
        &[Part::File("files", "a.mp3", b"a"), Part::File("files", "b.txt", b"b")],
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(store.keys(FILES).await.is_empty());
}

#[tokio::test]
async fn test_upload_skips_existing_files() {
    let (store, app) = setup();
    store
        .put(FILES, "uploads/a.wav", Bytes::from_static(b"old"), "audio/wav")
        .await
        .unwrap();

    let req = multipart_req("/upload", &[Part::File("files", "a.wav", b"new")]);
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&store.get(FILES, "uploads/a.wav").await.unwrap().body[..], b"old");
}

#[tokio::test]
async fn test_download_returns_attachment() {
    let (store, app) = setup();
    store
        .put(FILES, "c1/resource/a.mp3", Bytes::from_static(b"ID3data"), "audio/mpeg")
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(json_req("POST", "/download", json!({"key": "c1/resource/a.mp3"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "attachment; filename=c1/resource/a.mp3");
    assert_eq!(&body_bytes(resp).await[..], b"ID3data");

    let resp = app
        .oneshot(json_req("POST", "/download", json!({"key": "nope.mp3"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preview_picks_disposition_from_content_type() {
    let (store, app) = setup();
    store
        .put(FILES, "a.mp3", Bytes::from_static(b"ID3"), "audio/mpeg")
        .await
        .unwrap();
    store
        .put(FILES, "b.zip", Bytes::from_static(b"PK"), "application/zip")
        .await
        .unwrap();

    let resp = app.clone().oneshot(Request::get("/previewFile?key=a.mp3").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "inline; filename=\"a.mp3\"");

    let resp = app.clone().oneshot(Request::get("/previewFile?key=b.zip").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "attachment; filename=\"b.zip\"");

    let resp = app.oneshot(Request::get("/previewFile").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_removes_prefix_recursively() {
    let (store, app) = setup();
    for key in ["c1/resource/alarms/a.mp3", "c1/resource/alarms/deep/b.wav", "c1/resource/keep.mp3"] {
        store.put(FILES, key, Bytes::from_static(b"x"), "audio/mpeg").await.unwrap();
    }

    let resp = app
        .oneshot(json_req("DELETE", "/delete", json!({"keyList": ["c1/resource/alarms/"]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.keys(FILES).await, vec!["c1/resource/keep.mp3".to_string()]);
}

#[tokio::test]
async fn test_create_folder() {
    let (store, app) = setup();
    let resp = app
        .oneshot(json_req("POST", "/createFolder", json!({"currentPath": "c1/resource", "folderName": "alarms"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"success": true, "message": "Folder created successfully"}));
    assert!(store.keys(FILES).await.contains(&"c1/resource/alarms/".to_string()));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request_with_error_body() {
    let (_store, app) = setup();
    let req = Request::builder()
        .method("POST")
        .uri("/getFirmwareList")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}
