//! Google Drive content store for archived photos.

use std::sync::Arc;

use async_trait::async_trait;
use fieldlog_store::{ContentStore, StoreError, StoredObject};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::check_status;
use crate::{ServiceAccountAuth, SyncError};

const FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const BOUNDARY: &str = "fieldlog_upload_boundary_5f0e";

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileRef {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Photo store on Google Drive, authenticated as a service account.
pub struct DriveStore {
    client: reqwest::Client,
    auth: Arc<ServiceAccountAuth>,
}

impl DriveStore {
    pub fn new(client: reqwest::Client, auth: Arc<ServiceAccountAuth>) -> Self {
        Self { client, auth }
    }
}

/// Escape a literal for use inside a single-quoted Drive query string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn folder_query(parent: &str, name: &str) -> String {
    format!(
        "name='{}' and mimeType='{FOLDER_MIME}' and '{}' in parents and trashed=false",
        quote(name),
        quote(parent)
    )
}

/// A `multipart/related` body: JSON metadata part, then the media part.
fn multipart_body(metadata: &serde_json::Value, mime: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --{BOUNDARY}\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[async_trait]
impl ContentStore for DriveStore {
    async fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, StoreError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .get(FILES_API)
            .bearer_auth(token)
            .query(&[
                ("q", folder_query(parent, name).as_str()),
                ("fields", "files(id,name)"),
            ])
            .send()
            .await
            .map_err(SyncError::from)?;
        let list: FileList = check_status(resp)
            .await?
            .json()
            .await
            .map_err(SyncError::from)?;
        debug!(folder = name, matches = list.files.len(), "folder lookup");
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, StoreError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .post(FILES_API)
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent],
            }))
            .send()
            .await
            .map_err(SyncError::from)?;
        let folder: FileRef = check_status(resp)
            .await?
            .json()
            .await
            .map_err(SyncError::from)?;
        Ok(folder.id)
    }

    async fn upload(
        &self,
        folder: &str,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StoreError> {
        let metadata = json!({ "name": name, "parents": [folder] });
        let body = multipart_body(&metadata, mime, &bytes);
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .post(UPLOAD_API)
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(SyncError::from)?;
        let file: FileRef = check_status(resp)
            .await?
            .json()
            .await
            .map_err(SyncError::from)?;
        Ok(StoredObject {
            link: file.web_view_link.unwrap_or_default(),
            id: file.id,
        })
    }

    async fn share_publicly(&self, object_id: &str) -> Result<(), StoreError> {
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .post(format!("{FILES_API}/{object_id}/permissions"))
            .bearer_auth(token)
            .json(&json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(SyncError::from)?;
        check_status(resp).await?;
        Ok(())
    }
}
