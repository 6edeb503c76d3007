//! Firebase Storage REST (v0) implementation of [`StorageLister`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use url::{form_urlencoded, Url};

use crate::lister::{StorageError, StorageListing, StorageLister, StorageObject};

pub const DEFAULT_FIREBASE_STORAGE_API_BASE: &str = "https://firebasestorage.googleapis.com";

/// Connection settings for a Firebase Storage bucket.
#[derive(Debug, Clone)]
pub struct FirebaseStorageConfig {
    /// REST endpoint root, overridable for emulators and mock servers.
    pub api_base: String,
    pub bucket: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer_token: Option<String>,
    pub request_timeout_ms: u64,
    pub page_size: u32,
}

impl Default for FirebaseStorageConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_FIREBASE_STORAGE_API_BASE.to_string(),
            bucket: String::new(),
            bearer_token: None,
            request_timeout_ms: 10_000,
            page_size: 1_000,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectMetadata {
    #[serde(default, rename = "downloadTokens")]
    download_tokens: Option<String>,
}

/// Lists bucket prefixes and mints `alt=media&token=` download URLs through
/// the Firebase Storage v0 REST API.
#[derive(Debug, Clone)]
pub struct FirebaseStorageLister {
    client: reqwest::Client,
    config: FirebaseStorageConfig,
}

impl FirebaseStorageLister {
    pub fn new(config: FirebaseStorageConfig) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::MissingBucket);
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = config
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    StorageError::InvalidResponse(format!("invalid bearer token header: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;
        Ok(Self { client, config })
    }

    fn objects_endpoint(&self) -> String {
        format!(
            "{}/v0/b/{}/o",
            self.config.api_base.trim_end_matches('/'),
            self.config.bucket.trim()
        )
    }

    fn object_endpoint(&self, full_path: &str) -> String {
        format!("{}/{}", self.objects_endpoint(), encode_object_name(full_path))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T, StorageError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return Ok(serde_json::from_str(&body)?);
        }
        match status.as_u16() {
            401 | 403 => Err(StorageError::AccessDenied {
                path: path.to_string(),
            }),
            404 => Err(StorageError::NotFound {
                path: path.to_string(),
            }),
            code => Err(StorageError::HttpStatus {
                status: code,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl StorageLister for FirebaseStorageLister {
    async fn list(&self, prefix: &str) -> Result<StorageListing, StorageError> {
        let prefix = prefix.trim_matches('/');
        let list_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let page_size = self.config.page_size.max(1).to_string();

        let mut listing = StorageListing::default();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("prefix", list_prefix.clone()),
                ("delimiter", "/".to_string()),
                ("maxResults", page_size.clone()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let request = self.client.get(self.objects_endpoint()).query(&query);
            let page: ListObjectsResponse = self.get_json(request, prefix).await?;

            listing.items.extend(
                page.items
                    .into_iter()
                    .filter(|item| !item.name.ends_with('/'))
                    .map(|item| StorageObject::new(item.name)),
            );
            listing.sub_prefixes.extend(
                page.prefixes
                    .into_iter()
                    .map(|sub| sub.trim_end_matches('/').to_string()),
            );

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) if page_token.as_deref() != Some(token.as_str()) => {
                    page_token = Some(token);
                }
                _ => break,
            }
        }
        Ok(listing)
    }

    async fn download_url(&self, item: &StorageObject) -> Result<String, StorageError> {
        let endpoint = self.object_endpoint(&item.full_path);
        let metadata: ObjectMetadata = self
            .get_json(self.client.get(endpoint.as_str()), &item.full_path)
            .await?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()));
        Ok(match token {
            Some(token) => format!("{endpoint}?alt=media&token={token}"),
            None => format!("{endpoint}?alt=media"),
        })
    }
}

/// Percent-encodes an object name as one path segment (`/` becomes `%2F`).
pub fn encode_object_name(full_path: &str) -> String {
    form_urlencoded::byte_serialize(full_path.trim_matches('/').as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Recovers the storage object path from a Firebase-style download URL
/// (`.../v0/b/<bucket>/o/<encoded path>?alt=media&token=...`).
pub fn storage_path_from_download_url(download_url: &str) -> Option<String> {
    let url = Url::parse(download_url).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let encoded = segments
        .windows(4)
        .find(|window| window[0] == "b" && window[2] == "o")
        .map(|window| window[3])?;
    let decoded = form_urlencoded::parse(format!("p={encoded}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())?;
    let decoded = decoded.trim_matches('/').to_string();
    (!decoded.is_empty()).then_some(decoded)
}
