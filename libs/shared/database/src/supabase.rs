use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::store::{Document, DocumentStore, StoreError, StoreResult};

/// Non-success response from the PostgREST endpoint.
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {body}")]
pub struct ApiStatusError {
    pub status: StatusCode,
    pub body: String,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Service calls fall back to the anon key as bearer.
        let bearer = auth_token.unwrap_or(&self.anon_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", bearer))?);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(ApiStatusError { status, body: error_text }.into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

/// Document store backed by PostgREST tables: one table per collection,
/// one row per document, `id` as the primary key.
pub struct SupabaseDocumentStore {
    supabase: SupabaseClient,
}

impl SupabaseDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    fn collection_path(collection: &str) -> String {
        format!("/rest/v1/{}", collection)
    }

    fn filter_path(collection: &str, field: &str, value: &str) -> String {
        format!(
            "/rest/v1/{}?{}=eq.{}",
            collection,
            urlencoding::encode(field),
            urlencoding::encode(value)
        )
    }
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            &Self::collection_path(collection),
            None,
            Some(data),
            Some(Self::representation_headers()),
        ).await.map_err(to_store_error)?;

        let row = rows.into_iter().next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no rows", collection)))?;

        row_to_document(row).map(|doc| doc.id)
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &format!("{}?select=*", Self::collection_path(collection)),
            None,
            None,
        ).await.map_err(to_store_error)?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn find_by(&self, collection: &str, field: &str, value: &str) -> StoreResult<Vec<Document>> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &Self::filter_path(collection, field, value),
            None,
            None,
        ).await.map_err(to_store_error)?;

        rows.into_iter().map(row_to_document).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut docs = self.find_by(collection, "id", id).await?;
        Ok(if docs.is_empty() { None } else { Some(docs.swap_remove(0)) })
    }

    async fn replace(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        let mut row = match data {
            Value::Object(map) => map,
            other => return Err(StoreError::Decode(format!("document body must be an object, got {}", other))),
        };
        row.insert("id".to_string(), Value::String(id.to_string()));

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::PUT,
            &Self::filter_path(collection, "id", id),
            None,
            Some(Value::Object(row)),
            Some(Self::representation_headers()),
        ).await.map_err(to_store_error)?;

        if rows.is_empty() {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &Self::filter_path(collection, "id", id),
            None,
            None,
            Some(Self::representation_headers()),
        ).await.map_err(to_store_error)?;

        Ok(())
    }
}

fn row_to_document(row: Value) -> StoreResult<Document> {
    let mut fields: Map<String, Value> = match row {
        Value::Object(map) => map,
        other => return Err(StoreError::Decode(format!("expected a row object, got {}", other))),
    };

    let id = match fields.remove("id") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(StoreError::Decode("row is missing its id".to_string())),
    };

    Ok(Document::new(id, Value::Object(fields)))
}

fn to_store_error(err: anyhow::Error) -> StoreError {
    if let Some(api) = err.downcast_ref::<ApiStatusError>() {
        return match api.status.as_u16() {
            401 | 403 => StoreError::PermissionDenied(api.body.clone()),
            _ => StoreError::Unavailable(api.to_string()),
        };
    }

    if err.downcast_ref::<serde_json::Error>().is_some() {
        return StoreError::Decode(err.to_string());
    }

    StoreError::Unavailable(err.to_string())
}
