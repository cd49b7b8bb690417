//! Cloud Firestore REST client.
//!
//! Implements `RemoteStore` on top of the Firestore v1 REST API. Documents
//! travel as Firestore typed values (`{"stringValue": "..."}` and friends);
//! this module converts them to and from plain JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, warn};

use crate::store::{Document, Fields, Filter, RemoteStore, StoreError};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Firestore REST API.
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// HTTP request timeout in seconds.
/// 30s allows for slow mobile connections while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryEntry {
    #[serde(default)]
    document: Option<RawDocument>,
}

/// How a response status is handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusOutcome {
    Success,
    RateLimited,
    Failed,
}

fn classify_status(status: StatusCode) -> StatusOutcome {
    if status.is_success() {
        StatusOutcome::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        StatusOutcome::RateLimited
    } else {
        StatusOutcome::Failed
    }
}

/// Delay before retry number `retry` (1-based), or None once retries
/// are used up.
fn rate_limit_backoff(retry: u32) -> Option<Duration> {
    if retry == 0 || retry > MAX_RATE_LIMIT_RETRIES {
        return None;
    }
    Some(Duration::from_millis(INITIAL_BACKOFF_MS << (retry - 1)))
}

/// Firestore client for one project's default database.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
    token: Option<String>,
}

impl FirestoreClient {
    pub fn new(project_id: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: FIRESTORE_BASE_URL.to_string(),
            project_id: project_id.into(),
            token: None,
        })
    }

    /// Point at a different endpoint, e.g. the local Firestore emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the signed-in user's ID token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url, self.project_id
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_url(), collection, id)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit
    /// (should retry), or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, StoreError> {
        let status = response.status();
        match classify_status(status) {
            StatusOutcome::Success => Ok(Some(response)),
            StatusOutcome::RateLimited => Ok(None),
            StatusOutcome::Failed => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::from_status(status, &body))
            }
        }
    }

    /// Send a request, retrying rate-limited responses with exponential backoff.
    async fn send<F>(&self, build: F) -> Result<Response, StoreError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut retries = 0;

        loop {
            let mut request = build(&self.client);
            if let Some(ref token) = self.token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    let Some(backoff) = rate_limit_backoff(retries) else {
                        return Err(StoreError::RateLimited);
                    };
                    warn!(retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl RemoteStore for FirestoreClient {
    async fn query(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = structured_query(collection, filter);

        let response = self.send(|client| client.post(&url).json(&body)).await?;
        let entries: Vec<RunQueryEntry> = response.json().await?;

        let docs = entries
            .into_iter()
            .filter_map(|entry| entry.document)
            .map(decode_document)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(collection, count = docs.len(), "Firestore query complete");
        Ok(docs)
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.documents_url(), collection);
        let body = json!({ "fields": encode_fields(&fields) });

        let response = self.send(|client| client.post(&url).json(&body)).await?;
        let raw: RawDocument = response.json().await?;
        let doc = decode_document(raw)?;
        debug!(collection, id = %doc.id, "Firestore document created");
        Ok(doc.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        // No updateMask: the document's fields are replaced as a whole.
        // The precondition turns a missing id into 404 instead of an upsert.
        let url = self.document_url(collection, id);
        let body = json!({ "fields": encode_fields(&fields) });

        self.send(|client| {
            client
                .patch(&url)
                .query(&[("currentDocument.exists", "true")])
                .json(&body)
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        self.send(|client| client.delete(&url).query(&[("currentDocument.exists", "true")]))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Value codec
// ============================================================================

fn structured_query(collection: &str, filter: Option<&Filter>) -> Value {
    let mut query = json!({
        "from": [{ "collectionId": collection }],
    });
    if let Some(filter) = filter {
        query["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": filter.field },
                "op": "EQUAL",
                "value": encode_value(&filter.value),
            }
        });
    }
    json!({ "structuredQuery": query })
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| StoreError::InvalidResponse(format!("Not a typed value: {}", value)))?;

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(Value::from)
            .ok_or_else(|| StoreError::InvalidResponse(format!("Bad integerValue: {}", inner)))?,
        // NaN and infinities have no JSON form
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default(),
        ),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Value::Object(decode_fields(fields)?)
        }
        other => {
            return Err(StoreError::InvalidResponse(format!(
                "Unsupported Firestore value type: {}",
                other
            )))
        }
    };
    Ok(decoded)
}

fn decode_fields(fields: Map<String, Value>) -> Result<Fields, StoreError> {
    fields
        .into_iter()
        .map(|(k, v)| decode_value(&v).map(|decoded| (k, decoded)))
        .collect()
}

/// The document id is the last segment of its resource name.
fn decode_document(raw: RawDocument) -> Result<Document, StoreError> {
    let id = raw
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| StoreError::InvalidResponse(format!("Bad document name: {}", raw.name)))?
        .to_string();
    Ok(Document {
        id,
        fields: decode_fields(raw.fields)?,
    })
}
