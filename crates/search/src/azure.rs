//! Azure AI Search backend (REST).
//!
//! Endpoints used, all authenticated with the `api-key` header:
//! - `POST /indexes/{index}/docs/search` for queries and full listings
//! - `POST /indexes/{index}/docs/index` for upserts and deletes
//! - `PUT /indexes/{index}` to create or update the schema

use async_trait::async_trait;
use docchat_config::SearchConfig;
use docchat_core::error::SearchError;
use docchat_core::search::{SearchHit, SearchIndex, SearchQuery, SearchRecord};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

/// Rows requested per page when listing the whole index.
const LIST_PAGE_SIZE: usize = 1000;

/// A single Azure AI Search index.
pub struct AzureSearchIndex {
    endpoint: String,
    index_name: String,
    api_version: String,
    api_key: String,
    highlight_pre_tag: String,
    highlight_post_tag: String,
    client: reqwest::Client,
}

impl AzureSearchIndex {
    /// Create a client for `index_name` on the service at `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let defaults = SearchConfig::default();
        Self::build(
            endpoint.into(),
            index_name.into(),
            api_key.into(),
            &defaults,
        )
    }

    /// Build from the `[search]` config section.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let endpoint = config.resolved_endpoint().ok_or_else(|| {
            SearchError::NotConfigured(
                "set search.endpoint, search.service_name or AZURE_SEARCH_SERVICE_NAME".into(),
            )
        })?;
        let api_key = config.api_key.clone().ok_or_else(|| {
            SearchError::NotConfigured("set search.api_key or AZURE_SEARCH_KEY".into())
        })?;

        Self::build(endpoint, config.index_name.clone(), api_key, config)
    }

    fn build(
        endpoint: String,
        index_name: String,
        api_key: String,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            index_name,
            api_version: config.api_version.clone(),
            api_key,
            highlight_pre_tag: config.highlight_pre_tag.clone(),
            highlight_post_tag: config.highlight_post_tag.clone(),
            client,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn docs_url(&self, operation: &str) -> String {
        format!("{}/indexes/{}/docs/{operation}", self.endpoint, self.index_name)
    }

    /// Create the index, or update its definition if it already exists.
    pub async fn create_or_update_index(&self) -> Result<(), SearchError> {
        let url = format!("{}/indexes/{}", self.endpoint, self.index_name);
        let definition = index_definition(&self.index_name);

        debug!(index = %self.index_name, "Creating or updating index definition");

        let response = self
            .client
            .put(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&definition)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, SearchError> {
        let response = self
            .client
            .post(url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        check_status(response).await
    }

    async fn search(&self, body: Value) -> Result<Vec<SearchHit>, SearchError> {
        let response = self.post(&self.docs_url("search"), &body).await?;
        let parsed: ApiSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        Ok(parsed.value.into_iter().map(hit_from_document).collect())
    }

    /// Send an index batch and fail if any document was rejected.
    async fn index_batch(&self, actions: Vec<Value>) -> Result<(), SearchError> {
        let count = actions.len();
        let body = json!({ "value": actions });
        let response = self.post(&self.docs_url("index"), &body).await?;

        let parsed: ApiIndexResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let failures: Vec<&ApiIndexResult> = parsed.value.iter().filter(|r| !r.status).collect();
        if let Some(first) = failures.first() {
            warn!(failed = failures.len(), total = count, "Index batch partially rejected");
            return Err(SearchError::PartialFailure {
                failed: failures.len(),
                first_error: format!(
                    "{}: {}",
                    first.key,
                    first.error_message.as_deref().unwrap_or("unknown error")
                ),
            });
        }

        debug!(documents = count, "Index batch accepted");
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for AzureSearchIndex {
    fn name(&self) -> &str {
        "azure-search"
    }

    async fn query(&self, query: SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let mut body = json!({
            "search": query.text,
            "top": query.top,
        });

        if !query.select.is_empty() {
            body["select"] = json!(query.select.join(","));
        }
        if let Some(filter) = &query.filter {
            body["filter"] = json!(filter);
        }
        if !query.highlight_fields.is_empty() {
            body["highlight"] = json!(query.highlight_fields.join(","));
            body["highlightPreTag"] = json!(self.highlight_pre_tag);
            body["highlightPostTag"] = json!(self.highlight_post_tag);
        }

        debug!(index = %self.index_name, top = query.top, "Querying index");
        self.search(body).await
    }

    async fn upsert(&self, records: Vec<SearchRecord>) -> Result<(), SearchError> {
        if records.is_empty() {
            return Ok(());
        }

        let actions = records
            .iter()
            .map(|record| {
                let mut doc = match serde_json::to_value(record) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => Map::new(),
                    Err(e) => return Err(SearchError::InvalidResponse(e.to_string())),
                };
                doc.insert("@search.action".into(), json!("mergeOrUpload"));
                Ok(Value::Object(doc))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.index_batch(actions).await
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), SearchError> {
        if ids.is_empty() {
            return Ok(());
        }

        let actions = ids
            .into_iter()
            .map(|id| json!({ "@search.action": "delete", "id": id }))
            .collect();

        self.index_batch(actions).await
    }

    async fn list_all(&self, fields: &[&str]) -> Result<Vec<SearchHit>, SearchError> {
        let mut all = Vec::new();

        loop {
            let mut body = json!({
                "search": "*",
                "top": LIST_PAGE_SIZE,
                "skip": all.len(),
            });
            if !fields.is_empty() {
                body["select"] = json!(fields.join(","));
            }

            let page = self.search(body).await?;
            let fetched = page.len();
            all.extend(page);

            debug!(fetched, total = all.len(), "Listed index page");
            if fetched < LIST_PAGE_SIZE {
                break;
            }
        }

        Ok(all)
    }
}

/// Map a non-success status to a [`SearchError`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
    let status = response.status().as_u16();

    if status == 401 || status == 403 {
        return Err(SearchError::AuthenticationFailed(
            "Invalid api-key or insufficient permissions".into(),
        ));
    }

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(status, body = %body, "Search service returned error");
        return Err(SearchError::ApiError {
            status_code: status,
            message: body,
        });
    }

    Ok(response)
}

/// Turn one raw result document into a typed hit.
fn hit_from_document(mut doc: Map<String, Value>) -> SearchHit {
    let score = doc
        .remove("@search.score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    let highlights = doc
        .remove("@search.highlights")
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let text = |doc: &mut Map<String, Value>, key: &str| {
        doc.remove(key).and_then(|v| v.as_str().map(String::from))
    };

    SearchHit {
        id: text(&mut doc, "id"),
        content: text(&mut doc, "content"),
        title: text(&mut doc, "title"),
        section: text(&mut doc, "section"),
        page_number: doc
            .remove("page_number")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok()),
        score,
        highlights,
    }
}

/// Schema matching [`SearchRecord`].
fn index_definition(index_name: &str) -> Value {
    json!({
        "name": index_name,
        "fields": [
            { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
            { "name": "content", "type": "Edm.String", "searchable": true },
            { "name": "title", "type": "Edm.String", "searchable": true, "filterable": true },
            { "name": "section", "type": "Edm.String", "filterable": true, "facetable": true },
            { "name": "page_number", "type": "Edm.Int32", "filterable": true, "sortable": true },
            { "name": "last_modified", "type": "Edm.DateTimeOffset", "filterable": true, "sortable": true }
        ]
    })
}

// --- Azure AI Search API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiIndexResponse {
    #[serde(default)]
    value: Vec<ApiIndexResult>,
}

#[derive(Debug, Deserialize)]
struct ApiIndexResult {
    key: String,
    status: bool,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}
