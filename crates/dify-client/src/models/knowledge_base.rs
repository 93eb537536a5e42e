//! Knowledge base (dataset) endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ResultResponse;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::request::{FilePart, Request};

// ─────────────────────────────────────────────────────────────────────────────
// Datasets
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /datasets`
#[derive(Debug, Clone, Default)]
pub struct ListDatasets {
    page: Option<u32>,
    limit: Option<u32>,
    keyword: Option<String>,
    tag_ids: Vec<String>,
    include_all: Option<bool>,
}

impl ListDatasets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Filter by tag; may be given several times.
    pub fn tag_id(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_ids.push(tag_id.into());
        self
    }

    pub fn include_all(mut self, include_all: bool) -> Self {
        self.include_all = Some(include_all);
        self
    }
}

impl Endpoint for ListDatasets {
    type Output = DatasetList;

    fn to_request(&self) -> Result<Request> {
        let builder = Request::get("/datasets")
            .query_opt("page", self.page)
            .query_opt("limit", self.limit)
            .query_opt("keyword", self.keyword.as_ref())
            .query_opt("include_all", self.include_all);

        Ok(self
            .tag_ids
            .iter()
            .fold(builder, |b, tag| b.query("tag_ids", tag))
            .build())
    }
}

/// A knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default)]
    pub data_source_type: Option<String>,
    #[serde(default)]
    pub indexing_technique: Option<String>,
    #[serde(default)]
    pub app_count: u32,
    #[serde(default)]
    pub document_count: u32,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Page of datasets.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetList {
    pub data: Vec<Dataset>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
}

/// `GET /datasets/:dataset_id`
#[derive(Debug, Clone)]
pub struct GetDataset {
    dataset_id: String,
}

impl GetDataset {
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
        }
    }
}

impl Endpoint for GetDataset {
    type Output = Dataset;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::get("/datasets/:dataset_id")
            .path("dataset_id", &self.dataset_id)
            .build())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Indexing settings sent with a new document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_technique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_language: Option<String>,
    /// Segmentation rules; `{"mode": "automatic"}` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_rule: Option<Value>,
}

/// `POST /datasets/:dataset_id/document/create-by-file` (multipart)
#[derive(Debug, Clone)]
pub struct CreateDocumentByFile {
    dataset_id: String,
    file: FilePart,
    settings: DocumentSettings,
}

impl CreateDocumentByFile {
    pub fn new(dataset_id: impl Into<String>, file: FilePart) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            file,
            settings: DocumentSettings::default(),
        }
    }

    pub fn settings(mut self, settings: DocumentSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl Endpoint for CreateDocumentByFile {
    type Output = DocumentResponse;

    fn to_request(&self) -> Result<Request> {
        let mut settings = self.settings.clone();
        if settings.process_rule.is_none() {
            settings.process_rule = Some(serde_json::json!({"mode": "automatic"}));
        }

        // The server expects the settings as a JSON string in the `data` field.
        Ok(Request::post("/datasets/:dataset_id/document/create-by-file")
            .path("dataset_id", &self.dataset_id)
            .field("data", serde_json::to_string(&settings)?)
            .file("file", self.file.clone())
            .build())
    }
}

/// A document inside a dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub data_source_type: Option<String>,
    #[serde(default)]
    pub indexing_status: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub created_at: i64,
}

/// Created document and its indexing batch.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentResponse {
    pub document: Document,
    #[serde(default)]
    pub batch: String,
}

/// `DELETE /datasets/:dataset_id/documents/:document_id`
#[derive(Debug, Clone)]
pub struct DeleteDocument {
    dataset_id: String,
    document_id: String,
}

impl DeleteDocument {
    pub fn new(dataset_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            document_id: document_id.into(),
        }
    }
}

impl Endpoint for DeleteDocument {
    type Output = ResultResponse;

    fn to_request(&self) -> Result<Request> {
        Ok(Request::delete("/datasets/:dataset_id/documents/:document_id")
            .path("dataset_id", &self.dataset_id)
            .path("document_id", &self.document_id)
            .build())
    }
}
