//! Person-name matches contributed to a full-text-search aggregator.
//!
//! The aggregator is shared by every provider taking part in one external
//! search. This adapter appends one document per resolved match and bumps the
//! running total by one each time; it never resets the total, so callers hand
//! in a freshly seeded accumulator per logical query.

use crate::paths::without_begin_slash;
use crate::search::{ModelSettings, OwnerFileTrees, PersonIndex, ResultResolver, SearchError};
use crate::types::ResolvedFile;
use serde::Serialize;
use std::collections::BTreeMap;

/// Provider id under which file documents are published.
pub const FILES_PROVIDER_ID: &str = "files";

/// Query window an aggregator was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    /// 1-indexed.
    pub page: u32,
    pub size: u32,
}

/// Value stored in a document's info map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    Text(String),
    Int(i64),
}

/// Generic search document understood by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub provider_id: String,
    pub id: String,
    pub title: String,
    pub link: String,
    pub info: BTreeMap<String, InfoValue>,
}

impl Document {
    pub fn new(provider_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            id: id.into(),
            title: String::new(),
            link: String::new(),
            info: BTreeMap::new(),
        }
    }

    pub fn set_info(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.info.insert(key.to_string(), InfoValue::Text(value.into()));
        self
    }

    pub fn set_info_int(&mut self, key: &str, value: i64) -> &mut Self {
        self.info.insert(key.to_string(), InfoValue::Int(value));
        self
    }

    pub fn info(&self, key: &str) -> Option<&InfoValue> {
        self.info.get(key)
    }
}

/// Collector that several search providers contribute documents to.
pub trait Aggregator {
    fn request(&self) -> &SearchRequest;
    fn add_document(&mut self, document: Document);
    fn total(&self) -> u64;
    fn set_total(&mut self, total: u64);
}

/// In-process aggregator for one logical query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultAccumulator {
    request: SearchRequest,
    documents: Vec<Document>,
    total: u64,
}

impl SearchResultAccumulator {
    /// Empty accumulator with a total of zero.
    pub fn new(request: SearchRequest) -> Self {
        Self::seeded(request, 0)
    }

    /// Accumulator whose total already counts results from earlier providers.
    pub fn seeded(request: SearchRequest, total: u64) -> Self {
        Self {
            request,
            documents: Vec::new(),
            total,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

impl Aggregator for SearchResultAccumulator {
    fn request(&self) -> &SearchRequest {
        &self.request
    }

    fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn set_total(&mut self, total: u64) {
        self.total = total;
    }
}

/// Feeds person-name matches into an [`Aggregator`].
pub struct ExternalDocumentAdapter<'r, I, M, T> {
    resolver: &'r ResultResolver<I, M, T>,
    provider_id: String,
}

impl<'r, I, M, T> ExternalDocumentAdapter<'r, I, M, T>
where
    I: PersonIndex,
    M: ModelSettings,
    T: OwnerFileTrees,
{
    pub fn new(resolver: &'r ResultResolver<I, M, T>) -> Self {
        Self {
            resolver,
            provider_id: FILES_PROVIDER_ID.to_string(),
        }
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    /// Answer the aggregator's request for `owner`, returning the number of
    /// documents added.
    pub fn handle<A: Aggregator>(
        &self,
        owner: Option<&str>,
        aggregator: &mut A,
    ) -> Result<usize, SearchError> {
        let request = aggregator.request().clone();
        let files =
            self.resolver
                .resolve_page(owner, &request.query, request.page, request.size)?;

        let added = files.len();
        for file in &files {
            aggregator.add_document(self.document(file));
            aggregator.set_total(aggregator.total() + 1);
        }

        tracing::debug!(
            query = %request.query,
            page = request.page,
            added,
            total = aggregator.total(),
            "documents contributed to aggregator"
        );
        Ok(added)
    }

    fn document(&self, file: &ResolvedFile) -> Document {
        let mut document = Document::new(&self.provider_id, file.file_id.to_string());

        document
            .set_info("type", file.kind.as_str())
            .set_info("dir", &file.directory)
            .set_info("file", &file.name)
            .set_info("path", &file.path)
            .set_info("mime", &file.mime_type);

        if let Some(size) = file.size {
            document.set_info_int("size", i64::try_from(size).unwrap_or(i64::MAX));
        }
        if let Some(mtime) = file.mtime {
            document.set_info_int("mtime", mtime);
        }
        if let Some(etag) = &file.etag {
            document.set_info("etag", etag);
        }
        if let Some(permissions) = file.permissions {
            document.set_info_int("permissions", permissions.into());
        }

        document.title = without_begin_slash(&file.path, false, true);
        document.link = self.resolver.links().render(&file.directory, &file.name);
        document
    }
}
