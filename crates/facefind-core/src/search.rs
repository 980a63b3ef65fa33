//! Person-name search over the face index.
//!
//! A query runs in three steps: the owner's active recognition model is
//! looked up, the index is asked for photos whose person name matches, and
//! every match is resolved to a path inside the owner's file tree. Matches
//! whose file has disappeared since indexing are dropped silently, so a page
//! may hold fewer than `size` entries. Any other file-tree failure aborts the
//! query.

use crate::paths::{directory_of, without_begin_slash, LinkTemplate};
use crate::types::{FileId, FileKind, ImageResult, ModelId, PersonMatchRecord, ResolvedFile};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("no authenticated owner")]
    AuthenticationRequired,
    #[error("no active recognition model for {owner}")]
    ModelUnavailable { owner: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    FileTree(#[from] FileTreeError),
}

/// Failure of the person index itself.
#[derive(Error, Debug)]
#[error("index query failed: {0}")]
pub struct IndexError(pub String);

#[derive(Error, Debug)]
pub enum FileTreeError {
    #[error("file {0} not found")]
    NotFound(FileId),
    #[error("path {0} not found")]
    PathNotFound(String),
    #[error("file tree: {0}")]
    Other(String),
}

/// A best-effort metadata field could not be fetched.
#[derive(Error, Debug)]
#[error("{field} unavailable: {reason}")]
pub struct MetadataError {
    pub field: &'static str,
    pub reason: String,
}

/// Person ↔ photo index.
pub trait PersonIndex {
    /// Records whose person name contains `query` (case-insensitively),
    /// scoped to `(owner, model)`, in index order.
    fn find_matches(
        &self,
        owner: &str,
        model: ModelId,
        query: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PersonMatchRecord>, IndexError>;
}

/// Source of the active recognition model per owner.
pub trait ModelSettings {
    /// `None` when no model is configured for `owner`.
    fn current_model_id(&self, owner: &str) -> Option<ModelId>;
}

/// Metadata of one file. The fallible accessors are best-effort.
pub trait FileMetadata {
    fn name(&self) -> String;
    fn kind(&self) -> FileKind;
    fn mime_type(&self) -> String;
    fn size(&self) -> Result<u64, MetadataError>;
    fn mtime(&self) -> Result<i64, MetadataError>;
    fn etag(&self) -> Result<String, MetadataError>;
    fn permissions(&self) -> Result<u32, MetadataError>;
}

/// View of a single owner's files.
pub trait ScopedFileTree {
    fn path(&self, file_id: FileId) -> Result<String, FileTreeError>;
    fn file_info(&self, path: &str) -> Result<Box<dyn FileMetadata>, FileTreeError>;
}

/// Hands out the file tree of a given owner.
pub trait OwnerFileTrees {
    fn tree_for(&self, owner: &str) -> Box<dyn ScopedFileTree + '_>;
}

/// 1-indexed page window converted to an index offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub offset: u64,
    pub limit: u64,
}

impl Paging {
    pub fn new(page: u32, size: u32) -> Result<Self, SearchError> {
        if page == 0 {
            return Err(SearchError::InvalidArgument("page starts at 1".into()));
        }
        if size == 0 {
            return Err(SearchError::InvalidArgument("page size must be positive".into()));
        }
        Ok(Self {
            offset: (page as u64 - 1) * size as u64,
            limit: size as u64,
        })
    }
}

/// Resolves person-name queries into files of the querying owner.
pub struct ResultResolver<I, M, T> {
    index: I,
    settings: M,
    trees: T,
    links: LinkTemplate,
}

impl<I, M, T> ResultResolver<I, M, T>
where
    I: PersonIndex,
    M: ModelSettings,
    T: OwnerFileTrees,
{
    pub fn new(index: I, settings: M, trees: T) -> Self {
        Self {
            index,
            settings,
            trees,
            links: LinkTemplate::default(),
        }
    }

    pub fn with_links(mut self, links: LinkTemplate) -> Self {
        self.links = links;
        self
    }

    pub fn links(&self) -> &LinkTemplate {
        &self.links
    }

    /// Native results for `query` on page `page` (1-indexed) of `size` entries.
    pub fn search_paged(
        &self,
        owner: Option<&str>,
        query: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<ImageResult>, SearchError> {
        let files = self.resolve_page(owner, query, page, size)?;
        Ok(files.iter().map(|file| self.image_result(file)).collect())
    }

    /// Run the index query and resolve every match, keeping index order.
    pub fn resolve_page(
        &self,
        owner: Option<&str>,
        query: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<ResolvedFile>, SearchError> {
        let owner = owner.ok_or(SearchError::AuthenticationRequired)?;
        let paging = Paging::new(page, size)?;
        let model = self
            .settings
            .current_model_id(owner)
            .ok_or_else(|| SearchError::ModelUnavailable {
                owner: owner.to_string(),
            })?;

        let records =
            self.index
                .find_matches(owner, model, query, paging.offset, paging.limit)?;
        tracing::debug!(
            owner,
            model,
            query,
            offset = paging.offset,
            limit = paging.limit,
            matches = records.len(),
            "person index queried"
        );

        let tree = self.trees.tree_for(owner);
        let mut resolved = Vec::with_capacity(records.len());
        for record in &records {
            if let Some(file) = resolve_record(tree.as_ref(), record)? {
                resolved.push(file);
            }
        }

        if resolved.len() < records.len() {
            tracing::debug!(
                owner,
                dropped = records.len() - resolved.len(),
                "stale index entries skipped"
            );
        }
        Ok(resolved)
    }

    fn image_result(&self, file: &ResolvedFile) -> ImageResult {
        ImageResult {
            id: file.file_id,
            name: file.name.clone(),
            path: without_begin_slash(&file.path, false, true),
            link: self.links.render(&file.directory, &file.name),
            result_type: "image",
            mime_type: file.mime_type.clone(),
            size: file.size,
            mtime: file.mtime,
            permissions: file.permissions,
        }
    }
}

/// Resolve one record, or `None` when its file can no longer be found.
fn resolve_record(
    tree: &dyn ScopedFileTree,
    record: &PersonMatchRecord,
) -> Result<Option<ResolvedFile>, FileTreeError> {
    let path = match tree.path(record.file_id) {
        Ok(path) => path,
        Err(e) => return skip_missing(record.file_id, e),
    };
    let info = match tree.file_info(&path) {
        Ok(info) => info,
        Err(e) => return skip_missing(record.file_id, e),
    };

    let name = info.name();
    Ok(Some(ResolvedFile {
        file_id: record.file_id,
        directory: directory_of(&path, &name),
        kind: info.kind(),
        mime_type: info.mime_type(),
        size: best_effort(record.file_id, info.size()),
        mtime: best_effort(record.file_id, info.mtime()),
        etag: best_effort(record.file_id, info.etag()),
        permissions: best_effort(record.file_id, info.permissions()),
        name,
        path,
    }))
}

/// A missing file is skipped; anything else is passed up.
fn skip_missing(
    file_id: FileId,
    error: FileTreeError,
) -> Result<Option<ResolvedFile>, FileTreeError> {
    match error {
        FileTreeError::NotFound(_) | FileTreeError::PathNotFound(_) => {
            tracing::debug!(file_id, error = %error, "skipping match");
            Ok(None)
        }
        FileTreeError::Other(_) => {
            tracing::warn!(file_id, error = %error, "file tree failure");
            Err(error)
        }
    }
}

fn best_effort<V>(file_id: FileId, value: Result<V, MetadataError>) -> Option<V> {
    value
        .map_err(|e| tracing::debug!(file_id, error = %e, "partial metadata"))
        .ok()
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory collaborators shared by the search tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    /// Case-insensitive substring match, as the person index applies it.
    pub fn person_name_matches(name: &str, query: &str) -> bool {
        name.to_lowercase().contains(&query.to_lowercase())
    }

    #[derive(Default)]
    pub struct FakeIndex {
        pub records: Vec<(String, PersonMatchRecord)>,
        pub calls: RefCell<Vec<(String, ModelId, String, u64, u64)>>,
        pub fail: bool,
    }

    impl FakeIndex {
        pub fn with_people(owner: &str, model: ModelId, people: &[(FileId, &str)]) -> Self {
            Self {
                records: people
                    .iter()
                    .map(|&(file_id, name)| {
                        (
                            owner.to_string(),
                            PersonMatchRecord {
                                file_id,
                                person_name: name.to_string(),
                                model_id: model,
                            },
                        )
                    })
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl PersonIndex for FakeIndex {
        fn find_matches(
            &self,
            owner: &str,
            model: ModelId,
            query: &str,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<PersonMatchRecord>, IndexError> {
            self.calls
                .borrow_mut()
                .push((owner.to_string(), model, query.to_string(), offset, limit));
            if self.fail {
                return Err(IndexError("database is locked".into()));
            }
            Ok(self
                .records
                .iter()
                .filter(|(o, r)| {
                    o == owner && r.model_id == model && person_name_matches(&r.person_name, query)
                })
                .map(|(_, r)| r.clone())
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }
    }

    pub struct FakeSettings(pub HashMap<String, ModelId>);

    impl FakeSettings {
        pub fn single(owner: &str, model: ModelId) -> Self {
            Self(HashMap::from([(owner.to_string(), model)]))
        }
    }

    impl ModelSettings for FakeSettings {
        fn current_model_id(&self, owner: &str) -> Option<ModelId> {
            self.0.get(owner).copied()
        }
    }

    #[derive(Clone)]
    pub struct FakeInfo {
        pub name: String,
        pub size: Option<u64>,
        pub mtime: Option<i64>,
        pub etag: Option<String>,
        pub permissions: Option<u32>,
    }

    fn field<V: Clone>(field: &'static str, value: &Option<V>) -> Result<V, MetadataError> {
        value.clone().ok_or(MetadataError {
            field,
            reason: "storage backend unavailable".into(),
        })
    }

    impl FileMetadata for FakeInfo {
        fn name(&self) -> String {
            self.name.clone()
        }
        fn kind(&self) -> FileKind {
            FileKind::File
        }
        fn mime_type(&self) -> String {
            "image/jpeg".into()
        }
        fn size(&self) -> Result<u64, MetadataError> {
            field("size", &self.size)
        }
        fn mtime(&self) -> Result<i64, MetadataError> {
            field("mtime", &self.mtime)
        }
        fn etag(&self) -> Result<String, MetadataError> {
            field("etag", &self.etag)
        }
        fn permissions(&self) -> Result<u32, MetadataError> {
            field("permissions", &self.permissions)
        }
    }

    /// Files per owner: file id → path, plus per-path metadata.
    #[derive(Default)]
    pub struct FakeTrees {
        pub paths: HashMap<String, HashMap<FileId, String>>,
        pub infos: HashMap<String, FakeInfo>,
        pub broken: HashSet<FileId>,
    }

    impl FakeTrees {
        pub fn add(&mut self, owner: &str, file_id: FileId, path: &str) {
            let name = path.rsplit('/').next().unwrap_or(path).to_string();
            self.paths
                .entry(owner.to_string())
                .or_default()
                .insert(file_id, path.to_string());
            self.infos.insert(
                path.to_string(),
                FakeInfo {
                    name,
                    size: Some(1024 + file_id),
                    mtime: Some(1_600_000_000 + file_id as i64),
                    etag: Some(format!("etag-{file_id}")),
                    permissions: Some(27),
                },
            );
        }
    }

    pub struct FakeTree<'a> {
        paths: Option<&'a HashMap<FileId, String>>,
        infos: &'a HashMap<String, FakeInfo>,
        broken: &'a HashSet<FileId>,
    }

    impl ScopedFileTree for FakeTree<'_> {
        fn path(&self, file_id: FileId) -> Result<String, FileTreeError> {
            if self.broken.contains(&file_id) {
                return Err(FileTreeError::Other("storage offline".into()));
            }
            self.paths
                .and_then(|paths| paths.get(&file_id))
                .cloned()
                .ok_or(FileTreeError::NotFound(file_id))
        }

        fn file_info(&self, path: &str) -> Result<Box<dyn FileMetadata>, FileTreeError> {
            self.infos
                .get(path)
                .map(|info| Box::new(info.clone()) as Box<dyn FileMetadata>)
                .ok_or_else(|| FileTreeError::PathNotFound(path.to_string()))
        }
    }

    impl OwnerFileTrees for FakeTrees {
        fn tree_for(&self, owner: &str) -> Box<dyn ScopedFileTree + '_> {
            Box::new(FakeTree {
                paths: self.paths.get(owner),
                infos: &self.infos,
                broken: &self.broken,
            })
        }
    }
}
