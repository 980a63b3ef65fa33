use serde::{Deserialize, Serialize};

/// Stable identifier of a stored file.
pub type FileId = u64;

/// Identifier of a recognition model; selects the index partition a query reads.
pub type ModelId = u32;

/// Index entry linking a recognized person to one stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonMatchRecord {
    pub file_id: FileId,
    pub person_name: String,
    pub model_id: ModelId,
}

/// Node type of a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Dir,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Dir => "dir",
        }
    }
}

/// A match record resolved to a concrete path inside one owner's file tree.
///
/// The optional fields are best-effort: a failure fetching them leaves them
/// unset without dropping the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    pub file_id: FileId,
    /// Path relative to the owner's file tree, with a leading separator.
    pub path: String,
    pub name: String,
    /// `path` minus `name`, keeping the trailing separator.
    pub directory: String,
    pub kind: FileKind,
    pub mime_type: String,
    pub size: Option<u64>,
    pub mtime: Option<i64>,
    pub etag: Option<String>,
    pub permissions: Option<u32>,
}

/// Native search result for a photo, as listed by the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub id: FileId,
    pub name: String,
    /// Path relative to the owner's file tree, without a leading separator.
    pub path: String,
    pub link: String,
    #[serde(rename = "type")]
    pub result_type: &'static str,
    pub mime_type: String,
    pub size: Option<u64>,
    pub mtime: Option<i64>,
    pub permissions: Option<u32>,
}
