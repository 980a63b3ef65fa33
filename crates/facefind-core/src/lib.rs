//! facefind-core — Photo normalization and person-name search.
//!
//! Normalizes source photos into size-bounded scratch rasters for face
//! detection, and resolves person-name queries against the face index into
//! files of the querying owner, either as native results or as documents for
//! a full-text-search aggregator.

pub mod documents;
pub mod normalizer;
pub mod orientation;
pub mod paths;
pub mod raster;
pub mod scratch;
pub mod search;
pub mod types;

pub use documents::{
    Aggregator, Document, ExternalDocumentAdapter, SearchRequest, SearchResultAccumulator,
};
pub use normalizer::{ImageNormalizer, NormalizeError, NormalizeOptions, UNSET_RATIO};
pub use paths::{without_begin_slash, LinkTemplate};
pub use scratch::{ScratchDir, ScratchStorage};
pub use search::{ResultResolver, SearchError};
pub use types::{FileId, ImageResult, ModelId, PersonMatchRecord, ResolvedFile};
