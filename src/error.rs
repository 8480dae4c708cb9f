use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`MapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The wire data itself is malformed or uses an illegal combination.
    Format,
    /// An optional codec was not compiled in.
    MissingCapability,
    /// The call could not locate a referenced resource.
    Configuration,
    /// A field the encoding mandates is absent or holds an unusable value.
    Schema,
}

/// Error type for map, tileset and template loading.
#[derive(Debug, Error)]
pub enum MapError {
    /// A referenced file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A JSON document failed to parse.
    #[error("JSON parse error in {}: {source}", display_path(.path))]
    Json {
        /// Source document, if it came from a file.
        path: Option<PathBuf>,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An XML document failed to parse.
    #[error("XML parse error in {}: {source}", display_path(.path))]
    Xml {
        /// Source document, if it came from a file.
        path: Option<PathBuf>,
        /// Underlying error.
        source: roxmltree::Error,
    },

    /// Unknown encoding, or compression combined with a non-base64 encoding.
    #[error("invalid tile data encoding '{encoding}' with compression '{compression}'")]
    InvalidEncoding {
        /// Encoding as written in the document.
        encoding: String,
        /// Compression as written in the document.
        compression: String,
    },

    /// Tile data was not valid base64.
    #[error("invalid base64 tile data: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decompressing tile data failed.
    #[error("failed to {compression}-decompress tile data: {source}")]
    Decompress {
        /// Compression name.
        compression: &'static str,
        /// Underlying error.
        source: io::Error,
    },

    /// A flat tile sequence does not fold into whole rows.
    #[error("tile data of length {len} is not a multiple of row width {width}")]
    RaggedGrid {
        /// Number of decoded tile IDs.
        len: usize,
        /// Expected row width.
        width: usize,
    },

    /// A CSV token was not an unsigned integer.
    #[error("invalid tile id '{0}' in CSV data")]
    InvalidTileData(String),

    /// A layer record carried a type tag that is not a known layer kind.
    #[error("unknown layer type '{0}'")]
    UnknownLayerType(String),

    /// An optional codec was requested but is not compiled in.
    #[error("{capability} support is not available; enable the `{capability}` feature")]
    MissingCapability {
        /// Name of the missing capability.
        capability: &'static str,
    },

    /// An object references a template but no directory is known to resolve it from.
    #[error("object template '{template}' needs a parent directory to resolve against")]
    TemplateWithoutParentDir {
        /// Template path as written in the document.
        template: String,
    },

    /// A mandatory field is absent.
    #[error("{context} is missing required field '{field}'")]
    MissingField {
        /// Record that lacks the field.
        context: &'static str,
        /// Field name.
        field: &'static str,
    },

    /// A property uses a type tag outside the supported set.
    #[error("unsupported type '{kind}' for property '{name}'")]
    UnsupportedPropertyType {
        /// Property name.
        name: String,
        /// Type tag as written in the document.
        kind: String,
    },

    /// A field holds a value that cannot be interpreted.
    #[error("invalid value '{value}' for '{field}'")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Offending text.
        value: String,
    },
}

impl MapError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapError::Json { .. }
            | MapError::Xml { .. }
            | MapError::InvalidEncoding { .. }
            | MapError::Base64(_)
            | MapError::Decompress { .. }
            | MapError::RaggedGrid { .. }
            | MapError::InvalidTileData(_)
            | MapError::UnknownLayerType(_) => ErrorKind::Format,
            MapError::MissingCapability { .. } => ErrorKind::MissingCapability,
            MapError::Io { .. } | MapError::TemplateWithoutParentDir { .. } => {
                ErrorKind::Configuration
            }
            MapError::MissingField { .. }
            | MapError::UnsupportedPropertyType { .. }
            | MapError::InvalidValue { .. } => ErrorKind::Schema,
        }
    }

    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        MapError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "<memory>".to_owned(),
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MapError>;

/// Unwraps a mandatory raw field or reports which record lacks it.
pub(crate) fn required<T>(value: Option<T>, context: &'static str, field: &'static str) -> Result<T> {
    value.ok_or(MapError::MissingField { context, field })
}
