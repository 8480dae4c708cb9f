// Key-value (JSON) encoding: the raw records mirror its field names, so this
// adapter is serde plus error context.
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{MapError, Result};
use crate::raw::{RawMap, RawTemplate, RawTileset};

fn decode<T: DeserializeOwned>(text: &str, path: Option<&Path>) -> Result<T> {
    serde_json::from_str(text).map_err(|source| MapError::Json {
        path: path.map(Path::to_path_buf),
        source,
    })
}

pub(crate) fn map_from_str(text: &str, path: Option<&Path>) -> Result<RawMap> {
    decode(text, path)
}

pub(crate) fn tileset_from_str(text: &str, path: Option<&Path>) -> Result<RawTileset> {
    decode(text, path)
}

pub(crate) fn template_from_str(text: &str, path: Option<&Path>) -> Result<RawTemplate> {
    decode(text, path)
}
