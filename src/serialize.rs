//! Canonical model back to key-value (JSON) wire records.
//!
//! Optional fields holding their default are left out. Paths are written as
//! stored, i.e. already joined onto the document directory they were read from.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{MapError, Result};
use crate::layer::{self, Layer};
use crate::map::{self, Map};
use crate::object::{self, TiledObject};
use crate::properties::{self, Properties};
use crate::tileset::{self, Tileset};

fn to_value<T: Serialize>(raw: &T) -> Result<JsonValue> {
    serde_json::to_value(raw).map_err(|source| MapError::Json { path: None, source })
}

fn tag(mut value: JsonValue, kind: &str) -> JsonValue {
    if let JsonValue::Object(fields) = &mut value {
        fields.insert("type".to_owned(), JsonValue::from(kind));
    }
    value
}

/// Serializes a map, embedding every tileset with its firstgid.
pub fn serialize_map(map: &Map) -> Result<JsonValue> {
    Ok(tag(to_value(&map::to_raw(map)?)?, "map"))
}

/// Serializes a standalone tileset.
pub fn serialize_tileset(tileset: &Tileset) -> Result<JsonValue> {
    Ok(tag(to_value(&tileset::to_raw(tileset, None)?)?, "tileset"))
}

/// Serializes a layer, re-encoding tile data with the layer's own encoding
/// and compression.
pub fn serialize_layer(layer: &Layer) -> Result<JsonValue> {
    to_value(&layer::to_raw(layer)?)
}

/// Serializes an object.
pub fn serialize_object(object: &TiledObject) -> Result<JsonValue> {
    to_value(&object::to_raw(object))
}

/// Serializes properties as a list of `{name, type, value}` records.
pub fn serialize_properties(properties: &Properties) -> Result<JsonValue> {
    to_value(&properties::to_raw(properties).unwrap_or_default())
}
