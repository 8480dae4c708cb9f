//! Format-neutral raw records.
//!
//! Both adapters produce these: the JSON adapter deserializes them directly
//! (field names follow the key-value encoding), the XML adapter builds them
//! from element attributes and children. The serializer writes them back out.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: JsonValue,
}

/// Properties arrive as a list of `{name, type, value}` records, or in old
/// files as a plain `{"name": value}` object whose entries carry no type.
fn properties_list<'de, D>(deserializer: D) -> Result<Option<Vec<RawProperty>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        List(Vec<RawProperty>),
        Legacy(JsonMap<String, JsonValue>),
    }

    Ok(Option::<Wire>::deserialize(deserializer)?.map(|wire| match wire {
        Wire::List(list) => list,
        Wire::Legacy(map) => map
            .into_iter()
            .map(|(name, value)| RawProperty {
                name,
                kind: None,
                value,
            })
            .collect(),
    }))
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawText {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fontfamily: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixelsize: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kerning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikeout: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ellipse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<RawText>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
}

impl RawObject {
    /// Overlays every field `template` defines onto `self`, except `id`.
    pub fn apply_template(&mut self, template: RawObject) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if template.$field.is_some() { self.$field = template.$field; })*
            };
        }
        overlay!(
            gid, name, kind, class, x, y, width, height, rotation, opacity, visible, ellipse,
            point, polygon, polyline, text, properties
        );
    }
}

/// Tile data as it appears on the wire: an integer array or an encoded string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTileData {
    Gids(Vec<u32>),
    Encoded(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChunk {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub data: RawTileData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLayer {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsetx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offsety: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallaxx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallaxy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tintcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeatx: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeaty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startx: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starty: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,

    // tile layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RawTileData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<RawChunk>>,

    // object groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draworder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<RawObject>>,

    // image layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparentcolor: Option<String>,

    // groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<RawLayer>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawFrame {
    pub tileid: u32,
    pub duration: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTile {
    pub id: u32,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Vec<RawFrame>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectgroup: Option<RawLayer>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawTileOffset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGrid {
    #[serde(default = "default_orientation")]
    pub orientation: String,
    pub width: u32,
    pub height: u32,
}

fn default_orientation() -> String {
    "orthogonal".to_owned()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawTransformations {
    #[serde(default)]
    pub hflip: bool,
    #[serde(default)]
    pub vflip: bool,
    #[serde(default)]
    pub rotate: bool,
    #[serde(default)]
    pub preferuntransformed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWangColor {
    #[serde(default)]
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub tile: i64,
    #[serde(default)]
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWangTile {
    pub tileid: u32,
    pub wangid: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawWangSet {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tile: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub colors: Vec<RawWangColor>,
    #[serde(default)]
    pub wangtiles: Vec<RawWangTile>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
}

/// A tileset record. In a map it is either a reference (`firstgid` +
/// `source`) or a fully embedded tileset carrying its own `firstgid`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTileset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstgid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilecount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiledversion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imageheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparentcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgroundcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectalignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilerendersize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fillmode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileoffset: Option<RawTileOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<RawGrid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<RawTransformations>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<RawTile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wangsets: Option<Vec<RawWangSet>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiledversion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderorder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilewidth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileheight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextlayerid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextobjectid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgroundcolor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hexsidelength: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staggeraxis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staggerindex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallaxoriginx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallaxoriginy: Option<f64>,
    #[serde(
        default,
        deserialize_with = "properties_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub properties: Option<Vec<RawProperty>>,
    #[serde(default)]
    pub tilesets: Vec<RawTileset>,
    #[serde(default)]
    pub layers: Vec<RawLayer>,
}

/// An object template: an object definition plus an optional tileset reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTemplate {
    pub object: RawObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tileset: Option<RawTileset>,
}

/// Renders a version field that may be a string or (in old files) a number.
pub(crate) fn version_text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Null => None,
        other => Some(other.to_string()),
    }
}
