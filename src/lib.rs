#![warn(missing_docs)]

//! Tiled map and tileset loader.
//!
//! Reads both wire encodings, XML (`.tmx`/`.tsx`/`.tx`) and key-value JSON
//! (`.tmj`/`.tsj`/`.tj`), into one canonical [`Map`] model. Tile data is
//! decoded from CSV or base64 (optionally gzip, zlib or, with the `zstd`
//! feature, zstd compressed), external tilesets are memoized per path, and
//! object templates are merged into their instances. The `serialize_*`
//! functions write the model back out as JSON.
//!
//! ```no_run
//! let map = tiled_loader::parse_map("assets/level1.tmx")?;
//! for layer in map.walk_layers() {
//!     println!("{} ({})", layer.name, layer.id);
//! }
//! # Ok::<(), tiled_loader::MapError>(())
//! ```

use std::path::Path;

mod common;
mod error;
mod gid;
mod layer;
mod loader;
mod map;
mod object;
mod properties;
mod raw;
mod serialize;
mod tile_grid;
mod tileset;
mod wang_set;

pub use common::{Color, OrderedPair, Size};
pub use error::{ErrorKind, MapError, Result};
pub use gid::{Gid, GidRegistry, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
pub use layer::{DrawOrder, ImageLayer, Layer, LayerKind, ObjectLayer, TileData, TileLayer};
pub use loader::{Format, Loader, TilesetCache};
pub use map::{Map, Orientation, RenderOrder, StaggerAxis, StaggerIndex};
pub use object::{HorizontalAlignment, ObjectShape, Text, TiledObject, VerticalAlignment};
pub use properties::{Properties, PropertyValue};
pub use serialize::{
    serialize_layer, serialize_map, serialize_object, serialize_properties, serialize_tileset,
};
pub use tile_grid::{decode, encode, fold_rows, Chunk, Compression, Encoding, TileGrid};
pub use tileset::{Frame, Grid, GridOrientation, Terrain, Tile, Tileset, Transformations};
pub use wang_set::{WangColor, WangSet, WangSetKind, WangTile};

/// Loads a map file of either encoding with the process-wide [`Loader`].
pub fn parse_map(path: impl AsRef<Path>) -> Result<Map> {
    Loader::shared().load_map(path)
}

/// Loads a standalone tileset file with the process-wide [`Loader`].
pub fn parse_tileset(path: impl AsRef<Path>) -> Result<Tileset> {
    Loader::shared().load_tileset(path)
}

/// Parses an in-memory map document. Relative references resolve against
/// `base_dir`.
pub fn parse_map_str(text: &str, base_dir: Option<&Path>) -> Result<Map> {
    Loader::shared().parse_map_str(text, base_dir)
}

/// Parses an in-memory tileset document.
pub fn parse_tileset_str(text: &str, base_dir: Option<&Path>) -> Result<Tileset> {
    Loader::shared().parse_tileset_str(text, base_dir)
}
