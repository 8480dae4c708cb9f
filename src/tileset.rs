//! Tileset and tile records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::warn;

use crate::common::{parse_color_opt, Color, OrderedPair};
use crate::error::{required, MapError, Result};
use crate::layer::{Layer, LayerParser};
use crate::loader::{join_dir, Loader};
use crate::properties::{self, Properties};
use crate::raw::{
    version_text, RawFrame, RawGrid, RawTile, RawTileOffset, RawTileset, RawTransformations,
};
use crate::wang_set::{self, WangSet};

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Local id of the tile shown during this frame.
    pub tile_id: u32,
    /// Duration in milliseconds.
    pub duration: u32,
}

/// Legacy terrain index per corner; `None` where the corner has no terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Terrain {
    /// Top-left corner.
    pub top_left: Option<u32>,
    /// Top-right corner.
    pub top_right: Option<u32>,
    /// Bottom-left corner.
    pub bottom_left: Option<u32>,
    /// Bottom-right corner.
    pub bottom_right: Option<u32>,
}

/// Metadata for a single tile of a tileset.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Local id within the owning tileset.
    pub id: u32,
    /// Name of the owning tileset. Look the tileset up through the map's
    /// [`GidRegistry`](crate::GidRegistry) rather than holding it here.
    pub tileset: String,
    /// Class (older files call it `type`).
    pub class: Option<String>,
    /// Relative weight when the editor picks random tiles.
    pub probability: f64,
    /// Per-tile image, for image collection tilesets.
    pub image: Option<PathBuf>,
    /// Per-tile image width in pixels.
    pub image_width: Option<u32>,
    /// Per-tile image height in pixels.
    pub image_height: Option<u32>,
    /// Animation frames, in play order.
    pub animation: Vec<Frame>,
    /// Legacy terrain corners.
    pub terrain: Option<Terrain>,
    /// Collision shapes, an object layer.
    pub objects: Option<Layer>,
    /// Custom properties.
    pub properties: Properties,
}

/// Orientation of the grid used when tile images are larger than the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridOrientation {
    /// Rectangular cells.
    #[default]
    Orthogonal,
    /// Diamond cells.
    Isometric,
}

impl FromStr for GridOrientation {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "orthogonal" => Ok(GridOrientation::Orthogonal),
            "isometric" => Ok(GridOrientation::Isometric),
            other => Err(MapError::invalid("grid orientation", other)),
        }
    }
}

impl fmt::Display for GridOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GridOrientation::Orthogonal => "orthogonal",
            GridOrientation::Isometric => "isometric",
        })
    }
}

/// Grid overlay settings of a tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Cell shape.
    pub orientation: GridOrientation,
    /// Cell width in pixels.
    pub width: u32,
    /// Cell height in pixels.
    pub height: u32,
}

/// Which transformations the editor may apply to tiles of this tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transformations {
    /// Horizontal flip allowed.
    pub hflip: bool,
    /// Vertical flip allowed.
    pub vflip: bool,
    /// 90 degree rotation allowed.
    pub rotate: bool,
    /// Untransformed tiles are preferred.
    pub prefer_untransformed: bool,
}

/// A tileset: either one spritesheet image or a collection of per-tile images.
#[derive(Debug, Clone, PartialEq)]
pub struct Tileset {
    /// Tileset name, also the key template injection matches on.
    pub name: String,
    /// Class name.
    pub class: Option<String>,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Number of tiles; the tileset covers gids `[firstgid, firstgid + tile_count)`.
    pub tile_count: u32,
    /// Number of columns in the spritesheet (0 for image collections).
    pub columns: u32,
    /// Pixels between tiles.
    pub spacing: u32,
    /// Pixels around the spritesheet edge.
    pub margin: u32,
    /// Format version.
    pub version: Option<String>,
    /// Editor version that wrote the file.
    pub tiled_version: Option<String>,
    /// Spritesheet image, absent for image collections.
    pub image: Option<PathBuf>,
    /// Spritesheet width in pixels.
    pub image_width: Option<u32>,
    /// Spritesheet height in pixels.
    pub image_height: Option<u32>,
    /// Color treated as transparent in the spritesheet.
    pub transparent_color: Option<Color>,
    /// Editor background color.
    pub background_color: Option<Color>,
    /// Drawing offset applied to every tile, in pixels.
    pub tile_offset: Option<OrderedPair>,
    /// Alignment of tile objects (`unspecified`, `topleft`, ...).
    pub object_alignment: Option<String>,
    /// `tile` or `grid`.
    pub tile_render_size: Option<String>,
    /// `stretch` or `preserve-aspect-fit`.
    pub fill_mode: Option<String>,
    /// Grid overlay.
    pub grid: Option<Grid>,
    /// Allowed transformations.
    pub transformations: Option<Transformations>,
    /// Sparse tile metadata keyed by local id.
    pub tiles: BTreeMap<u32, Tile>,
    /// Terrain sets.
    pub wang_sets: Vec<WangSet>,
    /// Custom properties.
    pub properties: Properties,
}

impl Tileset {
    /// Returns the metadata record for a local tile id, if the tileset has one.
    pub fn tile(&self, local_id: u32) -> Option<&Tile> {
        self.tiles.get(&local_id)
    }
}

fn terrain_from_raw(corners: &[i64]) -> Result<Terrain> {
    let corner = |i: usize| corners.get(i).and_then(|&c| u32::try_from(c).ok());
    if corners.len() != 4 {
        return Err(MapError::invalid("terrain", format!("{corners:?}")));
    }
    Ok(Terrain {
        top_left: corner(0),
        top_right: corner(1),
        bottom_left: corner(2),
        bottom_right: corner(3),
    })
}

fn tile_from_raw(
    raw: RawTile,
    tileset: &str,
    base_dir: Option<&Path>,
    loader: &Loader,
) -> Result<Tile> {
    let objects = match raw.objectgroup {
        Some(mut group) => {
            group.kind.get_or_insert_with(|| "objectgroup".to_owned());
            let mut parser = LayerParser::new(loader, base_dir);
            let layer = parser.parse_layer(group)?;
            if !parser.into_pending().is_empty() {
                warn!(
                    "tile {} of tileset '{}' has template tile objects whose tilesets cannot be registered",
                    raw.id, tileset
                );
            }
            Some(layer)
        }
        None => None,
    };

    Ok(Tile {
        id: raw.id,
        tileset: tileset.to_owned(),
        class: raw.class.or(raw.kind),
        probability: raw.probability.unwrap_or(1.0),
        image: raw.image.as_deref().map(|p| join_dir(base_dir, p)),
        image_width: raw.imagewidth,
        image_height: raw.imageheight,
        animation: raw
            .animation
            .unwrap_or_default()
            .into_iter()
            .map(|f| Frame {
                tile_id: f.tileid,
                duration: f.duration,
            })
            .collect(),
        terrain: raw.terrain.as_deref().map(terrain_from_raw).transpose()?,
        objects,
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
    })
}

/// Builds a tileset from its raw record. Relative paths resolve against `base_dir`,
/// the directory of the document the tileset is defined in.
pub(crate) fn from_raw(raw: RawTileset, base_dir: Option<&Path>, loader: &Loader) -> Result<Tileset> {
    let name = required(raw.name, "tileset", "name")?;

    let mut tiles = BTreeMap::new();
    for t in raw.tiles.unwrap_or_default() {
        let tile = tile_from_raw(t, &name, base_dir, loader)?;
        tiles.insert(tile.id, tile);
    }

    let wang_sets = raw
        .wangsets
        .unwrap_or_default()
        .iter()
        .map(|w| wang_set::from_raw(w, base_dir))
        .collect::<Result<Vec<_>>>()?;

    let grid = match raw.grid {
        Some(g) => Some(Grid {
            orientation: g.orientation.parse()?,
            width: g.width,
            height: g.height,
        }),
        None => None,
    };

    Ok(Tileset {
        class: raw.class,
        tile_width: required(raw.tilewidth, "tileset", "tilewidth")?,
        tile_height: required(raw.tileheight, "tileset", "tileheight")?,
        tile_count: required(raw.tilecount, "tileset", "tilecount")?,
        columns: raw.columns.unwrap_or(0),
        spacing: raw.spacing.unwrap_or(0),
        margin: raw.margin.unwrap_or(0),
        version: version_text(raw.version.as_ref()),
        tiled_version: raw.tiledversion,
        image: raw.image.as_deref().map(|p| join_dir(base_dir, p)),
        image_width: raw.imagewidth,
        image_height: raw.imageheight,
        transparent_color: parse_color_opt(raw.transparentcolor.as_deref())?,
        background_color: parse_color_opt(raw.backgroundcolor.as_deref())?,
        tile_offset: raw.tileoffset.map(|o| OrderedPair::new(o.x, o.y)),
        object_alignment: raw.objectalignment,
        tile_render_size: raw.tilerendersize,
        fill_mode: raw.fillmode,
        grid,
        transformations: raw.transformations.map(|t| Transformations {
            hflip: t.hflip,
            vflip: t.vflip,
            rotate: t.rotate,
            prefer_untransformed: t.preferuntransformed,
        }),
        tiles,
        wang_sets,
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
        name,
    })
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn tile_to_raw(tile: &Tile) -> Result<RawTile> {
    Ok(RawTile {
        id: tile.id,
        kind: None,
        class: tile.class.clone(),
        probability: (tile.probability != 1.0).then_some(tile.probability),
        image: tile.image.as_deref().map(path_text),
        imagewidth: tile.image_width,
        imageheight: tile.image_height,
        terrain: tile.terrain.map(|t| {
            [t.top_left, t.top_right, t.bottom_left, t.bottom_right]
                .iter()
                .map(|c| c.map_or(-1, i64::from))
                .collect()
        }),
        animation: (!tile.animation.is_empty()).then(|| {
            tile.animation
                .iter()
                .map(|f| RawFrame {
                    tileid: f.tile_id,
                    duration: f.duration,
                })
                .collect()
        }),
        objectgroup: tile.objects.as_ref().map(crate::layer::to_raw).transpose()?,
        properties: properties::to_raw(&tile.properties),
    })
}

/// Converts a tileset back to its raw record. `firstgid` is set when the
/// tileset is written embedded in a map.
pub(crate) fn to_raw(tileset: &Tileset, firstgid: Option<u32>) -> Result<RawTileset> {
    let nonzero = |v: u32| (v != 0).then_some(v);
    let tiles = if tileset.tiles.is_empty() {
        None
    } else {
        Some(tileset.tiles.values().map(tile_to_raw).collect::<Result<Vec<_>>>()?)
    };
    Ok(RawTileset {
        firstgid,
        source: None,
        name: Some(tileset.name.clone()),
        class: tileset.class.clone(),
        tilewidth: Some(tileset.tile_width),
        tileheight: Some(tileset.tile_height),
        tilecount: Some(tileset.tile_count),
        columns: Some(tileset.columns),
        spacing: nonzero(tileset.spacing),
        margin: nonzero(tileset.margin),
        version: tileset.version.clone().map(Into::into),
        tiledversion: tileset.tiled_version.clone(),
        image: tileset.image.as_deref().map(path_text),
        imagewidth: tileset.image_width,
        imageheight: tileset.image_height,
        transparentcolor: tileset.transparent_color.map(|c| c.to_string()),
        backgroundcolor: tileset.background_color.map(|c| c.to_string()),
        objectalignment: tileset.object_alignment.clone(),
        tilerendersize: tileset.tile_render_size.clone(),
        fillmode: tileset.fill_mode.clone(),
        tileoffset: tileset.tile_offset.map(|o| RawTileOffset { x: o.x, y: o.y }),
        grid: tileset.grid.map(|g| RawGrid {
            orientation: g.orientation.to_string(),
            width: g.width,
            height: g.height,
        }),
        transformations: tileset.transformations.map(|t| RawTransformations {
            hflip: t.hflip,
            vflip: t.vflip,
            rotate: t.rotate,
            preferuntransformed: t.prefer_untransformed,
        }),
        properties: properties::to_raw(&tileset.properties),
        tiles,
        wangsets: (!tileset.wang_sets.is_empty())
            .then(|| tileset.wang_sets.iter().map(wang_set::to_raw).collect()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerKind;
    use crate::raw::{RawLayer, RawObject};

    fn sheet() -> RawTileset {
        RawTileset {
            name: Some("terrain".into()),
            tilewidth: Some(16),
            tileheight: Some(16),
            tilecount: Some(4),
            columns: Some(2),
            image: Some("tiles.png".into()),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_image_against_base_dir() {
        let ts = from_raw(sheet(), Some(Path::new("assets")), &Loader::new()).unwrap();
        assert_eq!(ts.image.as_deref(), Some(Path::new("assets/tiles.png")));
        assert!(ts.tiles.is_empty());
        assert!(ts.tile(0).is_none());
    }

    #[test]
    fn tiles_know_their_tileset_by_name() {
        let mut raw = sheet();
        raw.tiles = Some(vec![RawTile {
            id: 2,
            kind: Some("water".into()),
            animation: Some(vec![
                RawFrame { tileid: 2, duration: 100 },
                RawFrame { tileid: 3, duration: 150 },
            ]),
            terrain: Some(vec![0, -1, 1, -1]),
            objectgroup: Some(RawLayer {
                objects: Some(vec![RawObject {
                    id: Some(1),
                    width: Some(8.0),
                    height: Some(8.0),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let ts = from_raw(raw, None, &Loader::new()).unwrap();
        let tile = ts.tile(2).unwrap();
        assert_eq!(tile.tileset, "terrain");
        assert_eq!(tile.class.as_deref(), Some("water"));
        assert_eq!(tile.probability, 1.0);
        assert_eq!(tile.animation.len(), 2);
        assert_eq!(tile.animation[1], Frame { tile_id: 3, duration: 150 });
        assert_eq!(tile.terrain.unwrap().top_left, Some(0));
        assert_eq!(tile.terrain.unwrap().top_right, None);

        let objects = tile.objects.as_ref().unwrap();
        assert!(matches!(&objects.kind, LayerKind::Object(group) if group.objects.len() == 1));
    }

    #[test]
    fn missing_tile_size_is_a_schema_error() {
        let mut raw = sheet();
        raw.tilewidth = None;
        let err = from_raw(raw, None, &Loader::new()).unwrap_err();
        assert!(matches!(err, MapError::MissingField { field: "tilewidth", .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }

    #[test]
    fn parses_grid_and_transformations() {
        let mut raw = sheet();
        raw.grid = Some(RawGrid {
            orientation: "isometric".into(),
            width: 32,
            height: 16,
        });
        raw.transformations = Some(RawTransformations {
            hflip: true,
            rotate: true,
            ..Default::default()
        });
        raw.transparentcolor = Some("#ff00ff".into());

        let ts = from_raw(raw, None, &Loader::new()).unwrap();
        assert_eq!(ts.grid.unwrap().orientation, GridOrientation::Isometric);
        let t = ts.transformations.unwrap();
        assert!(t.hflip && t.rotate && !t.vflip);
        assert_eq!(ts.transparent_color, Some(Color::rgb(255, 0, 255)));
    }
}
