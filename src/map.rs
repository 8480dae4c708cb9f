//! The map model and the assembler that builds it from raw records.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::common::{parse_color_opt, Color, OrderedPair, Size};
use crate::error::{required, MapError, Result};
use crate::gid::GidRegistry;
use crate::layer::{Layer, LayerKind, LayerParser};
use crate::loader::{join_dir, Loader};
use crate::properties::{self, Properties};
use crate::raw::{version_text, RawMap, RawTileset};
use crate::tileset;

macro_rules! wire_enum {
    ($(#[$doc:meta])* $name:ident, $field:literal { $($(#[$vdoc:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($(#[$vdoc])* $variant),+
        }

        impl FromStr for $name {
            type Err = MapError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(MapError::invalid($field, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($name::$variant => $text),+
                })
            }
        }
    };
}

wire_enum!(
    /// Map projection.
    Orientation, "orientation" {
        /// Square grid.
        Orthogonal => "orthogonal",
        /// Diamond grid.
        Isometric => "isometric",
        /// Staggered isometric.
        Staggered => "staggered",
        /// Hexagonal.
        Hexagonal => "hexagonal",
    }
);

wire_enum!(
    /// Order in which tiles are rendered.
    RenderOrder, "renderorder" {
        /// Rows left to right, top to bottom.
        RightDown => "right-down",
        /// Rows left to right, bottom to top.
        RightUp => "right-up",
        /// Rows right to left, top to bottom.
        LeftDown => "left-down",
        /// Rows right to left, bottom to top.
        LeftUp => "left-up",
    }
);

wire_enum!(
    /// Axis along which staggered and hexagonal maps are shifted.
    StaggerAxis, "staggeraxis" {
        /// Every other column is shifted.
        X => "x",
        /// Every other row is shifted.
        Y => "y",
    }
);

wire_enum!(
    /// Which rows or columns staggered and hexagonal maps shift.
    StaggerIndex, "staggerindex" {
        /// Odd indices.
        Odd => "odd",
        /// Even indices.
        Even => "even",
    }
);

/// A parsed map.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    /// Format version.
    pub version: Option<String>,
    /// Editor version that wrote the file.
    pub tiled_version: Option<String>,
    /// Class name.
    pub class: Option<String>,
    /// Projection.
    pub orientation: Orientation,
    /// Tile render order, orthogonal maps only.
    pub render_order: Option<RenderOrder>,
    /// Size in tiles.
    pub map_size: Size,
    /// Tile size in pixels.
    pub tile_size: Size,
    /// Whether tile layers are stored as chunks.
    pub infinite: bool,
    /// Next free layer id.
    pub next_layer_id: Option<u32>,
    /// Next free object id.
    pub next_object_id: Option<u32>,
    /// Background color.
    pub background_color: Option<Color>,
    /// Width or height of a hexagon's flat side, hexagonal maps only.
    pub hex_side_length: Option<u32>,
    /// Stagger axis, staggered and hexagonal maps only.
    pub stagger_axis: Option<StaggerAxis>,
    /// Stagger index, staggered and hexagonal maps only.
    pub stagger_index: Option<StaggerIndex>,
    /// Origin for parallax scrolling.
    pub parallax_origin: OrderedPair,
    /// Tilesets by firstgid, including ones registered for object templates.
    pub tilesets: GidRegistry,
    /// Top-level layers in draw order.
    pub layers: Vec<Layer>,
    /// Custom properties.
    pub properties: Properties,
}

impl Map {
    /// Loads a map file through the shared [`Loader`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Loader::shared().load_map(path)
    }

    /// Finds a top-level layer by name.
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Visits every layer depth-first, groups before their children.
    pub fn walk_layers(&self) -> impl Iterator<Item = &Layer> {
        let mut stack: Vec<&Layer> = self.layers.iter().rev().collect();
        std::iter::from_fn(move || {
            let layer = stack.pop()?;
            if let LayerKind::Group(children) = &layer.kind {
                stack.extend(children.iter().rev());
            }
            Some(layer)
        })
    }
}

fn parse_opt<T: FromStr<Err = MapError>>(value: Option<&str>) -> Result<Option<T>> {
    value.map(str::parse::<T>).transpose()
}

fn load_tileset(
    mut raw: RawTileset,
    base_dir: Option<&Path>,
    loader: &Loader,
) -> Result<(u32, Arc<tileset::Tileset>)> {
    let firstgid = required(raw.firstgid, "map tileset", "firstgid")?;
    let tileset = match raw.source.take() {
        Some(source) => loader.external_tileset(&join_dir(base_dir, &source))?,
        None => Arc::new(tileset::from_raw(raw, base_dir, loader)?),
    };
    Ok((firstgid, tileset))
}

/// Builds a [`Map`]: tilesets first, then the layer tree, then template
/// tilesets are registered and their objects' gids rewritten.
pub(crate) fn assemble(raw: RawMap, base_dir: Option<&Path>, loader: &Loader) -> Result<Map> {
    let mut tilesets = GidRegistry::new();
    for ts in raw.tilesets {
        let (firstgid, tileset) = load_tileset(ts, base_dir, loader)?;
        tilesets.insert(firstgid, tileset)?;
    }

    let mut parser = LayerParser::new(loader, base_dir);
    let mut layers = parser.parse_layers(raw.layers)?;
    tilesets.inject_pending(&mut layers, parser.into_pending())?;

    let map_size = Size::new(
        f64::from(required(raw.width, "map", "width")?),
        f64::from(required(raw.height, "map", "height")?),
    );
    let tile_size = Size::new(
        f64::from(required(raw.tilewidth, "map", "tilewidth")?),
        f64::from(required(raw.tileheight, "map", "tileheight")?),
    );

    Ok(Map {
        version: version_text(raw.version.as_ref()),
        tiled_version: raw.tiledversion,
        class: raw.class,
        orientation: parse_opt(raw.orientation.as_deref())?.unwrap_or(Orientation::Orthogonal),
        render_order: parse_opt(raw.renderorder.as_deref())?,
        map_size,
        tile_size,
        infinite: raw.infinite.unwrap_or(false),
        next_layer_id: raw.nextlayerid,
        next_object_id: raw.nextobjectid,
        background_color: parse_color_opt(raw.backgroundcolor.as_deref())?,
        hex_side_length: raw.hexsidelength,
        stagger_axis: parse_opt(raw.staggeraxis.as_deref())?,
        stagger_index: parse_opt(raw.staggerindex.as_deref())?,
        parallax_origin: OrderedPair::new(
            raw.parallaxoriginx.unwrap_or(0.0),
            raw.parallaxoriginy.unwrap_or(0.0),
        ),
        tilesets,
        layers,
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
    })
}

pub(crate) fn to_raw(map: &Map) -> Result<RawMap> {
    Ok(RawMap {
        version: map.version.clone().map(Into::into),
        tiledversion: map.tiled_version.clone(),
        class: map.class.clone(),
        orientation: Some(map.orientation.to_string()),
        renderorder: map.render_order.map(|r| r.to_string()),
        width: Some(map.map_size.width as u32),
        height: Some(map.map_size.height as u32),
        tilewidth: Some(map.tile_size.width as u32),
        tileheight: Some(map.tile_size.height as u32),
        infinite: Some(map.infinite),
        nextlayerid: map.next_layer_id,
        nextobjectid: map.next_object_id,
        backgroundcolor: map.background_color.map(|c| c.to_string()),
        hexsidelength: map.hex_side_length,
        staggeraxis: map.stagger_axis.map(|s| s.to_string()),
        staggerindex: map.stagger_index.map(|s| s.to_string()),
        parallaxoriginx: (map.parallax_origin.x != 0.0).then_some(map.parallax_origin.x),
        parallaxoriginy: (map.parallax_origin.y != 0.0).then_some(map.parallax_origin.y),
        properties: properties::to_raw(&map.properties),
        tilesets: map
            .tilesets
            .iter()
            .map(|(first, ts)| tileset::to_raw(ts, Some(first)))
            .collect::<Result<Vec<_>>>()?,
        layers: map
            .layers
            .iter()
            .map(crate::layer::to_raw)
            .collect::<Result<Vec<_>>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawLayer, RawTileData};

    fn embedded(name: &str, firstgid: u32, tilecount: u32) -> RawTileset {
        RawTileset {
            firstgid: Some(firstgid),
            name: Some(name.into()),
            tilewidth: Some(16),
            tileheight: Some(16),
            tilecount: Some(tilecount),
            columns: Some(tilecount),
            ..Default::default()
        }
    }

    fn raw_map() -> RawMap {
        RawMap {
            width: Some(3),
            height: Some(1),
            tilewidth: Some(16),
            tileheight: Some(16),
            orientation: Some("hexagonal".into()),
            staggeraxis: Some("y".into()),
            staggerindex: Some("odd".into()),
            hexsidelength: Some(6),
            backgroundcolor: Some("#80102030".into()),
            tilesets: vec![embedded("a", 1, 10), embedded("b", 11, 5)],
            layers: vec![RawLayer {
                kind: Some("tilelayer".into()),
                name: "ground".into(),
                width: Some(3),
                height: Some(1),
                data: Some(RawTileData::Gids(vec![11, 12, 13])),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn assembles_scalars_and_tilesets() {
        let map = assemble(raw_map(), None, &Loader::new()).unwrap();
        assert_eq!(map.orientation, Orientation::Hexagonal);
        assert_eq!(map.stagger_axis, Some(StaggerAxis::Y));
        assert_eq!(map.stagger_index, Some(StaggerIndex::Odd));
        assert_eq!(map.hex_side_length, Some(6));
        assert_eq!(map.background_color, Some(Color::rgba(0x10, 0x20, 0x30, 0x80)));
        assert_eq!(map.render_order, None);
        assert_eq!(map.tilesets.len(), 2);
        assert_eq!(map.tilesets.get(11).map(|t| t.name.as_str()), Some("b"));
    }

    #[test]
    fn cells_resolve_into_second_tileset() {
        let map = assemble(raw_map(), None, &Loader::new()).unwrap();
        let LayerKind::Tile(tiles) = &map.layer("ground").unwrap().kind else {
            panic!("expected tile layer");
        };
        let crate::TileData::Grid(grid) = &tiles.data else {
            panic!("expected grid");
        };
        let located: Vec<_> = grid[0]
            .iter()
            .map(|&gid| {
                let (ts, local) = map.tilesets.locate(gid).unwrap();
                (ts.name.clone(), local)
            })
            .collect();
        assert_eq!(
            located,
            [("b".to_owned(), 0), ("b".to_owned(), 1), ("b".to_owned(), 2)]
        );
    }

    #[test]
    fn missing_map_width_is_a_schema_error() {
        let mut raw = raw_map();
        raw.width = None;
        let err = assemble(raw, None, &Loader::new()).unwrap_err();
        assert!(matches!(err, MapError::MissingField { context: "map", field: "width" }));
    }

    #[test]
    fn unknown_orientation_is_rejected() {
        let mut raw = raw_map();
        raw.orientation = Some("spherical".into());
        assert!(matches!(
            assemble(raw, None, &Loader::new()).unwrap_err(),
            MapError::InvalidValue { field: "orientation", .. }
        ));
    }

    #[test]
    fn walk_layers_is_depth_first() {
        let group = |name: &str, layers: Vec<RawLayer>| RawLayer {
            kind: Some("group".into()),
            name: name.into(),
            layers: Some(layers),
            ..Default::default()
        };
        let mut raw = raw_map();
        raw.layers = vec![
            group("a", vec![group("b", vec![]), group("c", vec![])]),
            group("d", vec![]),
        ];
        let map = assemble(raw, None, &Loader::new()).unwrap();
        let names: Vec<_> = map.walk_layers().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn enums_round_trip_through_text() {
        for text in ["right-down", "right-up", "left-down", "left-up"] {
            assert_eq!(text.parse::<RenderOrder>().unwrap().to_string(), text);
        }
    }
}
