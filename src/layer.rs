//! Layers: tile grids, object groups, images and nested groups.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::{parse_color_opt, Color, OrderedPair, Size};
use crate::error::{required, MapError, Result};
use crate::loader::{join_dir, Loader};
use crate::object::{self, PendingTileset, TiledObject};
use crate::properties::{self, Properties};
use crate::raw::{RawChunk, RawLayer, RawTileData};
use crate::tile_grid::{self, Chunk, Compression, Encoding, TileGrid};

/// Order in which objects of an object layer are drawn. Stored only; parsing
/// never reorders objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawOrder {
    /// Sorted by y coordinate.
    #[default]
    TopDown,
    /// In document order.
    Index,
}

impl FromStr for DrawOrder {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "topdown" => Ok(DrawOrder::TopDown),
            "index" => Ok(DrawOrder::Index),
            other => Err(MapError::invalid("draworder", other)),
        }
    }
}

impl fmt::Display for DrawOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawOrder::TopDown => "topdown",
            DrawOrder::Index => "index",
        })
    }
}

/// Tile data of a tile layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    /// One grid covering the whole (finite) map.
    Grid(TileGrid),
    /// Independent chunks of an infinite map.
    Chunks(Vec<Chunk>),
}

/// A layer of tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    /// Wire encoding the data was read from; used again when serializing.
    pub encoding: Encoding,
    /// Wire compression the data was read from.
    pub compression: Compression,
    /// The tiles.
    pub data: TileData,
}

/// A layer of objects.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLayer {
    /// Draw order hint.
    pub draw_order: DrawOrder,
    /// Editor display color.
    pub color: Option<Color>,
    /// Objects in document order.
    pub objects: Vec<TiledObject>,
}

/// A layer showing one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    /// Image path, resolved against the map's directory. Never opened.
    pub image: Option<PathBuf>,
    /// Color treated as transparent.
    pub transparent_color: Option<Color>,
}

/// Kind-specific part of a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    /// `tilelayer`
    Tile(TileLayer),
    /// `objectgroup`
    Object(ObjectLayer),
    /// `imagelayer`
    Image(ImageLayer),
    /// `group`, children in document order.
    Group(Vec<Layer>),
}

/// A map layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Map-unique id (0 when the file predates layer ids).
    pub id: u32,
    /// Name.
    pub name: String,
    /// Class name.
    pub class: Option<String>,
    /// Visibility.
    pub visible: bool,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Rendering offset in pixels.
    pub offset: OrderedPair,
    /// Parallax scrolling factor.
    pub parallax_factor: OrderedPair,
    /// Tint multiplied into the layer's pixels.
    pub tint_color: Option<Color>,
    /// Image layers: repeat horizontally.
    pub repeat_x: bool,
    /// Image layers: repeat vertically.
    pub repeat_y: bool,
    /// Start position of infinite tile layers, in tiles.
    pub coordinates: Option<OrderedPair>,
    /// Size in tiles, for tile layers.
    pub size: Option<Size>,
    /// Custom properties.
    pub properties: Properties,
    /// Kind-specific data.
    pub kind: LayerKind,
}

impl Layer {
    /// Child layers if this is a group, otherwise an empty slice.
    pub fn children(&self) -> &[Layer] {
        match &self.kind {
            LayerKind::Group(children) => children,
            _ => &[],
        }
    }
}

/// Location of an object inside a layer tree: layer indices from the root
/// down, then the object index within the final object layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectPath {
    pub layers: Vec<usize>,
    pub object: usize,
}

/// Finds the object an [`ObjectPath`] points at.
pub(crate) fn object_at_mut<'a>(
    layers: &'a mut [Layer],
    path: &ObjectPath,
) -> Option<&'a mut TiledObject> {
    let (&first, rest) = path.layers.split_first()?;
    let mut layer = layers.get_mut(first)?;
    for &i in rest {
        layer = match &mut layer.kind {
            LayerKind::Group(children) => children.get_mut(i)?,
            _ => return None,
        };
    }
    match &mut layer.kind {
        LayerKind::Object(group) => group.objects.get_mut(path.object),
        _ => None,
    }
}

/// Parses layer records, recursing into groups, and collects the template
/// tilesets met along the way together with the objects that need them.
pub(crate) struct LayerParser<'a> {
    loader: &'a Loader,
    base_dir: Option<&'a Path>,
    stack: Vec<usize>,
    pending: Vec<(ObjectPath, PendingTileset)>,
}

impl<'a> LayerParser<'a> {
    pub fn new(loader: &'a Loader, base_dir: Option<&'a Path>) -> Self {
        LayerParser {
            loader,
            base_dir,
            stack: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Pending template tilesets in document order.
    pub fn into_pending(self) -> Vec<(ObjectPath, PendingTileset)> {
        self.pending
    }

    pub fn parse_layers(&mut self, raws: Vec<RawLayer>) -> Result<Vec<Layer>> {
        let mut out = Vec::with_capacity(raws.len());
        for (i, raw) in raws.into_iter().enumerate() {
            self.stack.push(i);
            let layer = self.parse_layer(raw);
            self.stack.pop();
            out.push(layer?);
        }
        Ok(out)
    }

    pub fn parse_layer(&mut self, mut raw: RawLayer) -> Result<Layer> {
        let tag = required(raw.kind.take(), "layer", "type")?;
        let kind = match tag.as_str() {
            "tilelayer" => LayerKind::Tile(tile_layer(&mut raw)?),
            "objectgroup" => LayerKind::Object(self.object_layer(&mut raw)?),
            "imagelayer" => LayerKind::Image(ImageLayer {
                image: raw.image.take().map(|p| join_dir(self.base_dir, &p)),
                transparent_color: parse_color_opt(raw.transparentcolor.as_deref())?,
            }),
            "group" => LayerKind::Group(self.parse_layers(raw.layers.take().unwrap_or_default())?),
            _ => return Err(MapError::UnknownLayerType(tag)),
        };

        let size = match (raw.width, raw.height) {
            (Some(w), Some(h)) => Some(Size::new(f64::from(w), f64::from(h))),
            _ => None,
        };
        let coordinates = match (raw.startx, raw.starty) {
            (None, None) => None,
            (x, y) => Some(OrderedPair::new(
                x.unwrap_or(0) as f64,
                y.unwrap_or(0) as f64,
            )),
        };

        Ok(Layer {
            id: raw.id.unwrap_or(0),
            name: raw.name,
            class: raw.class,
            visible: raw.visible.unwrap_or(true),
            opacity: raw.opacity.unwrap_or(1.0),
            offset: OrderedPair::new(raw.offsetx.unwrap_or(0.0), raw.offsety.unwrap_or(0.0)),
            parallax_factor: OrderedPair::new(
                raw.parallaxx.unwrap_or(1.0),
                raw.parallaxy.unwrap_or(1.0),
            ),
            tint_color: parse_color_opt(raw.tintcolor.as_deref())?,
            repeat_x: raw.repeatx.unwrap_or(false),
            repeat_y: raw.repeaty.unwrap_or(false),
            coordinates,
            size,
            properties: properties::parse(raw.properties.as_deref(), self.base_dir)?,
            kind,
        })
    }

    fn object_layer(&mut self, raw: &mut RawLayer) -> Result<ObjectLayer> {
        let raws = raw.objects.take().unwrap_or_default();
        let mut objects = Vec::with_capacity(raws.len());
        for (i, r) in raws.into_iter().enumerate() {
            let (obj, pending) = object::parse(r, self.base_dir, self.loader)?;
            if let Some(p) = pending {
                let path = ObjectPath {
                    layers: self.stack.clone(),
                    object: i,
                };
                self.pending.push((path, p));
            }
            objects.push(obj);
        }

        Ok(ObjectLayer {
            draw_order: raw
                .draworder
                .as_deref()
                .map(str::parse::<DrawOrder>)
                .transpose()?
                .unwrap_or_default(),
            color: parse_color_opt(raw.color.as_deref())?,
            objects,
        })
    }
}

fn wire_format(raw: &RawLayer) -> Result<(Encoding, Compression)> {
    let encoding = match raw.encoding.as_deref() {
        Some(e) => e.parse()?,
        None => Encoding::Csv,
    };
    let compression = match raw.compression.as_deref() {
        Some(c) => c.parse()?,
        None => Compression::None,
    };
    Ok((encoding, compression))
}

fn decode_data(
    data: RawTileData,
    encoding: Encoding,
    compression: Compression,
    width: u32,
) -> Result<TileGrid> {
    let width = width as usize;
    match data {
        RawTileData::Gids(flat) => tile_grid::fold_rows(flat, width),
        RawTileData::Encoded(text) => tile_grid::decode(&text, encoding, compression, width),
    }
}

fn decode_chunk(chunk: RawChunk, encoding: Encoding, compression: Compression) -> Result<Chunk> {
    Ok(Chunk {
        coordinates: OrderedPair::new(chunk.x as f64, chunk.y as f64),
        size: Size::new(f64::from(chunk.width), f64::from(chunk.height)),
        data: decode_data(chunk.data, encoding, compression, chunk.width)?,
    })
}

fn tile_layer(raw: &mut RawLayer) -> Result<TileLayer> {
    let (encoding, compression) = wire_format(raw)?;

    let data = match (raw.chunks.take(), raw.data.take()) {
        (Some(chunks), _) => TileData::Chunks(
            chunks
                .into_iter()
                .map(|c| decode_chunk(c, encoding, compression))
                .collect::<Result<Vec<_>>>()?,
        ),
        (None, Some(data)) => {
            let width = required(raw.width, "tile layer", "width")?;
            TileData::Grid(decode_data(data, encoding, compression, width)?)
        }
        (None, None) => {
            return Err(MapError::MissingField {
                context: "tile layer",
                field: "data",
            })
        }
    };

    Ok(TileLayer {
        encoding,
        compression,
        data,
    })
}

fn encode_data(
    grid: &TileGrid,
    encoding: Encoding,
    compression: Compression,
) -> Result<RawTileData> {
    Ok(match encoding {
        Encoding::Csv => RawTileData::Gids(grid.iter().flatten().copied().collect()),
        Encoding::Base64 => RawTileData::Encoded(tile_grid::encode(grid, encoding, compression)?),
    })
}

pub(crate) fn to_raw(layer: &Layer) -> Result<RawLayer> {
    let mut raw = RawLayer {
        id: Some(layer.id),
        name: layer.name.clone(),
        class: layer.class.clone(),
        opacity: Some(layer.opacity),
        visible: Some(layer.visible),
        offsetx: (layer.offset.x != 0.0).then_some(layer.offset.x),
        offsety: (layer.offset.y != 0.0).then_some(layer.offset.y),
        parallaxx: (layer.parallax_factor.x != 1.0).then_some(layer.parallax_factor.x),
        parallaxy: (layer.parallax_factor.y != 1.0).then_some(layer.parallax_factor.y),
        tintcolor: layer.tint_color.map(|c| c.to_string()),
        repeatx: layer.repeat_x.then_some(true),
        repeaty: layer.repeat_y.then_some(true),
        startx: layer.coordinates.map(|c| c.x as i64),
        starty: layer.coordinates.map(|c| c.y as i64),
        width: layer.size.map(|s| s.width as u32),
        height: layer.size.map(|s| s.height as u32),
        properties: properties::to_raw(&layer.properties),
        ..Default::default()
    };

    match &layer.kind {
        LayerKind::Tile(tiles) => {
            raw.kind = Some("tilelayer".into());
            if tiles.encoding == Encoding::Base64 {
                raw.encoding = Some(tiles.encoding.to_string());
                if tiles.compression != Compression::None {
                    raw.compression = Some(tiles.compression.to_string());
                }
            }
            match &tiles.data {
                TileData::Grid(grid) => {
                    raw.data = Some(encode_data(grid, tiles.encoding, tiles.compression)?);
                }
                TileData::Chunks(chunks) => {
                    let chunks = chunks
                        .iter()
                        .map(|c| {
                            Ok(RawChunk {
                                x: c.coordinates.x as i64,
                                y: c.coordinates.y as i64,
                                width: c.size.width as u32,
                                height: c.size.height as u32,
                                data: encode_data(&c.data, tiles.encoding, tiles.compression)?,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    raw.chunks = Some(chunks);
                }
            }
        }
        LayerKind::Object(group) => {
            raw.kind = Some("objectgroup".into());
            raw.draworder = Some(group.draw_order.to_string());
            raw.color = group.color.map(|c| c.to_string());
            raw.objects = Some(group.objects.iter().map(object::to_raw).collect());
        }
        LayerKind::Image(image) => {
            raw.kind = Some("imagelayer".into());
            raw.image = image
                .image
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned());
            raw.transparentcolor = image.transparent_color.map(|c| c.to_string());
        }
        LayerKind::Group(children) => {
            raw.kind = Some("group".into());
            raw.layers = Some(children.iter().map(to_raw).collect::<Result<Vec<_>>>()?);
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawObject;

    fn parse(raw: RawLayer) -> Result<Layer> {
        LayerParser::new(&Loader::new(), None).parse_layer(raw)
    }

    fn tiles(name: &str, width: u32, data: Vec<u32>) -> RawLayer {
        RawLayer {
            kind: Some("tilelayer".into()),
            name: name.into(),
            width: Some(width),
            height: Some(data.len() as u32 / width),
            data: Some(RawTileData::Gids(data)),
            ..Default::default()
        }
    }

    fn group(name: &str, children: Vec<RawLayer>) -> RawLayer {
        RawLayer {
            kind: Some("group".into()),
            name: name.into(),
            layers: Some(children),
            ..Default::default()
        }
    }

    #[test]
    fn group_nests_to_depth_two_in_order() {
        let raw = group(
            "outer",
            vec![
                tiles("ground", 2, vec![1, 2, 3, 4]),
                group("inner", vec![tiles("deco", 1, vec![5])]),
            ],
        );
        let layer = parse(raw).unwrap();

        let children = layer.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "ground");
        assert!(matches!(children[0].kind, LayerKind::Tile(_)));
        assert_eq!(children[1].name, "inner");
        assert_eq!(children[1].children().len(), 1);
        assert_eq!(children[1].children()[0].name, "deco");
        assert!(children[1].children()[0].children().is_empty());
    }

    #[test]
    fn int_array_folds_by_width() {
        let layer = parse(tiles("ground", 3, vec![1, 2, 3, 4, 5, 6])).unwrap();
        let LayerKind::Tile(t) = layer.kind else {
            panic!("expected tile layer");
        };
        assert_eq!(t.data, TileData::Grid(vec![vec![1, 2, 3], vec![4, 5, 6]]));
        assert_eq!(layer.size, Some(Size::new(3.0, 2.0)));
    }

    #[test]
    fn ragged_int_array_fails() {
        let err = parse(tiles("ground", 4, vec![1, 2, 3, 4, 5, 6])).unwrap_err();
        assert!(matches!(err, MapError::RaggedGrid { len: 6, width: 4 }));
    }

    #[test]
    fn chunks_stay_separate() {
        let grid = vec![vec![1, 2], vec![3, 4]];
        let encoded = tile_grid::encode(&grid, Encoding::Base64, Compression::Zlib).unwrap();
        let raw = RawLayer {
            kind: Some("tilelayer".into()),
            encoding: Some("base64".into()),
            compression: Some("zlib".into()),
            startx: Some(-2),
            starty: Some(0),
            chunks: Some(vec![
                RawChunk { x: -2, y: 0, width: 2, height: 2, data: RawTileData::Encoded(encoded.clone()) },
                RawChunk { x: 0, y: 0, width: 2, height: 2, data: RawTileData::Encoded(encoded) },
            ]),
            ..Default::default()
        };

        let layer = parse(raw).unwrap();
        assert_eq!(layer.coordinates, Some(OrderedPair::new(-2.0, 0.0)));
        let LayerKind::Tile(t) = layer.kind else {
            panic!("expected tile layer");
        };
        let TileData::Chunks(chunks) = t.data else {
            panic!("expected chunks");
        };
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].coordinates, OrderedPair::new(-2.0, 0.0));
        assert_eq!(chunks[1].data, grid);
        assert_eq!(t.compression, Compression::Zlib);
    }

    #[test]
    fn object_layer_keeps_document_order() {
        let objs = [30.0, 10.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, &y)| RawObject {
                id: Some(i as u32 + 1),
                y: Some(y),
                ..Default::default()
            })
            .collect();
        let raw = RawLayer {
            kind: Some("objectgroup".into()),
            draworder: Some("topdown".into()),
            objects: Some(objs),
            ..Default::default()
        };
        let LayerKind::Object(group) = parse(raw).unwrap().kind else {
            panic!("expected object layer");
        };
        let ids: Vec<_> = group.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(group.draw_order, DrawOrder::TopDown);
    }

    #[test]
    fn unknown_or_missing_type_fails() {
        let mut raw = tiles("x", 1, vec![1]);
        raw.kind = Some("hexlayer".into());
        assert!(matches!(parse(raw).unwrap_err(), MapError::UnknownLayerType(t) if t == "hexlayer"));

        let mut raw = tiles("x", 1, vec![1]);
        raw.kind = None;
        assert_eq!(parse(raw).unwrap_err().kind(), crate::ErrorKind::Schema);
    }

    #[test]
    fn shared_field_defaults() {
        let layer = parse(tiles("x", 1, vec![0])).unwrap();
        assert!(layer.visible);
        assert_eq!(layer.opacity, 1.0);
        assert_eq!(layer.parallax_factor, OrderedPair::new(1.0, 1.0));
        assert_eq!(layer.offset, OrderedPair::default());
        assert!(layer.coordinates.is_none());
    }

    #[test]
    fn object_path_reaches_nested_objects() {
        let raw = group(
            "g",
            vec![RawLayer {
                kind: Some("objectgroup".into()),
                objects: Some(vec![RawObject::default(), RawObject { id: Some(9), ..Default::default() }]),
                ..Default::default()
            }],
        );
        let mut layers = vec![parse(raw).unwrap()];
        let path = ObjectPath {
            layers: vec![0, 0],
            object: 1,
        };
        assert_eq!(object_at_mut(&mut layers, &path).map(|o| o.id), Some(9));
        let bad = ObjectPath {
            layers: vec![0, 3],
            object: 0,
        };
        assert!(object_at_mut(&mut layers, &bad).is_none());
    }
}
