//! Objects placed in object layers, and template resolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::common::{Color, OrderedPair, Size};
use crate::error::{required, MapError, Result};
use crate::loader::{join_dir, Loader};
use crate::properties::{self, Properties};
use crate::raw::{RawObject, RawPoint, RawText, RawTileset};
use crate::tileset::{self, Tileset};

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
    /// Justified.
    Justify,
}

impl FromStr for HorizontalAlignment {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "justify" => Ok(Self::Justify),
            other => Err(MapError::invalid("halign", other)),
        }
    }
}

impl fmt::Display for HorizontalAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        })
    }
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    /// Top.
    #[default]
    Top,
    /// Centered.
    Center,
    /// Bottom.
    Bottom,
}

impl FromStr for VerticalAlignment {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" => Ok(Self::Top),
            "center" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            other => Err(MapError::invalid("valign", other)),
        }
    }
}

impl fmt::Display for VerticalAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Top => "top",
            Self::Center => "center",
            Self::Bottom => "bottom",
        })
    }
}

/// Payload of a text object.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// The text itself.
    pub text: String,
    /// Text color.
    pub color: Color,
    /// Font family.
    pub font_family: String,
    /// Font size in pixels.
    pub pixel_size: f64,
    /// Bold.
    pub bold: bool,
    /// Italic.
    pub italic: bool,
    /// Kerning enabled.
    pub kerning: bool,
    /// Struck out.
    pub strike_out: bool,
    /// Underlined.
    pub underline: bool,
    /// Horizontal alignment.
    pub horizontal_align: HorizontalAlignment,
    /// Vertical alignment.
    pub vertical_align: VerticalAlignment,
    /// Word wrapping enabled.
    pub wrap: bool,
}

impl Default for Text {
    fn default() -> Self {
        Text {
            text: String::new(),
            color: Color::BLACK,
            font_family: "sans-serif".to_owned(),
            pixel_size: 16.0,
            bold: false,
            italic: false,
            kerning: true,
            strike_out: false,
            underline: false,
            horizontal_align: HorizontalAlignment::Left,
            vertical_align: VerticalAlignment::Top,
            wrap: false,
        }
    }
}

/// Shape-specific part of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Axis-aligned rectangle spanning `size`.
    Rectangle,
    /// Ellipse inscribed in `size`.
    Ellipse,
    /// A single point.
    Point,
    /// Closed polygon, points relative to the object position.
    Polygon(Vec<OrderedPair>),
    /// Open polyline, points relative to the object position.
    Polyline(Vec<OrderedPair>),
    /// Text box.
    Text(Text),
    /// A tile, flip flags included in `gid`.
    Tile {
        /// Global tile id.
        gid: u32,
    },
}

/// An object in an object layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledObject {
    /// Map-unique id (0 when the file predates object ids).
    pub id: u32,
    /// Name.
    pub name: String,
    /// Free-form type tag (`class` in newer files, `type` in older ones).
    pub class: String,
    /// Position in pixels.
    pub coordinates: OrderedPair,
    /// Size in pixels.
    pub size: Size,
    /// Clockwise rotation in degrees.
    pub rotation: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Visibility.
    pub visible: bool,
    /// Template this object was instantiated from.
    pub template: Option<PathBuf>,
    /// Custom properties.
    pub properties: Properties,
    /// Shape and shape-specific data.
    pub shape: ObjectShape,
}

/// A tileset bundled with an object template. The map assembler registers it
/// (or finds it by name) once the layer tree is complete, then rewrites the
/// object's gid into the map's gid space.
#[derive(Debug, Clone)]
pub(crate) struct PendingTileset {
    pub tileset: Arc<Tileset>,
    /// The tileset's firstgid inside the template.
    pub firstgid: u32,
}

fn points(raw: Vec<RawPoint>) -> Vec<OrderedPair> {
    raw.into_iter().map(|p| OrderedPair::new(p.x, p.y)).collect()
}

fn text_from_raw(raw: RawText) -> Result<Text> {
    let d = Text::default();
    Ok(Text {
        text: raw.text,
        color: raw.color.as_deref().map(str::parse::<Color>).transpose()?.unwrap_or(d.color),
        font_family: raw.fontfamily.unwrap_or(d.font_family),
        pixel_size: raw.pixelsize.unwrap_or(d.pixel_size),
        bold: raw.bold.unwrap_or(d.bold),
        italic: raw.italic.unwrap_or(d.italic),
        kerning: raw.kerning.unwrap_or(d.kerning),
        strike_out: raw.strikeout.unwrap_or(d.strike_out),
        underline: raw.underline.unwrap_or(d.underline),
        horizontal_align: raw
            .halign
            .as_deref()
            .map(str::parse::<HorizontalAlignment>)
            .transpose()?
            .unwrap_or_default(),
        vertical_align: raw
            .valign
            .as_deref()
            .map(str::parse::<VerticalAlignment>)
            .transpose()?
            .unwrap_or_default(),
        wrap: raw.wrap.unwrap_or(d.wrap),
    })
}

/// Picks the shape. When a record carries several discriminators the first
/// match wins: ellipse, point, gid, polygon, polyline, text, rectangle.
fn shape_from_raw(raw: &mut RawObject) -> Result<ObjectShape> {
    if raw.ellipse == Some(true) {
        return Ok(ObjectShape::Ellipse);
    }
    if raw.point == Some(true) {
        return Ok(ObjectShape::Point);
    }
    if let Some(gid) = raw.gid {
        return Ok(ObjectShape::Tile { gid });
    }
    if let Some(p) = raw.polygon.take() {
        return Ok(ObjectShape::Polygon(points(p)));
    }
    if let Some(p) = raw.polyline.take() {
        return Ok(ObjectShape::Polyline(points(p)));
    }
    if let Some(t) = raw.text.take() {
        return Ok(ObjectShape::Text(text_from_raw(t)?));
    }
    Ok(ObjectShape::Rectangle)
}

/// Fields every shape shares.
fn object_from_raw(
    mut raw: RawObject,
    template: Option<PathBuf>,
    base_dir: Option<&Path>,
) -> Result<TiledObject> {
    let shape = shape_from_raw(&mut raw)?;
    Ok(TiledObject {
        id: raw.id.unwrap_or(0),
        name: raw.name.unwrap_or_default(),
        class: raw.class.or(raw.kind).unwrap_or_default(),
        coordinates: OrderedPair::new(raw.x.unwrap_or(0.0), raw.y.unwrap_or(0.0)),
        size: Size::new(raw.width.unwrap_or(0.0), raw.height.unwrap_or(0.0)),
        rotation: raw.rotation.unwrap_or(0.0),
        opacity: raw.opacity.unwrap_or(1.0),
        visible: raw.visible.unwrap_or(true),
        template,
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
        shape,
    })
}

fn template_tileset(
    mut raw: RawTileset,
    template_dir: Option<&Path>,
    loader: &Loader,
) -> Result<PendingTileset> {
    let firstgid = required(raw.firstgid, "template tileset", "firstgid")?;
    let tileset = match raw.source.take() {
        Some(source) => loader.external_tileset(&join_dir(template_dir, &source))?,
        None => Arc::new(tileset::from_raw(raw, template_dir, loader)?),
    };
    Ok(PendingTileset { tileset, firstgid })
}

/// Parses one object record. Template references resolve against `parent_dir`;
/// a tileset bundled with the template comes back alongside the object.
pub(crate) fn parse(
    mut raw: RawObject,
    parent_dir: Option<&Path>,
    loader: &Loader,
) -> Result<(TiledObject, Option<PendingTileset>)> {
    let Some(template) = raw.template.take() else {
        return Ok((object_from_raw(raw, None, parent_dir)?, None));
    };

    let dir = parent_dir.ok_or_else(|| MapError::TemplateWithoutParentDir {
        template: template.clone(),
    })?;
    let path = dir.join(&template);
    let loaded = loader.load_template(&path)?;

    let pending = loaded
        .tileset
        .map(|ts| template_tileset(ts, path.parent(), loader))
        .transpose()?;

    raw.apply_template(loaded.object);
    Ok((object_from_raw(raw, Some(path), parent_dir)?, pending))
}

fn raw_points(pts: &[OrderedPair]) -> Vec<RawPoint> {
    pts.iter().map(|p| RawPoint { x: p.x, y: p.y }).collect()
}

pub(crate) fn to_raw(object: &TiledObject) -> RawObject {
    let mut raw = RawObject {
        id: Some(object.id),
        template: object
            .template
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned()),
        name: Some(object.name.clone()),
        kind: Some(object.class.clone()),
        x: Some(object.coordinates.x),
        y: Some(object.coordinates.y),
        width: Some(object.size.width),
        height: Some(object.size.height),
        rotation: Some(object.rotation),
        opacity: (object.opacity != 1.0).then_some(object.opacity),
        visible: Some(object.visible),
        properties: properties::to_raw(&object.properties),
        ..Default::default()
    };

    match &object.shape {
        ObjectShape::Rectangle => {}
        ObjectShape::Ellipse => raw.ellipse = Some(true),
        ObjectShape::Point => raw.point = Some(true),
        ObjectShape::Polygon(p) => raw.polygon = Some(raw_points(p)),
        ObjectShape::Polyline(p) => raw.polyline = Some(raw_points(p)),
        ObjectShape::Tile { gid } => raw.gid = Some(*gid),
        ObjectShape::Text(t) => {
            let d = Text::default();
            raw.text = Some(RawText {
                text: t.text.clone(),
                color: (t.color != d.color).then(|| t.color.to_string()),
                fontfamily: (t.font_family != d.font_family).then(|| t.font_family.clone()),
                pixelsize: (t.pixel_size != d.pixel_size).then_some(t.pixel_size),
                bold: t.bold.then_some(true),
                italic: t.italic.then_some(true),
                kerning: (!t.kerning).then_some(false),
                strikeout: t.strike_out.then_some(true),
                underline: t.underline.then_some(true),
                halign: (t.horizontal_align != d.horizontal_align)
                    .then(|| t.horizontal_align.to_string()),
                valign: (t.vertical_align != d.vertical_align).then(|| t.vertical_align.to_string()),
                wrap: t.wrap.then_some(true),
            });
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_plain(raw: RawObject) -> TiledObject {
        let (obj, pending) = parse(raw, None, &Loader::new()).unwrap();
        assert!(pending.is_none());
        obj
    }

    fn base() -> RawObject {
        RawObject {
            id: Some(4),
            name: Some("thing".into()),
            kind: Some("marker".into()),
            x: Some(10.0),
            y: Some(20.0),
            width: Some(32.0),
            height: Some(16.0),
            ..Default::default()
        }
    }

    #[test]
    fn plain_record_is_a_rectangle() {
        let obj = parse_plain(base());
        assert_eq!(obj.shape, ObjectShape::Rectangle);
        assert_eq!(obj.id, 4);
        assert_eq!(obj.class, "marker");
        assert_eq!(obj.coordinates, OrderedPair::new(10.0, 20.0));
        assert_eq!(obj.size, Size::new(32.0, 16.0));
        assert!(obj.visible);
        assert_eq!(obj.opacity, 1.0);
    }

    #[test]
    fn point_beats_gid() {
        let mut raw = base();
        raw.point = Some(true);
        raw.gid = Some(3);
        assert_eq!(parse_plain(raw.clone()).shape, ObjectShape::Point);
        assert_eq!(parse_plain(raw).shape, ObjectShape::Point);
    }

    #[test]
    fn dispatch_priority_is_fixed() {
        let mut raw = base();
        raw.text = Some(RawText {
            text: "hi".into(),
            ..Default::default()
        });
        raw.polyline = Some(vec![RawPoint { x: 0.0, y: 0.0 }]);
        raw.polygon = Some(vec![RawPoint { x: 1.0, y: 1.0 }]);
        assert!(matches!(parse_plain(raw.clone()).shape, ObjectShape::Polygon(_)));

        raw.gid = Some(9);
        assert_eq!(parse_plain(raw.clone()).shape, ObjectShape::Tile { gid: 9 });

        raw.ellipse = Some(true);
        raw.point = Some(true);
        assert_eq!(parse_plain(raw).shape, ObjectShape::Ellipse);
    }

    #[test]
    fn false_markers_do_not_dispatch() {
        let mut raw = base();
        raw.ellipse = Some(false);
        raw.point = Some(false);
        assert_eq!(parse_plain(raw).shape, ObjectShape::Rectangle);
    }

    #[test]
    fn text_defaults_apply() {
        let mut raw = base();
        raw.text = Some(RawText {
            text: "Hello".into(),
            bold: Some(true),
            halign: Some("center".into()),
            ..Default::default()
        });
        let ObjectShape::Text(text) = parse_plain(raw).shape else {
            panic!("expected text");
        };
        assert_eq!(text.text, "Hello");
        assert!(text.bold && text.kerning && !text.italic);
        assert_eq!(text.color, Color::BLACK);
        assert_eq!(text.font_family, "sans-serif");
        assert_eq!(text.pixel_size, 16.0);
        assert_eq!(text.horizontal_align, HorizontalAlignment::Center);
        assert_eq!(text.vertical_align, VerticalAlignment::Top);
    }

    #[test]
    fn polygon_points_stay_relative() {
        let mut raw = base();
        raw.polygon = Some(vec![
            RawPoint { x: 0.0, y: 0.0 },
            RawPoint { x: 5.0, y: -3.0 },
        ]);
        let ObjectShape::Polygon(pts) = parse_plain(raw).shape else {
            panic!("expected polygon");
        };
        assert_eq!(pts[1], OrderedPair::new(5.0, -3.0));
    }

    #[test]
    fn template_needs_parent_dir() {
        let mut raw = base();
        raw.template = Some("chest.tj".into());
        let err = parse(raw, None, &Loader::new()).unwrap_err();
        assert!(matches!(err, MapError::TemplateWithoutParentDir { .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn bad_alignment_is_rejected() {
        let mut raw = base();
        raw.text = Some(RawText {
            valign: Some("middle".into()),
            ..Default::default()
        });
        assert!(parse(raw, None, &Loader::new()).is_err());
    }
}
