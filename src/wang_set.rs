//! Terrain ("wang") metadata attached to tilesets.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::common::Color;
use crate::error::{MapError, Result};
use crate::properties::{self, Properties};
use crate::raw::{RawWangColor, RawWangSet, RawWangTile};

/// Which tile features a wang set assigns colors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WangSetKind {
    /// Corners only.
    #[default]
    Corner,
    /// Edges only.
    Edge,
    /// Corners and edges.
    Mixed,
}

impl FromStr for WangSetKind {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "corner" => Ok(WangSetKind::Corner),
            "edge" => Ok(WangSetKind::Edge),
            "mixed" => Ok(WangSetKind::Mixed),
            other => Err(MapError::invalid("wang set type", other)),
        }
    }
}

impl fmt::Display for WangSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WangSetKind::Corner => "corner",
            WangSetKind::Edge => "edge",
            WangSetKind::Mixed => "mixed",
        })
    }
}

/// One terrain color of a wang set.
#[derive(Debug, Clone, PartialEq)]
pub struct WangColor {
    /// Display name.
    pub name: String,
    /// Editor color.
    pub color: Color,
    /// Representative local tile id, if any.
    pub tile: Option<u32>,
    /// Relative weight when the editor picks tiles.
    pub probability: f64,
    /// Class name.
    pub class: Option<String>,
    /// Custom properties.
    pub properties: Properties,
}

/// Color assignment of one tile: index 0 is the top edge, continuing
/// clockwise through the top-right corner and ending at the top-left corner.
/// A value of 0 means unassigned, otherwise it is a 1-based color index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WangTile {
    /// Local tile id.
    pub tile_id: u32,
    /// Color per edge/corner.
    pub wang_id: [u32; 8],
}

/// A set of terrain colors and the tiles painted with them.
#[derive(Debug, Clone, PartialEq)]
pub struct WangSet {
    /// Display name.
    pub name: String,
    /// Corner, edge or mixed.
    pub kind: WangSetKind,
    /// Representative local tile id, if any.
    pub tile: Option<u32>,
    /// Class name.
    pub class: Option<String>,
    /// Colors, in index order (color index `n` is `colors[n - 1]`).
    pub colors: Vec<WangColor>,
    /// Tile assignments keyed by local tile id.
    pub tiles: BTreeMap<u32, WangTile>,
    /// Custom properties.
    pub properties: Properties,
}

impl WangSet {
    /// Returns the color for a 1-based color index.
    pub fn color(&self, index: u32) -> Option<&WangColor> {
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        self.colors.get(index)
    }
}

/// Tiled writes `-1` for "no tile".
fn tile_ref(id: i64) -> Option<u32> {
    u32::try_from(id).ok()
}

fn color_from_raw(raw: &RawWangColor, base_dir: Option<&Path>) -> Result<WangColor> {
    Ok(WangColor {
        name: raw.name.clone(),
        color: raw.color.parse()?,
        tile: tile_ref(raw.tile),
        probability: raw.probability,
        class: raw.class.clone(),
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
    })
}

fn tile_from_raw(raw: &RawWangTile) -> Result<WangTile> {
    let wang_id: [u32; 8] = raw.wangid.as_slice().try_into().map_err(|_| {
        MapError::invalid(
            "wangid",
            format!("tile {} has {} entries, expected 8", raw.tileid, raw.wangid.len()),
        )
    })?;
    Ok(WangTile {
        tile_id: raw.tileid,
        wang_id,
    })
}

pub(crate) fn from_raw(raw: &RawWangSet, base_dir: Option<&Path>) -> Result<WangSet> {
    let kind = raw
        .kind
        .as_deref()
        .map(str::parse::<WangSetKind>)
        .transpose()?
        .unwrap_or_default();

    let colors = raw
        .colors
        .iter()
        .map(|c| color_from_raw(c, base_dir))
        .collect::<Result<Vec<_>>>()?;

    let mut tiles = BTreeMap::new();
    for t in &raw.wangtiles {
        let tile = tile_from_raw(t)?;
        tiles.insert(tile.tile_id, tile);
    }

    Ok(WangSet {
        name: raw.name.clone(),
        kind,
        tile: tile_ref(raw.tile),
        class: raw.class.clone(),
        colors,
        tiles,
        properties: properties::parse(raw.properties.as_deref(), base_dir)?,
    })
}

pub(crate) fn to_raw(set: &WangSet) -> RawWangSet {
    RawWangSet {
        name: set.name.clone(),
        kind: Some(set.kind.to_string()),
        tile: set.tile.map_or(-1, i64::from),
        class: set.class.clone(),
        colors: set
            .colors
            .iter()
            .map(|c| RawWangColor {
                name: c.name.clone(),
                color: c.color.to_string(),
                tile: c.tile.map_or(-1, i64::from),
                probability: c.probability,
                class: c.class.clone(),
                properties: properties::to_raw(&c.properties),
            })
            .collect(),
        wangtiles: set
            .tiles
            .values()
            .map(|t| RawWangTile {
                tileid: t.tile_id,
                wangid: t.wang_id.to_vec(),
            })
            .collect(),
        properties: properties::to_raw(&set.properties),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_set(wangid: Vec<u32>) -> RawWangSet {
        RawWangSet {
            name: "ground".into(),
            kind: Some("corner".into()),
            tile: -1,
            colors: vec![RawWangColor {
                name: "grass".into(),
                color: "#00ff00".into(),
                tile: 3,
                probability: 1.0,
                ..Default::default()
            }],
            wangtiles: vec![RawWangTile { tileid: 7, wangid }],
            ..Default::default()
        }
    }

    #[test]
    fn parses_colors_and_tiles() {
        let set = from_raw(&raw_set(vec![0, 1, 0, 1, 0, 1, 0, 1]), None).unwrap();
        assert_eq!(set.kind, WangSetKind::Corner);
        assert_eq!(set.tile, None);
        assert_eq!(set.color(1).map(|c| c.color), Some(Color::rgb(0, 255, 0)));
        assert_eq!(set.color(1).and_then(|c| c.tile), Some(3));
        assert!(set.color(0).is_none());
        assert_eq!(set.tiles[&7].wang_id, [0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn wang_id_must_have_eight_entries() {
        let err = from_raw(&raw_set(vec![1, 1, 1, 1]), None).unwrap_err();
        assert!(matches!(err, MapError::InvalidValue { field: "wangid", .. }));
    }

    #[test]
    fn rejects_unknown_set_kind() {
        let mut raw = raw_set(vec![0; 8]);
        raw.kind = Some("diagonal".into());
        assert!(from_raw(&raw, None).is_err());
    }
}
