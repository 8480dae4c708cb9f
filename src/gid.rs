//! Global tile ids and the registry resolving them to tilesets.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::error::{MapError, Result};
use crate::layer::{object_at_mut, Layer, ObjectPath};
use crate::object::{ObjectShape, PendingTileset};
use crate::tileset::{Tile, Tileset};

/// Horizontal flip flag (bit 31).
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip flag (bit 30).
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal flip flag (bit 29).
pub const FLIP_D: u32 = 0x2000_0000;
/// Mask keeping the id bits.
pub const GID_MASK: u32 = 0x1FFF_FFFF;

/// A global tile id as stored on the wire, flip flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gid(pub u32);

impl Gid {
    /// Raw value including flags.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
    /// Id with the flip flags stripped.
    #[inline]
    pub fn clean(self) -> u32 {
        self.0 & GID_MASK
    }
    /// Flag bits only.
    #[inline]
    pub fn flags(self) -> u32 {
        self.0 & !GID_MASK
    }
    /// Flipped horizontally.
    #[inline]
    pub fn flip_h(self) -> bool {
        (self.0 & FLIP_H) != 0
    }
    /// Flipped vertically.
    #[inline]
    pub fn flip_v(self) -> bool {
        (self.0 & FLIP_V) != 0
    }
    /// Flipped along the diagonal.
    #[inline]
    pub fn flip_d(self) -> bool {
        (self.0 & FLIP_D) != 0
    }
    /// True for the "no tile" id.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.clean() == 0
    }
}

/// Ordered firstgid → tileset mapping.
///
/// Each tileset owns the gid range `[firstgid, firstgid + tile_count)`. Lookups
/// strip the flip flags first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GidRegistry {
    tilesets: BTreeMap<u32, Arc<Tileset>>,
}

impl GidRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tileset at `firstgid`. Fails if the slot is taken or zero.
    pub fn insert(&mut self, firstgid: u32, tileset: Arc<Tileset>) -> Result<()> {
        if firstgid == 0 || self.tilesets.contains_key(&firstgid) {
            return Err(MapError::invalid("firstgid", firstgid.to_string()));
        }
        self.tilesets.insert(firstgid, tileset);
        Ok(())
    }

    /// Finds the tileset whose range contains `gid`: the one with the
    /// greatest firstgid not above it. Returns the tileset and the local id.
    pub fn locate(&self, gid: u32) -> Option<(&Arc<Tileset>, u32)> {
        let gid = Gid(gid).clean();
        if gid == 0 {
            return None;
        }
        self.tilesets
            .range(..=gid)
            .next_back()
            .map(|(&first, ts)| (ts, gid - first))
    }

    /// Resolves `gid` to its tileset and tile record. Absent when the
    /// containing tileset has no record for that local id.
    pub fn resolve(&self, gid: u32) -> Option<(&Arc<Tileset>, &Tile)> {
        let (tileset, local) = self.locate(gid)?;
        tileset.tile(local).map(|tile| (tileset, tile))
    }

    /// Tileset registered at exactly `firstgid`.
    pub fn get(&self, firstgid: u32) -> Option<&Arc<Tileset>> {
        self.tilesets.get(&firstgid)
    }

    /// Looks a tileset up by name, returning its firstgid too.
    pub fn tileset_named(&self, name: &str) -> Option<(u32, &Arc<Tileset>)> {
        self.tilesets
            .iter()
            .find(|(_, ts)| ts.name == name)
            .map(|(&first, ts)| (first, ts))
    }

    /// Iterates `(firstgid, tileset)` in ascending firstgid order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Arc<Tileset>)> {
        self.tilesets.iter().map(|(&first, ts)| (first, ts))
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    /// True when no tileset is registered.
    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    /// First gid past the end of the highest registered tileset. Fails when
    /// that gid no longer fits the id bits.
    fn next_firstgid(&self) -> Result<u32> {
        let Some((&first, ts)) = self.tilesets.last_key_value() else {
            return Ok(1);
        };
        first
            .checked_add(ts.tile_count)
            .filter(|&next| next <= GID_MASK)
            .ok_or_else(|| {
                MapError::invalid("firstgid", format!("{first} + {}", ts.tile_count))
            })
    }

    /// Returns the firstgid under which `pending` lives in this registry,
    /// registering it after the highest tileset when no tileset of the same
    /// name exists yet.
    fn register_pending(&mut self, pending: &PendingTileset) -> Result<u32> {
        if let Some((first, _)) = self.tileset_named(&pending.tileset.name) {
            return Ok(first);
        }
        let first = self.next_firstgid()?;
        debug!(
            "registering template tileset '{}' at firstgid {first}",
            pending.tileset.name
        );
        self.insert(first, Arc::clone(&pending.tileset))?;
        Ok(first)
    }

    /// Rewrites the gid of every template tile object against this registry,
    /// registering template tilesets the map does not declare.
    pub(crate) fn inject_pending(
        &mut self,
        layers: &mut [Layer],
        pending: Vec<(ObjectPath, PendingTileset)>,
    ) -> Result<()> {
        for (path, tileset) in pending {
            let first = self.register_pending(&tileset)?;
            let Some(object) = object_at_mut(layers, &path) else {
                continue;
            };
            if let ObjectShape::Tile { gid } = &mut object.shape {
                *gid = remap(*gid, tileset.firstgid, first)?;
            }
        }
        Ok(())
    }
}

/// Moves `gid` from a tileset registered at `from` to the same tileset at `to`.
fn remap(gid: u32, from: u32, to: u32) -> Result<u32> {
    let g = Gid(gid);
    let local = g
        .clean()
        .checked_sub(from)
        .ok_or_else(|| MapError::invalid("template gid", gid.to_string()))?;
    let moved = local
        .checked_add(to)
        .filter(|&id| id <= GID_MASK)
        .ok_or_else(|| MapError::invalid("gid", format!("{} + {to}", g.clean())))?;
    Ok(g.flags() | moved)
}
