//! File access, format detection and the external tileset cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use log::{debug, trace};

use crate::error::{MapError, Result};
use crate::map::{self, Map};
use crate::raw::{RawMap, RawTemplate, RawTileset};
use crate::tileset::{self, Tileset};

pub(crate) mod json_loader;
pub(crate) mod xml_loader;

/// Wire encoding of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// The XML encoding (`.tmx`, `.tsx`, `.tx`).
    Xml,
    /// The key-value encoding (`.tmj`, `.tsj`, `.tj`, `.json`).
    Json,
}

impl Format {
    /// Detects the format from the first non-blank character: `<` is XML,
    /// anything else is JSON.
    pub fn detect(text: &str) -> Self {
        match text.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('<') => Format::Xml,
            _ => Format::Json,
        }
    }
}

/// Shared cache of parsed external tilesets, keyed by the path they were
/// loaded from.
///
/// Cloning is cheap and every clone sees the same entries, so one cache can
/// be shared by several [`Loader`]s, across threads too. Entries are never
/// evicted.
///
/// Keys are the referenced path joined onto the referring document's
/// directory, as written. They are not canonicalized, so `maps/../maps/a.tsx`
/// and `maps/a.tsx` are separate entries.
#[derive(Clone, Default, Debug)]
pub struct TilesetCache(Arc<Mutex<HashMap<PathBuf, Arc<Tileset>>>>);

impl TilesetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tileset cached for `path`.
    pub fn get(&self, path: &Path) -> Option<Arc<Tileset>> {
        self.lock().get(path).cloned()
    }

    /// Caches `tileset` unless `path` already has an entry, returning whichever
    /// entry ends up cached.
    pub fn insert(&self, path: PathBuf, tileset: Arc<Tileset>) -> Arc<Tileset> {
        Arc::clone(self.lock().entry(path).or_insert(tileset))
    }

    /// Number of cached tilesets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are only ever inserted whole, so a poisoned map is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Tileset>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Joins a document-relative path onto the document's directory, if known.
pub(crate) fn join_dir(base_dir: Option<&Path>, relative: &str) -> PathBuf {
    match base_dir {
        Some(dir) => dir.join(relative),
        None => PathBuf::from(relative),
    }
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"))
}

fn raw_map(text: &str, path: Option<&Path>) -> Result<RawMap> {
    match Format::detect(text) {
        Format::Json => json_loader::map_from_str(text, path),
        Format::Xml => xml_loader::map_from_str(text, path),
    }
}

fn raw_tileset(text: &str, path: Option<&Path>) -> Result<RawTileset> {
    match Format::detect(text) {
        Format::Json => json_loader::tileset_from_str(text, path),
        Format::Xml => xml_loader::tileset_from_str(text, path),
    }
}

fn raw_template(text: &str, path: &Path) -> Result<RawTemplate> {
    match Format::detect(text) {
        Format::Json => json_loader::template_from_str(text, Some(path)),
        Format::Xml => xml_loader::template_from_str(text, Some(path)),
    }
}

/// Parses maps and tilesets, memoizing external tilesets in a [`TilesetCache`].
#[derive(Clone, Default, Debug)]
pub struct Loader {
    cache: TilesetCache,
}

impl Loader {
    /// Creates a loader with its own empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader sharing an existing cache.
    pub fn with_cache(cache: TilesetCache) -> Self {
        Loader { cache }
    }

    /// The process-wide loader used by [`crate::parse_map`] and
    /// [`crate::parse_tileset`]. Its cache lives as long as the process.
    pub fn shared() -> &'static Loader {
        static SHARED: OnceLock<Loader> = OnceLock::new();
        SHARED.get_or_init(Loader::new)
    }

    /// The tileset cache.
    pub fn cache(&self) -> &TilesetCache {
        &self.cache
    }

    /// Loads a map file. Relative references resolve against its directory.
    pub fn load_map(&self, path: impl AsRef<Path>) -> Result<Map> {
        let path = path.as_ref();
        let text = read_document(path)?;
        let raw = raw_map(&text, Some(path))?;
        map::assemble(raw, Some(&parent_dir(path)), self)
    }

    /// Loads a tileset file. Goes through the cache.
    pub fn load_tileset(&self, path: impl AsRef<Path>) -> Result<Tileset> {
        self.external_tileset(path.as_ref())
            .map(|ts| Tileset::clone(&ts))
    }

    /// Parses an in-memory map document. `base_dir` is where relative
    /// references (tilesets, templates, images, file properties) resolve from;
    /// templates fail to load without it.
    pub fn parse_map_str(&self, text: &str, base_dir: Option<&Path>) -> Result<Map> {
        let raw = raw_map(text, None)?;
        map::assemble(raw, base_dir, self)
    }

    /// Parses an in-memory tileset document.
    pub fn parse_tileset_str(&self, text: &str, base_dir: Option<&Path>) -> Result<Tileset> {
        let raw = raw_tileset(text, None)?;
        tileset::from_raw(raw, base_dir, self)
    }

    /// Returns the external tileset at `path`, parsing it on first use.
    pub(crate) fn external_tileset(&self, path: &Path) -> Result<Arc<Tileset>> {
        if let Some(hit) = self.cache.get(path) {
            trace!("tileset cache hit: {}", path.display());
            return Ok(hit);
        }

        debug!("loading tileset {}", path.display());
        let text = read_document(path)?;
        let raw = raw_tileset(&text, Some(path))?;
        // The lock is not held while parsing: tile collision objects may load
        // templates that load further tilesets.
        let parsed = tileset::from_raw(raw, Some(&parent_dir(path)), self)?;
        Ok(self.cache.insert(path.to_path_buf(), Arc::new(parsed)))
    }

    pub(crate) fn load_template(&self, path: &Path) -> Result<RawTemplate> {
        debug!("loading template {}", path.display());
        let text = read_document(path)?;
        raw_template(&text, path)
    }
}
