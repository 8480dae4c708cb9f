//! Tile data codec: CSV or base64 text, optionally compressed, to and from a
//! row-major grid of GIDs.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::common::{OrderedPair, Size};
use crate::error::{MapError, Result};

/// Rows of GIDs, top to bottom, each row left to right.
pub type TileGrid = Vec<Vec<u32>>;

/// Text encoding of tile data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Comma separated integers (an integer array in the key-value encoding).
    #[default]
    Csv,
    /// Base64 of little-endian `u32` values.
    Base64,
}

impl FromStr for Encoding {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Encoding::Csv),
            "base64" => Ok(Encoding::Base64),
            other => Err(MapError::InvalidEncoding {
                encoding: other.to_owned(),
                compression: String::new(),
            }),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Csv => "csv",
            Encoding::Base64 => "base64",
        })
    }
}

/// Compression applied to base64 tile data before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw bytes.
    #[default]
    None,
    /// gzip stream.
    Gzip,
    /// zlib stream.
    Zlib,
    /// zstd frame; needs the `zstd` feature.
    Zstd,
}

impl FromStr for Compression {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "zlib" => Ok(Compression::Zlib),
            "zstd" => Ok(Compression::Zstd),
            other => Err(MapError::InvalidEncoding {
                encoding: Encoding::Base64.to_string(),
                compression: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Compression {
    fn name(self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => "gzip",
            Compression::Zlib => "zlib",
            Compression::Zstd => "zstd",
        }
    }
}

/// A rectangular piece of tile data belonging to an infinite map.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the chunk's top-left tile, in tiles.
    pub coordinates: OrderedPair,
    /// Chunk size in tiles.
    pub size: Size,
    /// Chunk tiles.
    pub data: TileGrid,
}

fn check_pairing(encoding: Encoding, compression: Compression) -> Result<()> {
    if encoding == Encoding::Csv && compression != Compression::None {
        return Err(MapError::InvalidEncoding {
            encoding: encoding.to_string(),
            compression: compression.to_string(),
        });
    }
    Ok(())
}

/// Folds a flat GID sequence into rows of exactly `width` entries.
pub fn fold_rows(flat: Vec<u32>, width: usize) -> Result<TileGrid> {
    if flat.is_empty() {
        return Ok(Vec::new());
    }
    if width == 0 || flat.len() % width != 0 {
        return Err(MapError::RaggedGrid {
            len: flat.len(),
            width,
        });
    }
    Ok(flat.chunks(width).map(<[u32]>::to_vec).collect())
}

fn decode_csv(text: &str) -> Result<TileGrid> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|tok| !tok.is_empty())
                .map(|tok| tok.parse().map_err(|_| MapError::InvalidTileData(tok.to_owned())))
                .collect()
        })
        .collect()
}

fn encode_csv(grid: &TileGrid) -> String {
    let rows: Vec<String> = grid
        .iter()
        .map(|row| row.iter().map(u32::to_string).collect::<Vec<_>>().join(","))
        .collect();
    format!("\n{}\n", rows.join(",\n"))
}

fn decompress(bytes: Vec<u8>, compression: Compression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let io_err = |source| MapError::Decompress {
        compression: compression.name(),
        source,
    };

    match compression {
        Compression::None => return Ok(bytes),
        Compression::Gzip => {
            GzDecoder::new(&bytes[..]).read_to_end(&mut out).map_err(io_err)?;
        }
        Compression::Zlib => {
            ZlibDecoder::new(&bytes[..]).read_to_end(&mut out).map_err(io_err)?;
        }
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            out = zstd::decode_all(&bytes[..]).map_err(io_err)?;
        }
        #[cfg(not(feature = "zstd"))]
        Compression::Zstd => return Err(MapError::MissingCapability { capability: "zstd" }),
    }
    Ok(out)
}

fn compress(bytes: Vec<u8>, compression: Compression) -> Result<Vec<u8>> {
    let io_err = |source| MapError::Decompress {
        compression: compression.name(),
        source,
    };

    match compression {
        Compression::None => Ok(bytes),
        Compression::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(&bytes).map_err(io_err)?;
            enc.finish().map_err(io_err)
        }
        Compression::Zlib => {
            let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(&bytes).map_err(io_err)?;
            enc.finish().map_err(io_err)
        }
        #[cfg(feature = "zstd")]
        Compression::Zstd => zstd::encode_all(&bytes[..], 0).map_err(io_err),
        #[cfg(not(feature = "zstd"))]
        Compression::Zstd => Err(MapError::MissingCapability { capability: "zstd" }),
    }
}

fn decode_base64(text: &str, compression: Compression, width: usize) -> Result<TileGrid> {
    let bytes = STANDARD.decode(text.trim())?;
    let bytes = decompress(bytes, compression)?;
    if bytes.len() % 4 != 0 {
        return Err(MapError::InvalidTileData(format!(
            "{} bytes do not form whole 32-bit ids",
            bytes.len()
        )));
    }

    let flat = bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    fold_rows(flat, width)
}

fn encode_base64(grid: &TileGrid, compression: Compression) -> Result<String> {
    let bytes: Vec<u8> = grid.iter().flatten().flat_map(|gid| gid.to_le_bytes()).collect();
    Ok(STANDARD.encode(compress(bytes, compression)?))
}

/// Decodes wire tile data into a grid.
///
/// CSV data yields one row per non-empty line; `row_width` only applies to
/// base64 data, whose flat length must be an exact multiple of it.
pub fn decode(
    data: &str,
    encoding: Encoding,
    compression: Compression,
    row_width: usize,
) -> Result<TileGrid> {
    check_pairing(encoding, compression)?;
    match encoding {
        Encoding::Csv => decode_csv(data),
        Encoding::Base64 => decode_base64(data, compression, row_width),
    }
}

/// Encodes a grid back into wire text. Inverse of [`decode`].
pub fn encode(grid: &TileGrid, encoding: Encoding, compression: Compression) -> Result<String> {
    check_pairing(encoding, compression)?;
    match encoding {
        Encoding::Csv => Ok(encode_csv(grid)),
        Encoding::Base64 => encode_base64(grid, compression),
    }
}
