//! Decode persisted geometry text into WGS84 coordinates.
//!
//! Records store their position as a nullable text column holding one of two
//! encodings: a well-known-text `POINT(<lon> <lat>)` string, or a hex-encoded
//! extended-WKB point as produced by the backing spatial database. The decoder
//! distinguishes "deliberately absent" (`Ok(None)`) from "malformed"
//! (`Err(LocationParseError)`) so callers can log the latter while rendering
//! both as "no location".

use geo::Coord;
use std::num::ParseFloatError;
use thiserror::Error;

/// Extended-WKB flag marking a trailing spatial reference id in the header.
const WKB_SRID_FLAG: u32 = 0x2000_0000;

/// WKB geometry type code for a two-dimensional point.
const WKB_POINT_TYPE: u32 = 1;

/// Byte-order flag, type code and two doubles; the smallest point record.
const WKB_MIN_POINT_LEN: usize = 1 + 4 + 16;

/// Errors returned by [`decode_location`].
///
/// Every variant means the location column held text that matches neither
/// recognised geometry encoding. Absence of a location is not an error; it is
/// reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum LocationParseError {
    /// The string was not valid hexadecimal.
    #[error("location is not valid hex: {source}")]
    InvalidHex {
        /// Decoding failure reported by the `hex` crate.
        #[source]
        source: hex::FromHexError,
    },
    /// The decoded buffer ended before the point record did.
    #[error("geometry buffer truncated: needed {expected} bytes, found {found}")]
    Truncated {
        /// Bytes required to finish reading the record.
        expected: usize,
        /// Bytes actually present.
        found: usize,
    },
    /// The leading byte-order flag was neither big- nor little-endian.
    #[error("unknown byte-order flag {flag:#04x}")]
    UnknownByteOrder {
        /// Flag byte read from the buffer.
        flag: u8,
    },
    /// The buffer encoded a geometry other than a point.
    #[error("unsupported geometry type {type_code:#010x}; only points are stored")]
    UnsupportedGeometry {
        /// Raw type code including any extension flags.
        type_code: u32,
    },
    /// Well-known text did not match `POINT(<lon> <lat>)`.
    #[error("malformed point text {text:?}")]
    MalformedText {
        /// The offending input string.
        text: String,
    },
    /// A coordinate token was not a finite decimal number.
    #[error("invalid coordinate component {token:?}")]
    InvalidNumber {
        /// Token that failed to parse.
        token: String,
        /// Parser failure, absent when the token parsed to a non-finite value.
        #[source]
        source: Option<ParseFloatError>,
    },
}

/// Decode a record's raw location column into a WGS84 coordinate.
///
/// Coordinates follow the crate convention of `x = longitude`,
/// `y = latitude`. `None` and the empty string both mean "no location" and
/// decode to `Ok(None)`; anything else must be a `POINT(...)` text or an
/// (extended) WKB point in hex.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use nasti_core::decode_location;
///
/// # fn main() -> Result<(), nasti_core::LocationParseError> {
/// let decoded = decode_location(Some("POINT(133.7751 -25.2744)"))?;
/// assert_eq!(decoded, Some(Coord { x: 133.7751, y: -25.2744 }));
/// assert_eq!(decode_location(None)?, None);
/// # Ok(())
/// # }
/// ```
pub fn decode_location(raw: Option<&str>) -> Result<Option<Coord<f64>>, LocationParseError> {
    let Some(text) = raw else {
        return Ok(None);
    };
    if text.is_empty() {
        return Ok(None);
    }
    if text.starts_with("POINT") {
        parse_point_text(text).map(Some)
    } else {
        parse_point_wkb(text).map(Some)
    }
}

/// Byte order indicated by the leading WKB flag byte.
#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn from_flag(flag: u8) -> Result<Self, LocationParseError> {
        match flag {
            0 => Ok(Self::Big),
            1 => Ok(Self::Little),
            _ => Err(LocationParseError::UnknownByteOrder { flag }),
        }
    }

    const fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Big => u32::from_be_bytes(bytes),
            Self::Little => u32::from_le_bytes(bytes),
        }
    }

    const fn read_f64(self, bytes: [u8; 8]) -> f64 {
        match self {
            Self::Big => f64::from_be_bytes(bytes),
            Self::Little => f64::from_le_bytes(bytes),
        }
    }
}

fn parse_point_text(text: &str) -> Result<Coord<f64>, LocationParseError> {
    let malformed = || LocationParseError::MalformedText {
        text: text.to_owned(),
    };
    let body = text
        .strip_prefix("POINT(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let mut tokens = body.split(' ');
    let (Some(lon), Some(lat), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed());
    };
    Ok(Coord {
        x: parse_component(lon)?,
        y: parse_component(lat)?,
    })
}

fn parse_component(token: &str) -> Result<f64, LocationParseError> {
    let value: f64 = token
        .parse()
        .map_err(|source| LocationParseError::InvalidNumber {
            token: token.to_owned(),
            source: Some(source),
        })?;
    if !value.is_finite() {
        return Err(LocationParseError::InvalidNumber {
            token: token.to_owned(),
            source: None,
        });
    }
    Ok(value)
}

fn parse_point_wkb(text: &str) -> Result<Coord<f64>, LocationParseError> {
    let bytes = hex::decode(text).map_err(|source| LocationParseError::InvalidHex { source })?;
    if bytes.len() < WKB_MIN_POINT_LEN {
        return Err(LocationParseError::Truncated {
            expected: WKB_MIN_POINT_LEN,
            found: bytes.len(),
        });
    }

    let [flag] = take::<1>(&bytes, 0)?;
    let order = ByteOrder::from_flag(flag)?;
    let type_code = order.read_u32(take::<4>(&bytes, 1)?);
    if type_code & !WKB_SRID_FLAG != WKB_POINT_TYPE {
        return Err(LocationParseError::UnsupportedGeometry { type_code });
    }

    // The spatial reference id carries no display information; skip it.
    let offset = if type_code & WKB_SRID_FLAG == 0 { 5 } else { 9 };
    let x = order.read_f64(take::<8>(&bytes, offset)?);
    let y = order.read_f64(take::<8>(&bytes, offset + 8)?);
    Ok(Coord { x, y })
}

fn take<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], LocationParseError> {
    bytes
        .get(offset..offset + N)
        .and_then(|window| <[u8; N]>::try_from(window).ok())
        .ok_or(LocationParseError::Truncated {
            expected: offset + N,
            found: bytes.len(),
        })
}
