//! Point geometry decoding.
//!
//! Geometry cells look like `POINT (-87.6 41.8)`: longitude first, latitude
//! second. We don't parse the WKT grammar; we scan for numeric tokens and
//! take the first two. Extra tokens are ignored without complaint, so a
//! string like `id 7 POINT (1 2)` decodes as lon=7, lat=1.
//!
//! Only ASCII digits count. Numbers written in other scripts, such as
//! `(١٢ ٣٤)`, produce no tokens, so the cell decodes to `None`.

use crate::Result;
use crate::table::Cell;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Optional sign, then a decimal (`.5`, `12.25`) or an integer.
const NUMBER_TOKEN_RE: &str = r"[-+]?(?:[0-9]*\.[0-9]+|[0-9]+)";

#[derive(Debug, Clone)]
pub struct GeoExtractor {
    re: Regex,
}

impl GeoExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            re: Regex::new(NUMBER_TOKEN_RE)?,
        })
    }

    /// Decode a geometry string into a coordinate pair.
    ///
    /// Returns `None` for absent or blank input, fewer than two numeric
    /// tokens, or a token that does not parse as a finite float.
    pub fn extract(&self, raw: Option<&str>) -> Option<LatLon> {
        let text = raw?;
        if text.trim().is_empty() {
            return None;
        }

        let mut tokens = self.re.find_iter(text).map(|m| m.as_str());
        let lon = parse_token(tokens.next()?)?;
        let lat = parse_token(tokens.next()?)?;
        Some(LatLon { lat, lon })
    }

    /// Only text cells carry geometry; anything else decodes to `None`.
    pub fn extract_cell(&self, cell: &Cell) -> Option<LatLon> {
        self.extract(cell.as_text())
    }
}

fn parse_token(tok: &str) -> Option<f64> {
    tok.parse::<f64>().ok().filter(|v| v.is_finite())
}
