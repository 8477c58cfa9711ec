//! Cleaning pipeline: numeric coercion of value columns, then point
//! geometry decoding into latitude/longitude columns.
//!
//! Cleaning never adds or drops rows; unparseable cells become `Missing`.

pub mod geo;
pub mod numeric;

pub use geo::{GeoExtractor, LatLon};

use crate::Result;
use crate::table::{Cell, Table};
use anyhow::{Context, bail};

/// Which columns to clean and where decoded coordinates go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CleanSpec {
    pub value_columns: Vec<String>,
    pub geometry: Option<GeometryColumns>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryColumns {
    /// Source column holding `POINT (lon lat)` text. Never rewritten.
    pub source: String,
    pub latitude: String,
    pub longitude: String,
}

/// Run the pipeline over a loaded table.
///
/// Re-running on an already cleaned table yields the same table: value
/// columns hold only numbers and missing markers, and coordinates are
/// re-derived from the untouched geometry text and overwrite the previous
/// latitude/longitude columns.
pub fn clean_table(mut table: Table, spec: &CleanSpec) -> Result<Table> {
    if let Some(geo) = &spec.geometry {
        let outputs = [&geo.latitude, &geo.longitude];
        if geo.latitude == geo.longitude
            || outputs.contains(&&geo.source)
            || spec.value_columns.iter().any(|v| outputs.contains(&v))
        {
            bail!(
                "coordinate columns {:?}/{:?} must differ from the geometry and value columns",
                geo.latitude,
                geo.longitude
            );
        }
    }

    let rows_in = table.len();

    // 1) Numeric columns.
    for name in &spec.value_columns {
        let values = numeric::normalize_column(
            table
                .column(name)
                .with_context(|| format!("value column {:?}", name))?,
        );
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            tracing::info!(column = %name, missing, rows = rows_in, "unparseable values marked missing");
        }
        table.set_column(name, values.into_iter().map(Cell::from_option).collect())?;
    }

    // 2) Coordinates.
    if let Some(geo) = &spec.geometry {
        let extractor = GeoExtractor::new()?;
        let points: Vec<Option<LatLon>> = table
            .column(&geo.source)
            .with_context(|| format!("geometry column {:?}", geo.source))?
            .into_iter()
            .map(|c| extractor.extract_cell(c))
            .collect();

        let decoded = points.iter().filter(|p| p.is_some()).count();
        tracing::debug!(column = %geo.source, decoded, rows = rows_in, "decoded geometry");

        table.set_column(
            &geo.latitude,
            points.iter().map(|p| Cell::from_option(p.map(|p| p.lat))).collect(),
        )?;
        table.set_column(
            &geo.longitude,
            points.iter().map(|p| Cell::from_option(p.map(|p| p.lon))).collect(),
        )?;
    }

    debug_assert_eq!(rows_in, table.len());
    Ok(table)
}
