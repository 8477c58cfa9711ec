//! Aggregation model: apply category filters to a cleaned table and compute
//! everything the report shows.
//!
//! Missing values never take part in a statistic, and rows whose grouping
//! cell is missing are left out of that grouping. Empty groups produce no
//! entry instead of a NaN.

pub mod stats;

use crate::Result;
use crate::spec::ResolvedSpec;
use crate::table::{Record, Table};
use anyhow::Context;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use stats::{FiveNumber, LinearFit};

/// Bucket name used when no group column is configured.
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsView {
    pub rows_loaded: usize,
    pub rows_filtered: usize,
    pub rows_with_value: usize,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareView {
    pub a: String,
    pub b: String,
    pub mean_a: Option<f64>,
    pub mean_b: Option<f64>,
    /// (mean_a - mean_b) / mean_a * 100, only when both means exist and
    /// are non-zero.
    pub gap_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionView {
    pub category: String,
    #[serde(flatten)]
    pub summary: FiveNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub category: String,
    pub group: String,
    pub count: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownView {
    pub column: String,
    pub rows: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendView {
    pub group: String,
    #[serde(flatten)]
    pub fit: LinearFit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationView {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub title: String,
    pub value_column: String,
    pub group_column: Option<String>,
    pub x_column: Option<String>,
    pub totals: TotalsView,
    pub compare: Option<CompareView>,
    pub distribution: Vec<DistributionView>,
    pub breakdowns: Vec<BreakdownView>,
    pub trends: Vec<TrendView>,
    pub locations: Vec<LocationView>,
    /// Filters that were applied (column -> allowed categories).
    pub filters: BTreeMap<String, Vec<String>>,
    /// Every category seen per filterable column, before filtering.
    pub categories: BTreeMap<String, Vec<String>>,
}

/// Keep records whose category in every filtered column is allowed.
/// A missing cell never matches a filter, and an empty allowed set matches
/// nothing.
pub fn filter_records<'a>(
    table: &'a Table,
    filters: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<&'a Record>> {
    let mut idx = Vec::new();
    for (col, allowed) in filters {
        let i = table
            .column_index(col)
            .with_context(|| format!("filter column {:?} not in table", col))?;
        idx.push((i, allowed));
    }

    Ok(table
        .records
        .iter()
        .filter(|r| {
            idx.iter().all(|(i, allowed)| match r.get(*i).category() {
                Some(c) => allowed.contains(&c),
                None => false,
            })
        })
        .collect())
}

/// Build report data. Performs:
/// - filter rows by the resolved filters
/// - overall and compared-category means
/// - per-group distribution, breakdown means, trends, and location means
pub fn build_report_data(table: &Table, spec: &ResolvedSpec) -> Result<ReportData> {
    let col = |name: &str| {
        table
            .column_index(name)
            .with_context(|| format!("column {:?} not in table", name))
    };

    let value_idx = col(&spec.value)?;
    let group_idx = spec.group.as_deref().map(col).transpose()?;

    // 1) Filter. An empty selection on the group column hides every row; on
    // any other column it places no restriction.
    let filters: BTreeMap<String, BTreeSet<String>> = spec
        .filters
        .iter()
        .filter(|(col, allowed)| !allowed.is_empty() || spec.group.as_deref() == Some(col.as_str()))
        .map(|(col, allowed)| (col.clone(), allowed.clone()))
        .collect();
    let rows = filter_records(table, &filters)?;
    if rows.is_empty() && !table.is_empty() {
        tracing::warn!(filters = ?filters, "filters removed every row");
    }

    let value_of = |r: &Record| r.get(value_idx).as_number();
    let group_of = |r: &Record| match group_idx {
        Some(i) => r.get(i).category(),
        None => Some(ALL.to_string()),
    };

    // 2) Totals.
    let values: Vec<f64> = rows.iter().filter_map(|r| value_of(r)).collect();
    let totals = TotalsView {
        rows_loaded: table.len(),
        rows_filtered: rows.len(),
        rows_with_value: values.len(),
        mean: stats::mean(&values),
    };

    // 3) Values per group.
    let mut by_group: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for r in &rows {
        if let (Some(g), Some(v)) = (group_of(r), value_of(r)) {
            by_group.entry(g).or_default().push(v);
        }
    }

    let compare = spec.compare.as_ref().map(|(a, b)| {
        let mean_a = by_group.get(a).and_then(|v| stats::mean(v));
        let mean_b = by_group.get(b).and_then(|v| stats::mean(v));
        CompareView {
            a: a.clone(),
            b: b.clone(),
            mean_a,
            mean_b,
            gap_pct: gap_pct(mean_a, mean_b),
        }
    });

    let distribution = by_group
        .iter()
        .filter_map(|(g, v)| {
            stats::five_number(v).map(|summary| DistributionView {
                category: g.clone(),
                summary,
            })
        })
        .collect();

    // 4) Breakdown means by (category, group).
    let mut breakdowns = Vec::new();
    for name in &spec.breakdowns {
        let bi = col(name)?;
        let mut cells: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
        for r in &rows {
            if let (Some(c), Some(g), Some(v)) = (r.get(bi).category(), group_of(r), value_of(r)) {
                cells.entry((c, g)).or_default().push(v);
            }
        }
        let means = cells
            .into_iter()
            .filter_map(|((category, group), v)| {
                stats::mean(&v).map(|mean| BreakdownRow {
                    category,
                    group,
                    count: v.len(),
                    mean,
                })
            })
            .collect();
        breakdowns.push(BreakdownView {
            column: name.clone(),
            rows: means,
        });
    }

    // 5) Trends of value against numeric_x.
    let mut trends = Vec::new();
    if let Some(x_name) = &spec.numeric_x {
        let xi = col(x_name)?;
        let mut points: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
        for r in &rows {
            if let (Some(g), Some(x), Some(y)) = (group_of(r), r.get(xi).as_number(), value_of(r)) {
                points.entry(g).or_default().push((x, y));
            }
        }
        for (group, pts) in points {
            if let Some(fit) = stats::linear_fit(&pts) {
                trends.push(TrendView { group, fit });
            }
        }
    }

    // 6) Locations.
    let locations = match &spec.location {
        Some(loc) => build_locations(table, &rows, col(loc)?, value_idx, spec)?,
        None => vec![],
    };

    // 7) Category lists for the filter widgets.
    let mut filterable: BTreeSet<&str> = spec.filters.keys().map(|s| s.as_str()).collect();
    filterable.extend(spec.group.as_deref());
    filterable.extend(spec.breakdowns.iter().map(|s| s.as_str()));
    let mut categories = BTreeMap::new();
    for name in filterable {
        let i = col(name)?;
        let seen: BTreeSet<String> = table
            .records
            .iter()
            .filter_map(|r| r.get(i).category())
            .collect();
        categories.insert(name.to_string(), seen.into_iter().collect());
    }

    Ok(ReportData {
        title: spec.title.clone(),
        value_column: spec.value.clone(),
        group_column: spec.group.clone(),
        x_column: spec.numeric_x.clone(),
        totals,
        compare,
        distribution,
        breakdowns,
        trends,
        locations,
        filters: filters
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect(),
        categories,
    })
}

fn build_locations(
    table: &Table,
    rows: &[&Record],
    loc_idx: usize,
    value_idx: usize,
    spec: &ResolvedSpec,
) -> Result<Vec<LocationView>> {
    let coord_idx = match &spec.geometry {
        Some(g) => Some((
            table
                .column_index(&g.latitude)
                .with_context(|| format!("latitude column {:?} not in table", g.latitude))?,
            table
                .column_index(&g.longitude)
                .with_context(|| format!("longitude column {:?} not in table", g.longitude))?,
        )),
        None => None,
    };

    struct Acc {
        values: Vec<f64>,
        coord: Option<(f64, f64)>,
    }

    let mut acc: BTreeMap<String, Acc> = BTreeMap::new();
    for r in rows {
        let Some(name) = r.get(loc_idx).category() else {
            continue;
        };
        let entry = acc.entry(name).or_insert(Acc {
            values: vec![],
            coord: None,
        });
        if let Some(v) = r.get(value_idx).as_number() {
            entry.values.push(v);
        }
        if entry.coord.is_none() {
            if let Some((lat_i, lon_i)) = coord_idx {
                if let (Some(lat), Some(lon)) = (r.get(lat_i).as_number(), r.get(lon_i).as_number()) {
                    entry.coord = Some((lat, lon));
                }
            }
        }
    }

    Ok(acc
        .into_iter()
        .filter_map(|(name, a)| {
            stats::mean(&a.values).map(|mean| LocationView {
                name,
                count: a.values.len(),
                mean,
                lat: a.coord.map(|c| c.0),
                lon: a.coord.map(|c| c.1),
            })
        })
        .collect())
}

fn gap_pct(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if a != 0.0 && b != 0.0 => Some((a - b) / a * 100.0),
        _ => None,
    }
}
