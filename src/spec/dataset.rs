//! Dataset spec (dataset.json): which columns play which role.
//!
//! JSON shape:
//! {
//!   "title": "Colombia Gender Salary Gap",
//!   "delimiter": ",",
//!   "value": { "candidates": ["salary", "salario"] },
//!   "group": { "candidates": ["gender", "genero"] },
//!   "compare": ["Male", "Female"],
//!   "breakdowns": [{ "candidates": ["sector"], "required": false }],
//!   "numeric_x": { "candidates": ["experience"], "required": false },
//!   "location": { "name": "locationdesc", "required": false },
//!   "geometry": { "name": "geolocation", "required": false },
//!   "filters": { "gender": ["Male", "Female"] }
//! }

use crate::clean::{CleanSpec, GeometryColumns};
use crate::error::SpecError;
use crate::spec::column::{ColumnRef, ColumnRefSpec};
use crate::table::normalize_header;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetSpec {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub delimiter: Option<String>,

    pub value: ColumnRefSpec,

    #[serde(default)]
    pub group: Option<ColumnRefSpec>,

    /// Two group categories to compare, e.g. ["Male", "Female"].
    #[serde(default)]
    pub compare: Vec<String>,

    #[serde(default)]
    pub breakdowns: Vec<ColumnRefSpec>,

    #[serde(default)]
    pub numeric_x: Option<ColumnRefSpec>,

    #[serde(default)]
    pub location: Option<ColumnRefSpec>,

    #[serde(default)]
    pub geometry: Option<ColumnRefSpec>,

    #[serde(default = "default_latitude")]
    pub latitude_column: String,

    #[serde(default = "default_longitude")]
    pub longitude_column: String,

    /// Column -> allowed categories. Absent column means no filtering.
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<String>>,
}

fn default_latitude() -> String {
    "latitude".to_string()
}

fn default_longitude() -> String {
    "longitude".to_string()
}

/// Spec with every column reference bound to a concrete header.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpec {
    pub title: String,
    pub value: String,
    pub group: Option<String>,
    pub compare: Option<(String, String)>,
    pub breakdowns: Vec<String>,
    pub numeric_x: Option<String>,
    pub location: Option<String>,
    pub geometry: Option<GeometryColumns>,
    pub filters: BTreeMap<String, BTreeSet<String>>,
}

impl DatasetSpec {
    /// Minimal spec with only a value column, used when no spec file is given.
    pub fn for_value(value: &str) -> Self {
        Self {
            title: None,
            delimiter: None,
            value: ColumnRefSpec::Name(value.to_string()),
            group: None,
            compare: vec![],
            breakdowns: vec![],
            numeric_x: None,
            location: None,
            geometry: None,
            latitude_column: default_latitude(),
            longitude_column: default_longitude(),
            filters: BTreeMap::new(),
        }
    }

    /// Field delimiter byte; defaults to `,`.
    pub fn delimiter(&self) -> Result<u8, SpecError> {
        match self.delimiter.as_deref() {
            None => Ok(b','),
            Some("\\t") => Ok(b'\t'),
            Some(d) if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
            Some(d) => Err(SpecError::BadDelimiter(d.to_string())),
        }
    }

    /// Bind every column reference to one of `headers` (already normalized).
    pub fn validate_and_build(&self, headers: &[String]) -> Result<ResolvedSpec, SpecError> {
        let resolve_opt = |spec: &Option<ColumnRefSpec>, role: &str| match spec {
            Some(s) => ColumnRef::from(s).resolve(role, headers),
            None => Ok(None),
        };

        // 1) Value column is required even when marked optional.
        let value_ref = ColumnRef {
            required: true,
            ..ColumnRef::from(&self.value)
        };
        let value = value_ref
            .resolve("value", headers)?
            .ok_or_else(|| SpecError::MissingColumn {
                role: "value".into(),
                tried: vec![],
            })?;

        // 2) Optional roles.
        let group = resolve_opt(&self.group, "group")?;
        let numeric_x = resolve_opt(&self.numeric_x, "numeric_x")?;
        let location = resolve_opt(&self.location, "location")?;
        let geometry = resolve_opt(&self.geometry, "geometry")?.map(|source| GeometryColumns {
            source,
            latitude: normalize_header(&self.latitude_column),
            longitude: normalize_header(&self.longitude_column),
        });

        if let Some(geo) = &geometry {
            check_coordinate_columns(geo, headers, &value, numeric_x.as_deref())?;
        }

        let mut breakdowns = Vec::new();
        for (i, b) in self.breakdowns.iter().enumerate() {
            if let Some(col) = ColumnRef::from(b).resolve(&format!("breakdowns[{}]", i), headers)? {
                if !breakdowns.contains(&col) {
                    breakdowns.push(col);
                }
            }
        }

        // 3) Compare pair.
        let compare = match self.compare.as_slice() {
            [] => None,
            [a, b] => Some((a.clone(), b.clone())),
            other => return Err(SpecError::BadCompare(other.len())),
        };

        // 4) Filters must name real columns.
        let mut filters = BTreeMap::new();
        for (col, allowed) in &self.filters {
            let col = normalize_header(col);
            if !headers.contains(&col) {
                return Err(SpecError::UnknownFilterColumn(col));
            }
            filters.insert(col, allowed.iter().cloned().collect());
        }

        Ok(ResolvedSpec {
            title: self.title.clone().unwrap_or_else(|| format!("{} overview", value)),
            value,
            group,
            compare,
            breakdowns,
            numeric_x,
            location,
            geometry,
            filters,
        })
    }
}

/// Latitude/longitude are written as new columns; they may not replace the
/// geometry text, a numeric column, or anything already in the file.
fn check_coordinate_columns(
    geo: &GeometryColumns,
    headers: &[String],
    value: &str,
    numeric_x: Option<&str>,
) -> Result<(), SpecError> {
    let clash = |column: &str, with: &str| SpecError::CoordinateColumnClash {
        column: column.to_string(),
        with: with.to_string(),
    };

    if geo.latitude == geo.longitude {
        return Err(clash(&geo.latitude, "longitude output"));
    }
    for out in [&geo.latitude, &geo.longitude] {
        if *out == geo.source {
            return Err(clash(out, "geometry source column"));
        }
        if out == value {
            return Err(clash(out, "value column"));
        }
        if numeric_x == Some(out.as_str()) {
            return Err(clash(out, "numeric_x column"));
        }
        if headers.contains(out) {
            return Err(clash(out, "existing column"));
        }
    }
    Ok(())
}

impl ResolvedSpec {
    /// Columns the cleaning pipeline has to touch.
    pub fn clean_spec(&self) -> CleanSpec {
        let mut value_columns = vec![self.value.clone()];
        if let Some(x) = &self.numeric_x {
            if x != &self.value {
                value_columns.push(x.clone());
            }
        }
        CleanSpec {
            value_columns,
            geometry: self.geometry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SALARY_SPEC: &str = r#"{
        "title": "Salary gap",
        "value": { "candidates": ["salary", "salario"] },
        "group": { "candidates": ["gender", "genero"] },
        "compare": ["Male", "Female"],
        "breakdowns": [
            { "candidates": ["sector"], "required": false },
            { "candidates": ["education", "educacion"], "required": false }
        ],
        "numeric_x": { "candidates": ["experience", "experiencia"], "required": false },
        "filters": { "Gender": ["Male"] }
    }"#;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_salary_dataset() {
        let spec: DatasetSpec = serde_json::from_str(SALARY_SPEC).unwrap();
        let h = headers(&["gender", "monthly_salary", "sector", "years_experience"]);
        let r = spec.validate_and_build(&h).unwrap();

        assert_eq!(r.title, "Salary gap");
        assert_eq!(r.value, "monthly_salary");
        assert_eq!(r.group.as_deref(), Some("gender"));
        assert_eq!(r.compare, Some(("Male".into(), "Female".into())));
        assert_eq!(r.breakdowns, vec!["sector".to_string()]);
        assert_eq!(r.numeric_x.as_deref(), Some("years_experience"));
        assert_eq!(r.geometry, None);
        assert_eq!(
            r.filters.get("gender").unwrap().iter().collect::<Vec<_>>(),
            vec!["Male"]
        );

        let clean = r.clean_spec();
        assert_eq!(
            clean.value_columns,
            vec!["monthly_salary".to_string(), "years_experience".to_string()]
        );
    }

    #[test]
    fn missing_value_column_is_named() {
        let spec: DatasetSpec = serde_json::from_str(SALARY_SPEC).unwrap();
        let err = spec
            .validate_and_build(&headers(&["gender", "sector"]))
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::MissingColumn {
                role: "value".into(),
                tried: vec!["salary".into(), "salario".into()]
            }
        );
        assert!(err.to_string().contains("no column found for value"));
    }

    #[test]
    fn optional_value_flag_is_ignored() {
        let spec: DatasetSpec = serde_json::from_str(
            r#"{ "value": { "candidates": ["salary"], "required": false } }"#,
        )
        .unwrap();
        assert!(matches!(
            spec.validate_and_build(&headers(&["gender"])),
            Err(SpecError::MissingColumn { .. })
        ));
    }

    #[test]
    fn geometry_columns_get_default_names() {
        let spec: DatasetSpec = serde_json::from_str(
            r#"{ "value": "Data_Value", "location": "LocationDesc", "geometry": "Geolocation" }"#,
        )
        .unwrap();
        let h = headers(&["locationdesc", "data_value", "geolocation"]);
        let r = spec.validate_and_build(&h).unwrap();
        assert_eq!(r.title, "data_value overview");
        assert_eq!(
            r.geometry,
            Some(GeometryColumns {
                source: "geolocation".into(),
                latitude: "latitude".into(),
                longitude: "longitude".into(),
            })
        );
        assert_eq!(r.clean_spec().value_columns, vec!["data_value".to_string()]);
    }

    fn clash_for(spec_json: &str, h: &[&str]) -> SpecError {
        let spec: DatasetSpec = serde_json::from_str(spec_json).unwrap();
        spec.validate_and_build(&headers(h)).unwrap_err()
    }

    #[test]
    fn geometry_source_named_like_output_is_rejected() {
        let err = clash_for(
            r#"{ "value": "data_value", "geometry": "latitude" }"#,
            &["data_value", "latitude"],
        );
        assert_eq!(
            err,
            SpecError::CoordinateColumnClash {
                column: "latitude".into(),
                with: "geometry source column".into()
            }
        );
    }

    #[test]
    fn existing_coordinate_column_is_not_overwritten() {
        let err = clash_for(
            r#"{ "value": "data_value", "geometry": "geolocation" }"#,
            &["data_value", "geolocation", "longitude"],
        );
        assert!(matches!(
            err,
            SpecError::CoordinateColumnClash { ref column, ref with }
                if column == "longitude" && with == "existing column"
        ));
    }

    #[test]
    fn coordinate_outputs_must_differ_from_numeric_columns() {
        let err = clash_for(
            r#"{ "value": "data_value", "geometry": "geolocation", "latitude_column": "Data Value" }"#,
            &["data_value", "geolocation"],
        );
        assert!(matches!(err, SpecError::CoordinateColumnClash { ref with, .. } if with == "value column"));

        let err = clash_for(
            r#"{ "value": "data_value", "geometry": "geolocation", "longitude_column": "latitude" }"#,
            &["data_value", "geolocation"],
        );
        assert!(matches!(err, SpecError::CoordinateColumnClash { ref with, .. } if with == "longitude output"));
    }

    #[test]
    fn renamed_outputs_avoid_existing_columns() {
        let spec: DatasetSpec = serde_json::from_str(
            r#"{ "value": "data_value", "geometry": "geolocation",
                 "latitude_column": "lat_decoded", "longitude_column": "lon_decoded" }"#,
        )
        .unwrap();
        let r = spec
            .validate_and_build(&headers(&["data_value", "geolocation", "latitude", "longitude"]))
            .unwrap();
        let geo = r.geometry.unwrap();
        assert_eq!((geo.latitude.as_str(), geo.longitude.as_str()), ("lat_decoded", "lon_decoded"));
    }

    #[test]
    fn unknown_filter_column() {
        let mut spec = DatasetSpec::for_value("salary");
        spec.filters.insert("region".into(), vec!["North".into()]);
        assert_eq!(
            spec.validate_and_build(&headers(&["salary"])),
            Err(SpecError::UnknownFilterColumn("region".into()))
        );
    }

    #[test]
    fn compare_needs_a_pair() {
        let mut spec = DatasetSpec::for_value("salary");
        spec.compare = vec!["Male".into()];
        assert_eq!(
            spec.validate_and_build(&headers(&["salary"])),
            Err(SpecError::BadCompare(1))
        );
    }

    #[test]
    fn delimiters() {
        let mut spec = DatasetSpec::for_value("v");
        assert_eq!(spec.delimiter(), Ok(b','));
        spec.delimiter = Some(";".into());
        assert_eq!(spec.delimiter(), Ok(b';'));
        spec.delimiter = Some("\\t".into());
        assert_eq!(spec.delimiter(), Ok(b'\t'));
        spec.delimiter = Some("::".into());
        assert_eq!(spec.delimiter(), Err(SpecError::BadDelimiter("::".into())));
    }
}
