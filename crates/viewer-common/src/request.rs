//! Forecast request parameters and the output name stem derived from them.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::bbox::BoundingBox;
use crate::error::{ViewerError, ViewerResult};

/// Extension the collaborator is told to write.
pub const RASTER_EXTENSION: &str = "tif";

/// Stem text for an end forecast hour left blank.
pub const UNSET_END: &str = "None";

/// Raw form values exactly as the user entered them.
///
/// Nothing here is validated: malformed values travel unchanged until the
/// retrieval invoker or the raster reader tries to use them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterForm {
    pub dataset: String,
    pub varname: String,
    pub bbox: String,
    /// `%Y-%m-%d`, empty for the latest available run.
    pub date: String,
    /// `%H:%M`
    pub run: String,
    pub start_fc: String,
    /// Empty for an open-ended accumulation window.
    pub end_fc: String,
    /// One raster per forecast hour instead of a single accumulated raster.
    pub fc_range: bool,
}

impl Default for ParameterForm {
    fn default() -> Self {
        Self {
            dataset: "COSMO-2I".to_string(),
            varname: "tp".to_string(),
            bbox: "11.9,45,13.2,46".to_string(),
            date: String::new(),
            run: "00:00".to_string(),
            start_fc: "1".to_string(),
            end_fc: String::new(),
            fc_range: false,
        }
    }
}

/// Form values as submitted, where an absent key is `None`.
///
/// A key sent empty stays empty; only keys left out fall back to the
/// defaults passed to [`FormOverrides::over`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormOverrides {
    pub dataset: Option<String>,
    pub varname: Option<String>,
    pub bbox: Option<String>,
    pub date: Option<String>,
    pub run: Option<String>,
    pub start_fc: Option<String>,
    pub end_fc: Option<String>,
    pub fc_range: Option<bool>,
}

impl FormOverrides {
    pub fn over(self, defaults: &ParameterForm) -> ParameterForm {
        ParameterForm {
            dataset: self.dataset.unwrap_or_else(|| defaults.dataset.clone()),
            varname: self.varname.unwrap_or_else(|| defaults.varname.clone()),
            bbox: self.bbox.unwrap_or_else(|| defaults.bbox.clone()),
            date: self.date.unwrap_or_else(|| defaults.date.clone()),
            run: self.run.unwrap_or_else(|| defaults.run.clone()),
            start_fc: self.start_fc.unwrap_or_else(|| defaults.start_fc.clone()),
            end_fc: self.end_fc.unwrap_or_else(|| defaults.end_fc.clone()),
            fc_range: self.fc_range.unwrap_or(defaults.fc_range),
        }
    }
}

impl ParameterForm {
    /// Load form defaults from a YAML file. Missing keys keep the built-in
    /// defaults.
    pub fn load_defaults(path: &Path) -> ViewerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            ViewerError::InternalError(format!(
                "Failed to parse form defaults {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Derive the output name stem.
    ///
    /// `{dataset}_{varname}_{date}_{run}_{start_fc}-{end_fc}` over the raw
    /// values. An unset end renders as `None`. The range flag does not take
    /// part.
    pub fn output_stem(&self) -> OutputNameStem {
        let end_fc = if self.end_fc.trim().is_empty() {
            UNSET_END
        } else {
            self.end_fc.as_str()
        };
        OutputNameStem(format!(
            "{}_{}_{}_{}_{}-{}",
            self.dataset, self.varname, self.date, self.run, self.start_fc, end_fc
        ))
    }

    /// Parse the raw values into a typed request.
    ///
    /// Only type conversion happens here. Corner ordering and
    /// `end >= start` are the collaborator's business.
    pub fn to_request(&self) -> ViewerResult<ForecastRequest> {
        let stem = self.output_stem();
        if stem.0.contains(['/', '\\']) || stem.0.contains('\0') {
            return Err(ViewerError::invalid_parameter(
                "out",
                format!("'{}' is not a plain file name", stem),
            ));
        }

        let bbox = BoundingBox::parse(&self.bbox)
            .map_err(|e| ViewerError::invalid_parameter("bbox", e.to_string()))?;

        let date = match self.date.trim() {
            "" => None,
            value => Some(NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                ViewerError::invalid_parameter("date", format!("'{}': {}", value, e))
            })?),
        };

        let run = NaiveTime::parse_from_str(self.run.trim(), "%H:%M").map_err(|e| {
            ViewerError::invalid_parameter("run", format!("'{}': {}", self.run, e))
        })?;

        let forecast_start = self.start_fc.trim().parse::<u32>().map_err(|e| {
            ViewerError::invalid_parameter("start_fc", format!("'{}': {}", self.start_fc, e))
        })?;

        let forecast_end = match self.end_fc.trim() {
            "" => None,
            value => Some(value.parse::<u32>().map_err(|e| {
                ViewerError::invalid_parameter("end_fc", format!("'{}': {}", value, e))
            })?),
        };

        Ok(ForecastRequest {
            dataset: self.dataset.clone(),
            variable: self.varname.clone(),
            bbox,
            date,
            run,
            forecast_start,
            forecast_end,
            range_mode: self.fc_range,
            stem,
        })
    }
}

/// Typed forecast request handed to the retrieval collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub dataset: String,
    pub variable: String,
    pub bbox: BoundingBox,
    /// `None` asks for the latest available date.
    pub date: Option<NaiveDate>,
    pub run: NaiveTime,
    pub forecast_start: u32,
    /// `None` leaves the accumulation window open-ended.
    pub forecast_end: Option<u32>,
    pub range_mode: bool,
    /// Computed once from the form and carried by value.
    pub stem: OutputNameStem,
}

impl ForecastRequest {
    pub fn date_arg(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn run_arg(&self) -> String {
        self.run.format("%H:%M").to_string()
    }
}

/// Deterministic file name prefix shared by the collaborator output and the
/// artifact scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputNameStem(String);

impl OutputNameStem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name passed to the collaborator as its target.
    pub fn output_filename(&self) -> String {
        format!("{}.{}", self.0, RASTER_EXTENSION)
    }

    /// True when `file_name` belongs to this stem.
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.0)
    }
}

impl fmt::Display for OutputNameStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
