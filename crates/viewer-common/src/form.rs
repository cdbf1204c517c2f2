//! Field definitions for the parameter collector.

use serde::Serialize;

use crate::request::ParameterForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Toggle,
}

/// One editable control on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    /// Query/JSON key, identical to the `ParameterForm` field name.
    pub name: &'static str,
    pub label: &'static str,
    pub help: &'static str,
    pub kind: FieldKind,
    /// Current value; `"true"`/`"false"` for toggles.
    pub value: String,
}

impl FormField {
    fn text(name: &'static str, label: &'static str, help: &'static str, value: &str) -> Self {
        Self {
            name,
            label,
            help,
            kind: FieldKind::Text,
            value: value.to_string(),
        }
    }
}

/// The controls in display order, filled with `values`.
pub fn form_fields(values: &ParameterForm) -> Vec<FormField> {
    vec![
        FormField::text("dataset", "Dataset", "The dataset to download.", &values.dataset),
        FormField::text(
            "varname",
            "Varname",
            "The variable name to extract from the grib file.",
            &values.varname,
        ),
        FormField::text(
            "bbox",
            "Bbox",
            "The bounding box to extract the data.",
            &values.bbox,
        ),
        FormField::text(
            "date",
            "Date",
            "The datetime to download with format %Y-%m-%d. Default is latest datetime available.",
            &values.date,
        ),
        FormField::text("run", "Run", "The model run to download, format %H:%M.", &values.run),
        FormField::text(
            "start_fc",
            "Start Forecast",
            "The hour at which the accumulation starts.",
            &values.start_fc,
        ),
        FormField::text(
            "end_fc",
            "End Forecast",
            "The hour at which the accumulation ends.",
            &values.end_fc,
        ),
        FormField {
            name: "fc_range",
            label: "Forecast Range",
            help: "If True the output will be multiple tif files, one for each forecast hour. Default is False",
            kind: FieldKind::Toggle,
            value: values.fc_range.to_string(),
        },
    ]
}
