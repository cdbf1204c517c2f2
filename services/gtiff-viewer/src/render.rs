//! Render pass: re-scan the workspace, decode matches, place the overlay.
//!
//! A pass runs on every layers request whether or not a retrieval happened,
//! so whatever rasters are present under the current stem are shown.

use std::path::{Path, PathBuf};

use geotiff_reader::{read_geotiff, GeoTiffError, RasterArtifact, RasterInfo, RasterLimits};
use renderer::png::encode_overlay;
use renderer::{
    min_max_stretch, MapView, NormalizedOverlay, OverlayLayer, PositionSelector, ValueRange,
};
use serde::Serialize;
use tracing::{debug, instrument, warn};
use viewer_common::{OutputNameStem, ViewerError, ViewerResult, Workspace};

use crate::metrics;

/// Warning shown when nothing matches the stem.
pub const NO_ARTIFACTS_WARNING: &str = "No GeoTIFF files found.";

/// Why one artifact could not be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactError {
    pub kind: &'static str,
    pub message: String,
}

impl From<&GeoTiffError> for ArtifactError {
    fn from(err: &GeoTiffError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One matched file, decoded or not.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEntry {
    pub position: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<RasterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ArtifactError>,
}

/// Result of one render pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Empty {
        stem: OutputNameStem,
        warning: &'static str,
    },
    Map {
        stem: OutputNameStem,
        /// `None` when no artifact decoded
        map: Option<MapView>,
        selector: PositionSelector,
        artifacts: Vec<ArtifactEntry>,
        /// `None` when the selected artifact is invalid
        layer: Option<OverlayLayer>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value_range: Option<ValueRange>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ArtifactError>,
    },
}

impl RenderOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RenderOutcome::Empty { .. } => "empty",
            RenderOutcome::Map { layer: Some(_), .. } => "rendered",
            RenderOutcome::Map { layer: None, .. } => "invalid",
        }
    }
}

/// Scan `workspace` for `stem` and build the outcome for `position`.
///
/// Every match is decoded so the map can be centered and invalid artifacts
/// reported; only the selected one is stretched.
#[instrument(skip(workspace, limits, image_url_for), fields(stem = %stem))]
pub fn render_pass(
    workspace: &Workspace,
    stem: &OutputNameStem,
    position: Option<usize>,
    limits: &RasterLimits,
    image_url_for: &dyn Fn(usize) -> String,
) -> ViewerResult<RenderOutcome> {
    let paths = workspace.find_artifacts(stem)?;
    let Some(selector) = PositionSelector::new(paths.len(), position) else {
        debug!("No artifacts under stem");
        metrics::record_render_pass("empty");
        return Ok(RenderOutcome::Empty {
            stem: stem.clone(),
            warning: NO_ARTIFACTS_WARNING,
        });
    };

    let mut artifacts = Vec::with_capacity(paths.len());
    let mut map = None;
    let mut selected: Option<Result<RasterArtifact, ArtifactError>> = None;

    for (index, path) in paths.iter().enumerate() {
        let position = index + 1;
        let name = file_name(path);
        match read_geotiff(path, limits) {
            Ok(artifact) => {
                if map.is_none() {
                    map = Some(MapView::centered_on(&artifact.bounds));
                }
                artifacts.push(ArtifactEntry {
                    position,
                    name,
                    info: Some(artifact.info()),
                    error: None,
                });
                if index == selector.index() {
                    selected = Some(Ok(artifact));
                }
            }
            Err(err) => {
                warn!(name = %name, kind = err.kind(), error = %err, "Invalid artifact");
                metrics::record_invalid_artifact(err.kind());
                let error = ArtifactError::from(&err);
                if index == selector.index() {
                    selected = Some(Err(error.clone()));
                }
                artifacts.push(ArtifactEntry {
                    position,
                    name,
                    info: None,
                    error: Some(error),
                });
            }
        }
    }

    let (layer, value_range, error) = match selected {
        Some(Ok(artifact)) => {
            let overlay = stretch(&artifact)?;
            let layer = OverlayLayer::new(
                selector.value,
                artifact.name.clone(),
                image_url_for(selector.value),
                &artifact.bounds,
            );
            (Some(layer), overlay.range, None)
        }
        Some(Err(error)) => (None, None, Some(error)),
        None => (None, None, None),
    };

    let outcome = RenderOutcome::Map {
        stem: stem.clone(),
        map,
        selector,
        artifacts,
        layer,
        value_range,
        error,
    };
    metrics::record_render_pass(outcome.label());
    Ok(outcome)
}

/// PNG of the overlay at 1-based `position` under `stem`.
#[instrument(skip(workspace, limits), fields(stem = %stem))]
pub fn render_overlay_png(
    workspace: &Workspace,
    stem: &OutputNameStem,
    position: usize,
    limits: &RasterLimits,
) -> ViewerResult<Vec<u8>> {
    let paths = workspace.find_artifacts(stem)?;
    if paths.is_empty() {
        return Err(ViewerError::NoArtifacts(stem.to_string()));
    }
    let path = select(&paths, position)?;
    let name = file_name(path);

    let artifact = read_geotiff(path, limits).map_err(|e| e.for_artifact(&name))?;
    let overlay = stretch(&artifact)?;
    let png = encode_overlay(&overlay).map_err(|e| ViewerError::RenderError(e.to_string()))?;

    metrics::record_overlay_png(png.len());
    debug!(name = %name, bytes = png.len(), "Encoded overlay");
    Ok(png)
}

fn select(paths: &[PathBuf], position: usize) -> ViewerResult<&PathBuf> {
    position
        .checked_sub(1)
        .and_then(|index| paths.get(index))
        .ok_or(ViewerError::PositionOutOfRange {
            position,
            count: paths.len(),
        })
}

fn stretch(artifact: &RasterArtifact) -> ViewerResult<NormalizedOverlay> {
    min_max_stretch(
        &artifact.data,
        artifact.width as usize,
        artifact.height as usize,
        artifact.nodata,
    )
    .map_err(|e| ViewerError::RenderError(e.to_string()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{
        assert_approx_eq, bbox, create_ramp_grid, temp_workspace, write_geotiff, GeoTiffSpec,
    };

    fn assert_point_eq(left: [f64; 2], right: [f64; 2]) {
        assert_approx_eq!(left[0], right[0], 1e-6);
        assert_approx_eq!(left[1], right[1], 1e-6);
    }

    fn url(position: usize) -> String {
        format!("/img/{}", position)
    }

    fn stem() -> OutputNameStem {
        test_utils::form::default_form().output_stem()
    }

    fn write(workspace: &Workspace, name: &str, bounds: viewer_common::BoundingBox) {
        let spec = GeoTiffSpec::new(4, 3, bounds);
        write_geotiff(
            &workspace.path().join(name),
            &spec,
            &create_ramp_grid(4, 3, 0.0, 10.0),
        )
        .unwrap();
    }

    #[test]
    fn test_empty_workspace() {
        let (_dir, workspace) = temp_workspace();
        let limits = RasterLimits::default();
        let outcome = render_pass(&workspace, &stem(), None, &limits, &url).unwrap();
        assert!(matches!(
            outcome,
            RenderOutcome::Empty { warning: NO_ARTIFACTS_WARNING, .. }
        ));
    }

    #[test]
    fn test_open_ended_stem_ignores_closed_window_artifacts() {
        let (_dir, workspace) = temp_workspace();
        let closed = viewer_common::ParameterForm {
            end_fc: "3".to_string(),
            fc_range: true,
            ..test_utils::form::default_form()
        }
        .output_stem();
        write(&workspace, &format!("{}_1.tif", closed), bbox::NORTH_ITALY);

        let limits = RasterLimits::default();
        let outcome = render_pass(&workspace, &stem(), None, &limits, &url).unwrap();
        assert_eq!(outcome.label(), "empty");
    }

    #[test]
    fn test_selected_layer_uses_own_bounds() {
        let (_dir, workspace) = temp_workspace();
        let stem = stem();
        write(&workspace, &format!("{}_1.tif", stem), bbox::NORTH_ITALY);
        write(&workspace, &format!("{}_2.tif", stem), bbox::ALPS);

        let limits = RasterLimits::default();
        let outcome = render_pass(&workspace, &stem, Some(2), &limits, &url).unwrap();
        let RenderOutcome::Map { map, selector, layer, artifacts, .. } = outcome else {
            panic!("expected a map");
        };
        assert_eq!(selector.max, 2);
        assert_eq!(artifacts.len(), 2);
        let layer = layer.unwrap();
        assert_eq!(layer.image_url, "/img/2");
        let expected = bbox::ALPS.lat_lon_corners();
        assert_point_eq(layer.bounds[0], expected[0]);
        assert_point_eq(layer.bounds[1], expected[1]);
        assert_point_eq(map.unwrap().center, bbox::NORTH_ITALY.center_lat_lon());
    }

    #[test]
    fn test_invalid_selected_artifact() {
        let (_dir, workspace) = temp_workspace();
        let stem = stem();
        std::fs::write(workspace.path().join(format!("{}_1.tif", stem)), b"junk").unwrap();
        write(&workspace, &format!("{}_2.tif", stem), bbox::SICILY);

        let limits = RasterLimits::default();
        let outcome = render_pass(&workspace, &stem, Some(1), &limits, &url).unwrap();
        assert_eq!(outcome.label(), "invalid");
        let RenderOutcome::Map { map, layer, error, .. } = outcome else {
            panic!("expected a map");
        };
        assert!(layer.is_none());
        assert_eq!(error.unwrap().kind, "decode");
        assert_point_eq(map.unwrap().center, bbox::SICILY.center_lat_lon());

        assert!(matches!(
            render_overlay_png(&workspace, &stem, 1, &limits),
            Err(ViewerError::InvalidArtifact { .. })
        ));
        assert!(render_overlay_png(&workspace, &stem, 2, &limits).is_ok());
    }

    #[test]
    fn test_position_out_of_range() {
        let (_dir, workspace) = temp_workspace();
        let stem = stem();
        write(&workspace, &stem.output_filename(), bbox::NORTH_ITALY);

        for position in [0, 2] {
            assert!(matches!(
                render_overlay_png(&workspace, &stem, position, &RasterLimits::default()),
                Err(ViewerError::PositionOutOfRange { count: 1, .. })
            ));
        }
    }
}
