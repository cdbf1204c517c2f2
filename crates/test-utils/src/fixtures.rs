//! Common test fixtures for gtiff-viewer tests.

/// Bounding boxes used for synthetic artifacts.
pub mod bbox {
    use viewer_common::BoundingBox;

    /// Default form extent over north-east Italy
    pub const NORTH_ITALY: BoundingBox = BoundingBox {
        min_x: 11.9,
        min_y: 45.0,
        max_x: 13.2,
        max_y: 46.0,
    };

    /// Two disjoint extents so tests can tell overlays apart
    pub const ALPS: BoundingBox = BoundingBox {
        min_x: 6.0,
        min_y: 45.5,
        max_x: 10.0,
        max_y: 47.5,
    };

    pub const SICILY: BoundingBox = BoundingBox {
        min_x: 12.0,
        min_y: 36.5,
        max_x: 15.5,
        max_y: 38.5,
    };

    /// UTM zone 32N meters; outside lon/lat range
    pub const UTM_32N: BoundingBox = BoundingBox {
        min_x: 500_000.0,
        min_y: 5_000_000.0,
        max_x: 600_000.0,
        max_y: 5_100_000.0,
    };
}

/// Form values used across tests.
pub mod form {
    use viewer_common::ParameterForm;

    /// The form as the page first shows it.
    pub fn default_form() -> ParameterForm {
        ParameterForm::default()
    }

    /// A range request over forecast hours 1..=3.
    pub fn range_form() -> ParameterForm {
        ParameterForm {
            start_fc: "1".to_string(),
            end_fc: "3".to_string(),
            fc_range: true,
            ..ParameterForm::default()
        }
    }
}

/// A fresh session workspace inside a temporary directory.
///
/// Keep the `TempDir` alive for as long as the workspace is used.
pub fn temp_workspace() -> (tempfile::TempDir, viewer_common::Workspace) {
    let dir = tempfile::Builder::new()
        .prefix("gtiff-viewer-test-")
        .tempdir()
        .expect("Failed to create temporary workspace directory");
    let workspace = viewer_common::Workspace::open(dir.path().join("session"))
        .expect("Failed to open workspace");
    (dir, workspace)
}
