//! Common types shared by the retrieval invoker, the raster readers and the
//! viewer service.

pub mod bbox;
pub mod error;
pub mod form;
pub mod request;
pub mod workspace;

pub use bbox::BoundingBox;
pub use error::{ViewerError, ViewerResult};
pub use form::{form_fields, FieldKind, FormField};
pub use request::{ForecastRequest, FormOverrides, OutputNameStem, ParameterForm};
pub use workspace::Workspace;
