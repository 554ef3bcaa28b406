//! Boundary acquisition
//!
//! [`BoundaryAcquisition`] is the single entry point that ties the source
//! resolver, cache, request gateway, and geometry processor together.
//! [`BoundaryLayer`] wraps it with viewport state for a map component.
//!
//! # Example
//!
//! ```ignore
//! use prayermap_geo::acquisition::{BoundaryAcquisition, BoundaryLayer, Viewport};
//!
//! let layer = BoundaryLayer::new(acquisition, hierarchy);
//! let state = layer.update_viewport(Viewport::new(9.0, center)).await;
//! if let Some(err) = &state.error {
//!     eprintln!("{}", err);
//! }
//! ```

mod error;
mod facade;
mod layer;

pub use error::AcquisitionError;
pub use facade::{
    AcquisitionOutcome, AcquisitionPhase, BoundaryAcquisition, DEGRADED_TTL_MINUTES,
};
pub use layer::{BoundaryLayer, LayerState, Viewport};
