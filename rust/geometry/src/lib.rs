//! Noisefield obstruction geometry
//!
//! Builds the geometric scene a noise map is computed against: merged
//! building footprints, the triangulated computation domain and free-field
//! visibility queries, using earcutr tessellation and i_overlay polygon
//! booleans.

pub mod contour;
pub mod error;
pub mod footprint;
pub mod mesh;
pub mod triangulation;
pub mod visibility;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use contour::Envelope;
pub use error::{Error, Result};
pub use footprint::{merge_footprints, Footprint};
pub use mesh::{DomainMesh, MeshBuilder, Triangle, NO_NEIGHBOR};
pub use triangulation::{EarcutTessellator, Tessellate};
pub use visibility::{FootprintIndex, FreeFieldTest, WallSegment};
