pub mod geojson;

pub use geojson::{Feature, FeatureCollection, Geometry, Properties};
