pub mod index;
pub mod query;
pub mod reload;
pub mod store;
pub mod wfs;

pub use index::{LoadStats, ReloadOutcome, SpatialIndex};
pub use query::{parse_bbox, ItemsQuery, Preconditions};
pub use reload::{ReloadTrigger, Reloader};
pub use store::{CollectionMetadata, FeatureStore};
pub use wfs::{collections_document, format_items_url, CollectionsDocument, FeatureCollectionWriter, Link};
