pub mod cache;
pub mod render;

// Re-exports for convenience
pub use cache::{TileCache, TileKey};
pub use render::{empty_tile, render_tile, TileCanvas};
