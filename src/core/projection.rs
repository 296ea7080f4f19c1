//! Web Mercator (EPSG:3857) conversions between latitude/longitude,
//! the 256×256 world pixel plane, and tile coordinates.

use std::f64::consts::PI;

use crate::core::bounds::{LatInterval, LatLngBounds, LngInterval};
use crate::core::constants::TILE_SIZE;
use crate::core::geo::{LatLng, Point, TileCoord};

/// Sine of the latitude is clamped to this magnitude to stay away from the
/// poles, where the projection diverges.
const MAX_SIN_LAT: f64 = 0.9999;

/// Projects a coordinate onto the 256×256 world pixel plane.
pub fn project(lat_lng: LatLng) -> Point {
    let size = f64::from(TILE_SIZE);
    let s = lat_lng.lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
    Point::new(
        size * (0.5 + lat_lng.lng / 360.0),
        size * (0.5 - ((1.0 + s) / (1.0 - s)).ln() / (4.0 * PI)),
    )
}

/// Projects a coordinate into fractional tile units at `zoom`, the inverse
/// of [`unproject`].
pub fn project_to_tile(zoom: u8, lat_lng: LatLng) -> Point {
    let world = project(lat_lng);
    world.multiply(zoom_scale(zoom) / f64::from(TILE_SIZE))
}

/// Converts fractional tile units at `zoom` back to a coordinate.
pub fn unproject(zoom: u8, x: f64, y: f64) -> LatLng {
    let scale = zoom_scale(zoom);
    let n = PI - 2.0 * PI * y / scale;
    let lat = (0.5 * (n.exp() - (-n).exp())).atan().to_degrees();
    let lng = x / scale * 360.0 - 180.0;
    LatLng::new(lat, lng)
}

/// Rectangle covering tile `(x, y)` through `(x + 1, y + 1)` at `tile.z`.
pub fn tile_bounds(tile: TileCoord) -> LatLngBounds {
    let x = f64::from(tile.x);
    let y = f64::from(tile.y);
    let north_west = unproject(tile.z, x, y);
    let south_east = unproject(tile.z, x + 1.0, y + 1.0);
    LatLngBounds::new(
        LatInterval::new(south_east.lat, north_west.lat),
        LngInterval::new(north_west.lng, south_east.lng),
    )
}

/// World-pixel position of the tile's north-west corner.
pub fn tile_origin(tile: TileCoord) -> Point {
    let size = f64::from(TILE_SIZE);
    let scale = zoom_scale(tile.z);
    Point::new(f64::from(tile.x) * size / scale, f64::from(tile.y) * size / scale)
}

/// Maps a world-pixel position into the pixel space of `tile`.
pub fn to_tile_pixel(tile: TileCoord, world: Point) -> Point {
    world.subtract(&tile_origin(tile)).multiply(zoom_scale(tile.z))
}

fn zoom_scale(zoom: u8) -> f64 {
    2f64.powi(i32::from(zoom))
}
