use serde::{Deserialize, Serialize};

use crate::core::geo::LatLng;

/// Closed latitude interval in degrees. `lo > hi` denotes the empty interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatInterval {
    pub lo: f64,
    pub hi: f64,
}

impl LatInterval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn empty() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn full() -> Self {
        Self::new(-90.0, 90.0)
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn contains(&self, lat: f64) -> bool {
        lat >= self.lo && lat <= self.hi
    }

    pub fn add_point(&self, lat: f64) -> Self {
        if self.is_empty() {
            Self::new(lat, lat)
        } else {
            Self::new(self.lo.min(lat), self.hi.max(lat))
        }
    }

    pub fn union(&self, other: &LatInterval) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    pub fn intersects(&self, other: &LatInterval) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.lo <= other.hi && other.lo <= self.hi
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }
}

/// Longitude interval in degrees on the circle `[-180, 180]`.
///
/// An interval with `lo > hi` wraps across the antimeridian, so
/// `[170, -170]` covers the 20 degrees around longitude 180. The empty
/// interval is `[180, -180]` and the full one is `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngInterval {
    pub lo: f64,
    pub hi: f64,
}

impl LngInterval {
    pub fn new(lo: f64, hi: f64) -> Self {
        // -180 and 180 are the same meridian; only the full interval keeps -180.
        let lo = if lo == -180.0 && hi != 180.0 { 180.0 } else { lo };
        let hi = if hi == -180.0 && lo != 180.0 { 180.0 } else { hi };
        Self { lo, hi }
    }

    pub fn empty() -> Self {
        Self { lo: 180.0, hi: -180.0 }
    }

    pub fn full() -> Self {
        Self { lo: -180.0, hi: 180.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.lo - self.hi == 360.0
    }

    pub fn is_full(&self) -> bool {
        self.hi - self.lo == 360.0
    }

    pub fn is_inverted(&self) -> bool {
        self.lo > self.hi
    }

    /// Angular length in degrees; negative for the empty interval.
    pub fn length(&self) -> f64 {
        let mut length = self.hi - self.lo;
        if length >= 0.0 {
            return length;
        }
        length += 360.0;
        if length > 0.0 {
            length
        } else {
            -1.0
        }
    }

    pub fn center(&self) -> f64 {
        let center = 0.5 * (self.lo + self.hi);
        if !self.is_inverted() {
            return center;
        }
        if center <= 0.0 {
            center + 180.0
        } else {
            center - 180.0
        }
    }

    pub fn contains(&self, lng: f64) -> bool {
        let lng = if lng == -180.0 { 180.0 } else { lng };
        if self.is_inverted() {
            (lng >= self.lo || lng <= self.hi) && !self.is_empty()
        } else {
            lng >= self.lo && lng <= self.hi
        }
    }

    /// Extends the interval by the shorter way around the circle.
    pub fn add_point(&self, lng: f64) -> Self {
        let lng = if lng == -180.0 { 180.0 } else { lng };
        if self.contains(lng) {
            return *self;
        }
        if self.is_empty() {
            return Self { lo: lng, hi: lng };
        }
        if positive_distance(lng, self.lo) < positive_distance(self.hi, lng) {
            Self::new(lng, self.hi)
        } else {
            Self::new(self.lo, lng)
        }
    }

    fn fast_contains(&self, lng: f64) -> bool {
        if self.is_inverted() {
            (lng >= self.lo || lng <= self.hi) && !self.is_empty()
        } else {
            lng >= self.lo && lng <= self.hi
        }
    }

    pub fn union(&self, other: &LngInterval) -> Self {
        if other.is_empty() {
            return *self;
        }
        if self.fast_contains(other.lo) {
            if self.fast_contains(other.hi) {
                // Either other ⊂ self, or the union wraps the whole circle.
                if self.contains_interval(other) {
                    return *self;
                }
                return Self::full();
            }
            return Self::new(self.lo, other.hi);
        }
        if self.fast_contains(other.hi) {
            return Self::new(other.lo, self.hi);
        }
        if self.is_empty() || other.fast_contains(self.lo) {
            return *other;
        }
        // Disjoint: join across the smaller gap.
        if positive_distance(other.hi, self.lo) < positive_distance(self.hi, other.lo) {
            Self::new(other.lo, self.hi)
        } else {
            Self::new(self.lo, other.hi)
        }
    }

    pub fn contains_interval(&self, other: &LngInterval) -> bool {
        if self.is_inverted() {
            if other.is_inverted() {
                return other.lo >= self.lo && other.hi <= self.hi;
            }
            return (other.lo >= self.lo || other.hi <= self.hi) && !self.is_empty();
        }
        if other.is_inverted() {
            return self.is_full() || other.is_empty();
        }
        other.lo >= self.lo && other.hi <= self.hi
    }

    pub fn intersects(&self, other: &LngInterval) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.is_inverted() {
            return other.is_inverted() || other.lo <= self.hi || other.hi >= self.lo;
        }
        if other.is_inverted() {
            return other.lo <= self.hi || other.hi >= self.lo;
        }
        other.lo <= self.hi && other.hi >= self.lo
    }
}

/// Distance travelled eastwards from `a` to `b`, in `[0, 360)`.
fn positive_distance(a: f64, b: f64) -> f64 {
    let d = b - a;
    if d >= 0.0 {
        d
    } else {
        (b + 180.0) - (a - 180.0)
    }
}

/// Latitude/longitude rectangle whose longitude side may wrap across the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub lat: LatInterval,
    pub lng: LngInterval,
}

impl LatLngBounds {
    pub fn new(lat: LatInterval, lng: LngInterval) -> Self {
        Self { lat, lng }
    }

    /// Creates empty bounds that can be extended
    pub fn empty() -> Self {
        Self::new(LatInterval::empty(), LngInterval::empty())
    }

    /// Bounds covering the whole sphere
    pub fn full() -> Self {
        Self::new(LatInterval::full(), LngInterval::full())
    }

    pub fn from_point(point: LatLng) -> Self {
        Self::empty().add_point(point)
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lat.lo <= -90.0 && self.lat.hi >= 90.0 && self.lng.is_full()
    }

    /// Returns bounds extended to include a point
    pub fn add_point(&self, point: LatLng) -> Self {
        Self::new(self.lat.add_point(point.lat), self.lng.add_point(point.lng))
    }

    /// Returns the union of this bounds with another bounds
    pub fn union(&self, other: &LatLngBounds) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::new(self.lat.union(&other.lat), self.lng.union(&other.lng))
    }

    /// Checks if the bounds intersect with another bounds
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        self.lat.intersects(&other.lat) && self.lng.intersects(&other.lng)
    }

    /// Checks if the bounds contain a point
    pub fn contains(&self, point: &LatLng) -> bool {
        self.lat.contains(point.lat) && self.lng.contains(point.lng)
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat.center(), self.lng.center())
    }

    /// Grows bounds computed from polygon rings so they cover the polygon
    /// interior even when a ring crosses the antimeridian or encircles a
    /// pole.
    pub fn expand_for_subregions(&self) -> Self {
        if self.is_empty() || self.is_full() {
            return *self;
        }

        let epsilon = 1e-12;
        let mut lat = LatInterval::new(
            (self.lat.lo - epsilon).max(-90.0),
            (self.lat.hi + epsilon).min(90.0),
        );
        let mut lng = self.lng;

        // A ring spanning half the circle or more may wind around a pole.
        if lng.length() >= 180.0 {
            lng = LngInterval::full();
            if lat.center() >= 0.0 {
                lat.hi = 90.0;
            } else {
                lat.lo = -90.0;
            }
        }

        // Polar closure: touching a pole covers every longitude.
        if lat.lo <= -90.0 || lat.hi >= 90.0 {
            lng = LngInterval::full();
        }

        Self::new(lat, lng)
    }

    /// Encodes as `[minLng, minLat, maxLng, maxLat]`, or `None` when empty.
    pub fn to_bbox(&self) -> Option<[f64; 4]> {
        if self.is_empty() {
            None
        } else {
            Some([self.lng.lo, self.lat.lo, self.lng.hi, self.lat.hi])
        }
    }
}

impl Default for LatLngBounds {
    fn default() -> Self {
        Self::empty()
    }
}
