//! Typed parameters of an items query, parsed and validated before the
//! index is touched.

use chrono::{DateTime, TimeZone, Utc};

use crate::core::bounds::LatLngBounds;
use crate::core::constants::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::core::geo::LatLng;
use crate::{Error, Result};

/// Conditional-request times. `None` disables the respective check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
}

impl Preconditions {
    pub fn if_modified_since(time: DateTime<Utc>) -> Self {
        Self {
            if_modified_since: Some(time),
            ..Self::default()
        }
    }

    pub fn if_unmodified_since(time: DateTime<Utc>) -> Self {
        Self {
            if_unmodified_since: Some(time),
            ..Self::default()
        }
    }

    /// Evaluates both conditions at one-second resolution.
    ///
    /// `if_unmodified_since` is checked first and fails with
    /// [`Error::Modified`]; `if_modified_since` then fails with
    /// [`Error::NotModified`].
    pub fn check(&self, last_modified: DateTime<Utc>) -> Result<()> {
        let last_modified = round_to_second(last_modified);
        if let Some(since) = self.if_unmodified_since {
            if last_modified > round_to_second(since) {
                return Err(Error::Modified);
            }
        }
        if let Some(since) = self.if_modified_since {
            if last_modified <= round_to_second(since) {
                return Err(Error::NotModified);
            }
        }
        Ok(())
    }
}

/// Rounds half up to whole seconds.
pub fn round_to_second(time: DateTime<Utc>) -> DateTime<Utc> {
    let carry = i64::from(time.timestamp_subsec_nanos() >= 500_000_000);
    Utc.timestamp_opt(time.timestamp() + carry, 0)
        .single()
        .unwrap_or(time)
}

/// Parameters of [`SpatialIndex::get_items`](crate::spatial::index::SpatialIndex::get_items).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsQuery {
    /// Resume at this feature if it still exists; empty means unset
    pub start_id: String,
    /// Number of matching features to skip when `start_id` does not resolve
    pub start_index: i64,
    pub limit: i64,
    pub bbox: LatLngBounds,
    pub preconditions: Preconditions,
    pub include_links: bool,
}

impl Default for ItemsQuery {
    fn default() -> Self {
        Self {
            start_id: String::new(),
            start_index: 0,
            limit: DEFAULT_LIMIT,
            bbox: LatLngBounds::full(),
            preconditions: Preconditions::default(),
            include_links: true,
        }
    }
}

impl ItemsQuery {
    pub fn with_start(mut self, start_id: impl Into<String>, start_index: i64) -> Self {
        self.start_id = start_id.into();
        self.start_index = start_index;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_bbox(mut self, bbox: LatLngBounds) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_preconditions(mut self, preconditions: Preconditions) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_links(mut self, include_links: bool) -> Self {
        self.include_links = include_links;
        self
    }

    /// `limit` clamped to `[1, MAX_LIMIT]`
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// Builds a query from decoded URL query pairs.
    ///
    /// Recognizes `startID`, `start`, `limit` and `bbox`; other keys are
    /// ignored and blank values mean "absent".
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<ItemsQuery>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = ItemsQuery::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "startID" => query.start_id = value.to_string(),
                "start" => {
                    if let Some(start) = parse_integer("start", value)? {
                        query.start_index = start;
                    }
                }
                "limit" => {
                    if let Some(limit) = parse_integer("limit", value)? {
                        query.limit = limit;
                    }
                }
                "bbox" => query.bbox = parse_bbox(value)?,
                _ => {}
            }
        }
        Ok(query)
    }
}

fn parse_integer(name: &str, value: &str) -> Result<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| Error::MalformedInput(format!("{name} must be an integer, got {value:?}")))
}

/// Parses `minLng,minLat,maxLng,maxLat` or the 3D form
/// `minLng,minLat,minZ,maxLng,maxLat,maxZ`. An empty string selects
/// everything.
pub fn parse_bbox(s: &str) -> Result<LatLngBounds> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(LatLngBounds::full());
    }

    let malformed = || Error::MalformedInput(format!("malformed bbox parameter {s:?}"));
    let numbers = s
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(malformed)?;

    let (south_west, north_east) = match numbers.as_slice() {
        [min_lng, min_lat, max_lng, max_lat] => (
            LatLng::new(*min_lat, *min_lng),
            LatLng::new(*max_lat, *max_lng),
        ),
        [min_lng, min_lat, _, max_lng, max_lat, _] => (
            LatLng::new(*min_lat, *min_lng),
            LatLng::new(*max_lat, *max_lng),
        ),
        _ => return Err(malformed()),
    };
    if !south_west.is_valid() || !north_east.is_valid() {
        return Err(malformed());
    }

    Ok(LatLngBounds::from_point(south_west).add_point(north_east))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_bbox() {
        assert!(parse_bbox("").unwrap().is_full());
        assert!(parse_bbox("  ").unwrap().is_full());

        let bbox = parse_bbox("8.5, 47.9, 8.9, 49.2").unwrap();
        assert_eq!(bbox.to_bbox(), Some([8.5, 47.9, 8.9, 49.2]));

        let bbox = parse_bbox("8.5,47.9,100,8.9,49.2,200").unwrap();
        assert_eq!(bbox.to_bbox(), Some([8.5, 47.9, 8.9, 49.2]));

        for bad in ["1,2,3", "a,b,c,d", "1,2,3,4,5", "0,-91,1,1", "0,0,1,95", "nan,0,1,1", "0,0,181,1"] {
            assert!(
                matches!(parse_bbox(bad), Err(Error::MalformedInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_bbox_across_antimeridian() {
        let bbox = parse_bbox("170,-10,-170,10").unwrap();
        assert!(bbox.lng.is_inverted());
        assert!(bbox.contains(&LatLng::new(0.0, 179.0)));
        assert!(!bbox.contains(&LatLng::new(0.0, 0.0)));
    }

    #[test]
    fn test_from_pairs() {
        let query = ItemsQuery::from_pairs([
            ("startID", "W24785843"),
            ("start", "2"),
            ("limit", " 5 "),
            ("bbox", ""),
            ("f", "json"),
        ])
        .unwrap();
        assert_eq!(query.start_id, "W24785843");
        assert_eq!(query.start_index, 2);
        assert_eq!(query.limit, 5);
        assert!(query.bbox.is_full());
        assert!(query.include_links);

        let defaults = ItemsQuery::from_pairs([("limit", "")]).unwrap();
        assert_eq!(defaults, ItemsQuery::default());

        assert!(matches!(
            ItemsQuery::from_pairs([("limit", "ten")]),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(
            ItemsQuery::from_pairs([("start", "1.5")]),
            Err(Error::MalformedInput(_))
        ));
        assert!(matches!(
            ItemsQuery::from_pairs([("bbox", "1,2")]),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_clamped_limit() {
        assert_eq!(ItemsQuery::default().with_limit(0).clamped_limit(), 1);
        assert_eq!(ItemsQuery::default().with_limit(-4).clamped_limit(), 1);
        assert_eq!(ItemsQuery::default().with_limit(7).clamped_limit(), 7);
        assert_eq!(
            ItemsQuery::default().with_limit(MAX_LIMIT + 1).clamped_limit(),
            MAX_LIMIT
        );
    }

    #[test]
    fn test_round_to_second() {
        assert_eq!(
            round_to_second(time("2019-04-04T16:09:03.499Z")),
            time("2019-04-04T16:09:03Z")
        );
        assert_eq!(
            round_to_second(time("2019-04-04T16:09:03.5Z")),
            time("2019-04-04T16:09:04Z")
        );
    }

    #[test]
    fn test_preconditions() {
        let last_modified = time("2019-04-04T16:09:03.2Z");
        assert!(Preconditions::default().check(last_modified).is_ok());

        let exact = time("2019-04-04T16:09:03Z");
        assert!(matches!(
            Preconditions::if_modified_since(exact).check(last_modified),
            Err(Error::NotModified)
        ));
        assert!(Preconditions::if_modified_since(exact - Duration::seconds(1))
            .check(last_modified)
            .is_ok());

        assert!(Preconditions::if_unmodified_since(exact)
            .check(last_modified)
            .is_ok());
        assert!(matches!(
            Preconditions::if_unmodified_since(exact - Duration::seconds(1)).check(last_modified),
            Err(Error::Modified)
        ));

        let both = Preconditions {
            if_modified_since: Some(exact),
            if_unmodified_since: Some(exact - Duration::seconds(1)),
        };
        assert!(matches!(both.check(last_modified), Err(Error::Modified)));
    }
}
