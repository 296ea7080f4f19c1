//! Feature collection documents: links, item URLs and the streamed
//! `FeatureCollection` framing.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::core::bounds::LatLngBounds;
use crate::core::constants::{DEFAULT_LIMIT, GEOJSON_MEDIA_TYPE};
use crate::spatial::store::CollectionMetadata;
use crate::Result;

const HEADER: &[u8] = br#"{"type":"FeatureCollection","features":["#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub title: String,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: &str, media_type: &str, title: &str) -> Self {
        Self {
            href: href.into(),
            rel: rel.to_string(),
            media_type: media_type.to_string(),
            title: title.to_string(),
        }
    }

    /// A GeoJSON link whose title equals its relation
    pub fn geojson(href: impl Into<String>, rel: &str) -> Self {
        Self::new(href, rel, GEOJSON_MEDIA_TYPE, rel)
    }
}

/// URL of an items page, carrying only parameters that differ from their
/// defaults.
pub fn format_items_url(
    prefix: &str,
    collection: &str,
    start_id: &str,
    start: i64,
    limit: i64,
    bbox: &LatLngBounds,
) -> String {
    let mut params = Vec::with_capacity(4);
    if !start_id.is_empty() {
        params.push(format!("startID={}", urlencoding::encode(start_id)));
    }
    if start > 0 {
        params.push(format!("start={start}"));
    }
    if limit != DEFAULT_LIMIT {
        params.push(format!("limit={limit}"));
    }
    if !bbox.is_full() {
        if let Some([min_lng, min_lat, max_lng, max_lat]) = bbox.to_bbox() {
            params.push(format!(
                "bbox={min_lng:.7},{min_lat:.7},{max_lng:.7},{max_lat:.7}"
            ));
        }
    }

    let url = format!("{prefix}collections/{}/items", urlencoding::encode(collection));
    if params.is_empty() {
        url
    } else {
        format!("{url}?{}", params.join("&"))
    }
}

#[derive(Serialize)]
struct Footer<'a> {
    #[serde(skip_serializing_if = "no_links")]
    links: &'a [Link],
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<[f64; 4]>,
}

fn no_links(links: &&[Link]) -> bool {
    links.is_empty()
}

/// Streams a `FeatureCollection` into a sink, one pre-encoded feature at a
/// time.
///
/// The header is written on construction. Dropping the writer without
/// calling [`finish`](FeatureCollectionWriter::finish) leaves a truncated
/// document in the sink.
pub struct FeatureCollectionWriter<'w, W: Write + ?Sized> {
    out: &'w mut W,
    count: usize,
}

impl<'w, W: Write + ?Sized> FeatureCollectionWriter<'w, W> {
    pub fn begin(out: &'w mut W) -> Result<Self> {
        out.write_all(HEADER)?;
        Ok(Self { out, count: 0 })
    }

    /// Appends one feature, already encoded as compact JSON.
    pub fn push(&mut self, feature: &[u8]) -> Result<()> {
        if self.count > 0 {
            self.out.write_all(b",")?;
        }
        self.out.write_all(feature)?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Closes the feature array and appends links and bbox when present.
    pub fn finish(self, links: &[Link], bbox: Option<[f64; 4]>) -> Result<()> {
        let footer = serde_json::to_vec(&Footer { links, bbox })?;
        if footer.len() <= 2 {
            self.out.write_all(b"]}")?;
        } else {
            self.out.write_all(b"],")?;
            self.out.write_all(&footer[1..])?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub name: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsDocument {
    pub links: Vec<Link>,
    pub collections: Vec<CollectionEntry>,
}

/// Listing of all collections, each with a link to its items.
pub fn collections_document(public_path: &str, collections: &[CollectionMetadata]) -> CollectionsDocument {
    let collections = collections
        .iter()
        .map(|metadata| CollectionEntry {
            name: metadata.name.clone(),
            links: vec![Link::new(
                format!(
                    "{public_path}collections/{}",
                    urlencoding::encode(&metadata.name)
                ),
                "item",
                GEOJSON_MEDIA_TYPE,
                &metadata.name,
            )],
        })
        .collect();

    CollectionsDocument {
        links: vec![Link::new(
            format!("{public_path}collections"),
            "self",
            "application/json",
            "Collections",
        )],
        collections,
    }
}
