use crate::api::JsonQuery;
use serde::{Deserialize, Deserializer, Serialize};

/// Listing identifier as issued by the service
pub type ListingId = i64;

/// Map zoom level sent with every cluster query
pub const CLUSTERS_ZOOM: u8 = 15;

/// Reads an explicit JSON `null` as the field's default value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Bounding box in the API's corner-pair form
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bounds {
    pub bottom_right: Coordinates,
    pub top_left: Coordinates,
}

/// Server-side aggregation bucket of listings within the queried area
///
/// Only `cluster_offer_ids` is used downstream; the rest is display metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cluster {
    #[serde(deserialize_with = "null_as_default")]
    pub coordinates: Coordinates,
    #[serde(deserialize_with = "null_as_default")]
    pub bbox: Bounds,
    #[serde(deserialize_with = "null_as_default")]
    pub geohash: String,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub min_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_price: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub has_newobject: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub favorite_ids: Vec<ListingId>,
    #[serde(deserialize_with = "null_as_default")]
    pub subdomain: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cluster_offer_ids: Vec<ListingId>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_viewed: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_any_from_developer: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClustersRequest {
    pub zoom: u8,
    pub bbox: Vec<Bounds>,
    pub json_query: JsonQuery,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClustersResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filtered: Vec<Cluster>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub offers_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetOffersByIdsRequest {
    #[serde(rename = "cianOfferIds")]
    pub cian_offer_ids: Vec<ListingId>,

    #[serde(rename = "jsonQuery")]
    pub json_query: JsonQuery,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOffersByIdsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub offers_serialized: Vec<Offer>,
}

/// A single listing record, reduced to the fields the crawl hands downstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Offer {
    #[serde(deserialize_with = "null_as_default")]
    pub geo: OfferGeo,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    pub rooms_count: Option<u32>,
    /// Square meters, sent by the API as text
    pub total_area: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub bargain_terms: BargainTerms,
}

impl Offer {
    /// Price in rubles
    pub fn price(&self) -> f64 {
        self.bargain_terms.price_rur
    }

    /// Parses the textual total area
    pub fn total_area_m2(&self) -> Option<f64> {
        self.total_area.as_deref()?.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferGeo {
    #[serde(deserialize_with = "null_as_default")]
    pub address: Vec<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub geo_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BargainTerms {
    #[serde(deserialize_with = "null_as_default")]
    pub price_rur: f64,
}
