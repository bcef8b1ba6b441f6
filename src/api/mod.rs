//! Wire types for the listing search API
//!
//! This module describes the JSON bodies exchanged with the two search
//! endpoints the crawler uses:
//! - the map cluster query, which yields listing IDs for a bounding box
//! - the detail query, which yields full listing records for a batch of IDs
//!
//! It also holds the typed filter model that becomes the request's `jsonQuery`.

mod query;
mod types;

pub use query::{FilterTerm, JsonQuery, KnownFilter, RangeBounds, RawFilter, Scalar, SEARCH_TYPE_KEY};
pub use types::{
    Address, BargainTerms, Bounds, Cluster, Coordinates, GetClustersRequest, GetClustersResponse,
    GetOffersByIdsRequest, GetOffersByIdsResponse, ListingId, Offer, OfferGeo, CLUSTERS_ZOOM,
};
