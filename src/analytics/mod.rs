//! Click analytics
//!
//! Classification of raw hits (user agent, client IP, geolocation),
//! fire-and-forget click recording, and the derived-view data shapes.
//! All aggregation is computed fresh at query time by the storage layer;
//! there is no incremental counter or cache to keep consistent.

pub mod classifier;
pub mod geo;
pub mod ip_extractor;
pub mod models;
pub mod recorder;

pub use classifier::{parse_user_agent, DeviceInfo};
pub use geo::{DisabledGeo, GeoInfo, GeoLookup, HttpGeoService};
pub use ip_extractor::extract_client_ip;
pub use recorder::ClickRecorder;
