//! DeviceLens — cross-source retrieval and correlation over the six openFDA
//! medical device datasets (510(k), PMA, MAUDE events, recalls,
//! classification, GUDID).
//!
//! The pipeline runs in stages: [`query::expand`] turns free text into
//! search variants, [`retrieve::DeviceRetriever`] fans them out across the
//! datasets with caching and rate limiting, [`profile::correlate`] folds
//! the results into one [`profile::DeviceProfile`], and
//! [`narrative::NarrativeChain`] optionally renders a plain-language
//! summary. Every stage past retrieval is pure and every external
//! collaborator sits behind a trait.

pub mod cache;
pub mod client;
pub mod config;
pub mod fetch;
pub mod narrative;
pub mod profile;
pub mod query;
pub mod record;
pub mod retrieve;
pub mod source;

pub use config::{RetrievalConfig, RiskWeights};
pub use profile::{correlate, DeviceProfile};
pub use record::{DateRange, RawRecord, SourceResult};
pub use retrieve::{DeviceRetriever, Retrieval};
pub use source::SourceKind;
