//! Multi-facet filtering and KPI aggregation over reinsurance policy records.
//!
//! Raw records are normalized, restricted to what the caller's roles may see,
//! indexed per facet, filtered with union-within / intersection-across
//! semantics, bucketed by inception period and reduced to premium, claims and
//! ratio figures.

pub mod cache;
pub mod columns;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod facets;
pub mod filter;
pub mod kpi;
pub mod normalize;
pub mod record;
pub mod request;
pub mod roles;
pub mod synth;
pub mod time;

pub use error::{EngineError, Result};
