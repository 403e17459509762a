pub mod assignment;
pub mod cache;
pub mod cli;
pub mod config;
pub mod display;
pub mod engagement;
pub mod error;
pub mod grouping;
pub mod marker;
pub mod model;
pub mod numbering;
pub mod overrides;
pub mod reconcile;
pub mod service;
pub mod sources;
pub mod store;

#[cfg(test)]
pub mod test_helpers;
