pub mod arcgis;
pub mod cache;
pub mod config;
pub mod connector;
pub mod datasets;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod output;
pub mod resolver;
pub mod store;
