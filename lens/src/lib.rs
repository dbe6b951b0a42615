//! Station and rent data toolkit: label normalization, naming-variant
//! tables, dataset comparison and merging, tile math, and the collectors
//! that produce the raw datasets.

pub mod catalog;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod error;
pub mod geo;
pub mod html_parser;
pub mod io;
pub mod mapping;
pub mod merge;
pub mod mlit;
pub mod nearby;
pub mod scraper;
pub mod text;
pub mod trimmer;

pub use config::{Config, DataPaths, ScraperSettings};
pub use error::{LensError, Result};
pub use mapping::MappingTables;
