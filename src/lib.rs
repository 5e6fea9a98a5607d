pub mod bench;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod fvecs;
pub mod import;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use dataset::Dataset;
