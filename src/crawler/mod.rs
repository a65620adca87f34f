pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod runner;
pub mod service;
