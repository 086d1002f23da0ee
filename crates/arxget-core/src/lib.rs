pub mod config;
pub mod logging;

pub mod artifact;
pub mod downloader;
pub mod error;
pub mod feed;
pub mod http;
pub mod storage;
pub mod walker;
