pub mod batch;
pub mod downloader;
pub mod jre_manager;
pub mod session;
pub mod traits;
