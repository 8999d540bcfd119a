//! Store a folder of `<integer>.jpg` files as blobs in a single SQLite file
//! and page through them again in the terminal.

pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod viewer;

pub use config::Config;
pub use db::Database;
pub use ingest::Ingestor;
pub use viewer::Viewer;
