//! # jar-index
//!
//! Indexes the Java classes inside JAR/WAR files, including archives nested
//! in other archives (e.g. `WEB-INF/lib` jars inside a WAR), and answers
//! "which archive contains class X".
//!
//! ## Architecture
//!
//! - **store**: Persistent archive/class index using LMDB (via heed)
//! - **indexer**: Recursive archive scanning with nested-archive staging
//! - **catalog**: Classification of zip entry names (class file, nested archive)
//! - **scan**: JAR/WAR discovery under a directory
//! - **search**: Interactive autocomplete shell over the index
//! - **progress**: Progress bar reporting for directory scans
//! - **config**, **cli**, **logging**: Command-line plumbing

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod progress;
pub mod scan;
pub mod search;
pub mod store;

pub use error::{IndexError, Result};
pub use indexer::{IndexSummary, Indexer, ScanLimits, ScanProgress};
pub use store::{ArchiveInfo, ArchiveRecord, IndexStore};
