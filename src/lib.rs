//! # rustcnki
//!
//! CNKI literature search scraper with incremental CSV export
//!
//! ## Modules
//!
//! - [`cnki`] - Search session orchestration
//! - [`listing`] - Result-list extraction and pagination
//! - [`detail`] - Detail-page extraction
//! - [`writer`] - Incremental CSV writer
//! - [`browser`] - Browser abstraction and Chromium backend
//! - [`analysis`] / [`llm_report`] - Statistics and LLM-generated HTML report
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustcnki::browser::chromium::{ChromiumBrowser, LaunchOptions};
//! use rustcnki::cnki;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let browser = ChromiumBrowser::launch(&LaunchOptions::default()).await?;
//!     let summary = cnki::search(Box::new(browser), "AU='张三'", &Default::default(), None).await?;
//!     println!("Saved {} papers to {}", summary.written, summary.output.display());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod browser;
pub mod cnki;
pub mod detail;
pub mod error;
pub mod formula;
pub mod listing;
pub mod llm_report;
pub mod probe;
pub mod prompts;
pub mod record;
pub mod writer;

pub use error::{CnkiError, Result};
pub use record::PaperRecord;
