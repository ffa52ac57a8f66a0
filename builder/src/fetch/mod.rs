//! Tool fetching: download, verify, and unpack each resolved tool.
//!
//! Network and archive handling sit behind the [`ToolDownloader`] and
//! [`ArchiveExtractor`] traits so the pipeline can be exercised without a
//! network.

mod download;
mod extraction;
mod fetcher;
mod retry;

pub use download::{DownloadError, HttpDownloader, ToolDownloader};
pub use extraction::{ArchiveExtractor, ExtractionError, ZipExtractor};
pub use fetcher::{CANCELLED_REASON, Fetcher, PARTIAL_SUFFIX, STAGING_SUFFIX, is_partial_name};
pub use retry::RetryPolicy;
