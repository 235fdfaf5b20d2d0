use anyhow::Result;
use async_trait::async_trait;

use gcloud_logs_types::LogPage;

/// Anything that can answer a Cloud Logging filter query
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch one page of at most `page_size` entries matching `filter`.
    ///
    /// Pass `None` for the first page and the previous page's
    /// `next_page_token` after that. Entries come in the backend's order.
    async fn list_page(
        &self,
        filter: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<LogPage>;
}
