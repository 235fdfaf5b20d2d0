use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local};
use tokio_util::sync::CancellationToken;

use gcloud_logs_client::LogSource;
use gcloud_logs_types::TimeWindow;

use crate::filter::LogQuery;
use crate::format::Formatter;

/// How many log entries to retrieve per request
pub const PAGE_SIZE: u32 = 100;

/// When tailing, time to wait between successive polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lower bound of the next tail window.
///
/// Only moves forward after a window that produced entries. An empty window is
/// queried again (widened up to the new "now") so entries that show up late in
/// the backend with timestamps inside it are still picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Watermark {
    low: DateTime<FixedOffset>,
}

impl Watermark {
    pub fn new(low: DateTime<FixedOffset>) -> Self {
        Self { low }
    }

    pub fn low(&self) -> DateTime<FixedOffset> {
        self.low
    }

    /// The window to query when "now" is `high`
    pub fn window(&self, high: DateTime<FixedOffset>) -> TimeWindow {
        TimeWindow::new(self.low, Some(high))
    }

    /// Record that the window ending at `high` produced `emitted` entries
    pub fn advance(&mut self, high: DateTime<FixedOffset>, emitted: usize) {
        if emitted > 0 {
            self.low = high;
        }
    }
}

/// Tail loop settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TailOptions {
    pub poll_interval: Duration,
}

/// Queries a log source and writes formatted entries to an output
pub struct LogPrinter<'a, S: ?Sized, W> {
    source: &'a S,
    query: LogQuery,
    formatter: Formatter,
    page_size: u32,
    out: W,
}

impl<'a, S, W> LogPrinter<'a, S, W>
where
    S: LogSource + ?Sized,
    W: Write,
{
    pub fn new(source: &'a S, query: LogQuery, formatter: Formatter, out: W) -> Self {
        Self {
            source,
            query,
            formatter,
            page_size: PAGE_SIZE,
            out,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch every entry in `window` and write one line per entry, in the
    /// order the backend returned them. Returns the number of entries written.
    ///
    /// Each page is written and flushed before the next one is requested, so
    /// a failing page leaves everything before it in the output.
    pub async fn print_logs(&mut self, window: &TimeWindow) -> Result<usize> {
        let filter = self.query.filter(window);
        tracing::debug!(%filter, "querying entries");

        let mut written = 0;
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .source
                .list_page(&filter, self.page_size, page_token.as_deref())
                .await?;

            for record in &page.records {
                writeln!(self.out, "{}", self.formatter.format(record))?;
            }
            self.out.flush()?;
            written += page.records.len();

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = written, "entries written");
        Ok(written)
    }

    /// Poll for new entries starting at `from` until `cancel` fires
    pub async fn tail(
        &mut self,
        from: DateTime<FixedOffset>,
        options: TailOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.tail_with_clock(from, options, cancel, || Local::now().fixed_offset())
            .await
    }

    /// Same as `tail`, reading "now" from `clock`.
    ///
    /// Cancellation is observed between polls only; a query in flight runs to
    /// completion and its entries are written.
    pub async fn tail_with_clock<C>(
        &mut self,
        from: DateTime<FixedOffset>,
        options: TailOptions,
        cancel: &CancellationToken,
        mut clock: C,
    ) -> Result<()>
    where
        C: FnMut() -> DateTime<FixedOffset>,
    {
        let mut watermark = Watermark::new(from);
        tracing::info!(from = %watermark.low(), "tailing");

        while !cancel.is_cancelled() {
            let high = clock();
            let emitted = self.print_logs(&watermark.window(high)).await?;
            watermark.advance(high, emitted);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(options.poll_interval) => {}
            }
        }

        tracing::info!(low = %watermark.low(), "tail stopped");
        Ok(())
    }

    /// Give back the output, e.g. to flush it one last time
    pub fn into_inner(self) -> W {
        self.out
    }
}
