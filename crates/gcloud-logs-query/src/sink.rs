use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Where formatted lines go: standard output or a UTF-8 file.
///
/// Buffered either way. Dropping the sink flushes it on a best-effort basis;
/// call `flush` to observe write errors.
#[derive(Debug)]
pub enum OutputSink {
    Stdout(BufWriter<Stdout>),
    File(BufWriter<File>),
}

impl OutputSink {
    /// Open `path` (created or truncated), or standard output when None
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::stdout()),
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("Failed to open output file {}", path.display())
                })?;
                Ok(Self::File(BufWriter::new(file)))
            }
        }
    }

    pub fn stdout() -> Self {
        Self::Stdout(BufWriter::new(io::stdout()))
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(w) => w.write(buf),
            Self::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
