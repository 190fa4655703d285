//! Line writer for records.
//!
//! Each record is encoded to one JSON line, written with a single
//! `write_all`, and flushed before the call returns, so a reader on the
//! other end of the pipe sees every record as soon as it is produced.
//! The writer owns its sink; dropping the writer closes it.

use std::io::{self, Write};

use nauvis_types::{Record, encode_line};

/// Errors that can occur while writing a record.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The record could not be serialized.
    #[error("failed to serialize record: {source}")]
    Serialize {
        /// The underlying serializer error.
        #[from]
        source: serde_json::Error,
    },

    /// The reader closed its end of the pipe.
    #[error("reader closed the pipe")]
    ReaderClosed,

    /// Any other I/O failure.
    #[error("failed to write record: {source}")]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl From<io::Error> for WriteError {
    fn from(source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::BrokenPipe {
            Self::ReaderClosed
        } else {
            Self::Io { source }
        }
    }
}

/// Writes records as newline-delimited JSON and flushes after each one.
#[derive(Debug)]
pub struct RecordWriter<W> {
    sink: W,
    written: u64,
}

impl<W> RecordWriter<W> {
    /// Wrap a sink.
    pub const fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    /// Number of records written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Borrow the sink.
    pub const fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> RecordWriter<W> {
    /// Encode, write, and flush one record.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::ReaderClosed`] on a broken pipe,
    /// [`WriteError::Serialize`] if the record cannot be encoded, and
    /// [`WriteError::Io`] for any other I/O failure.
    pub fn write(&mut self, record: &Record) -> Result<(), WriteError> {
        let line = encode_line(record)?;
        self.sink.write_all(line.as_bytes())?;
        self.sink.flush()?;
        self.written = self.written.saturating_add(1);
        Ok(())
    }
}
