//! Purpose: Bridge a push-driven line source to a pull-based async record stream with a bounded buffer.
//! Exports: `RecordStream`, `StreamConfig`, `StreamOptions`, `SourceState`, `DEFAULT_CAPACITY`.
//! Role: Bounded Streaming Iterator; owns the reader thread, the buffer and the completion state.
//! Invariants: The buffer never holds more than `capacity` records; the source is paused when it is full.
//! Invariants: Records are yielded in file order; blank lines are skipped and never counted.
//! Invariants: End of stream is `Finished` with an empty buffer, and is idempotent once returned.
//! Invariants: The first error ends the stream after the records decoded before it are yielded.
//! Notes: Pause happens under the buffer lock together with the append, resume together with the empty check.

use crate::catalog;
use crate::core::decode::decode_line;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::Record;
use crate::core::schema::Schema;
use crate::core::source::{LineSource, SourceControl};
use std::collections::VecDeque;
use std::future::poll_fn;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::thread::JoinHandle;
use tokio_stream::Stream;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceState {
    Idle,
    Working,
    Finished,
}

#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Maximum number of decoded records held before the source is paused.
    pub capacity: usize,
    /// Treat the first non-blank line as a header: skip it and do not count it.
    pub skip_header: bool,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            skip_header: false,
        }
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub file_path: PathBuf,
    pub record_type: String,
    pub options: StreamOptions,
}

impl StreamConfig {
    pub fn new(file_path: impl Into<PathBuf>, record_type: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            record_type: record_type.into(),
            options: StreamOptions::default(),
        }
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }
}

struct Buffer {
    queue: VecDeque<Record>,
    capacity: usize,
    state: SourceState,
    failure: Option<Error>,
    waker: Option<Waker>,
    peak: usize,
}

struct Shared {
    buffer: Mutex<Buffer>,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(Buffer {
                queue: VecDeque::with_capacity(capacity),
                capacity,
                state: SourceState::Working,
                failure: None,
                waker: None,
                peak: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: Record, control: &SourceControl) {
        let waker = {
            let mut buffer = self.lock();
            buffer.queue.push_back(record);
            buffer.peak = buffer.peak.max(buffer.queue.len());
            if buffer.queue.len() >= buffer.capacity {
                control.pause();
            }
            buffer.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn finish(&self, failure: Option<Error>) {
        let waker = {
            let mut buffer = self.lock();
            buffer.state = SourceState::Finished;
            if failure.is_some() {
                buffer.failure = failure;
            }
            buffer.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

pub struct RecordStream {
    shared: Arc<Shared>,
    control: SourceControl,
    schema: Schema,
    path: PathBuf,
    yielded: u64,
    terminated: bool,
    worker: Option<JoinHandle<()>>,
}

impl RecordStream {
    /// Opens a stream for one of the catalog record types.
    ///
    /// The record type is resolved before the file is touched.
    pub fn open(config: StreamConfig) -> Result<Self, Error> {
        let schema = catalog::schema_for(&config.record_type)?;
        Self::with_schema(&config.file_path, schema, config.options)
    }

    pub fn with_schema(
        file_path: impl AsRef<Path>,
        schema: Schema,
        options: StreamOptions,
    ) -> Result<Self, Error> {
        if options.capacity == 0 {
            return Err(Error::new(ErrorKind::Config)
                .with_message("buffer capacity must be at least 1")
                .with_hint("Use the default capacity of 100 unless memory is tight."));
        }

        let control = SourceControl::new();
        let source = LineSource::open(file_path, control.clone())?;
        let path = source.path().to_path_buf();
        let shared = Arc::new(Shared::new(options.capacity));

        let worker = std::thread::Builder::new()
            .name("tsvstream-reader".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                let schema = schema.clone();
                let skip_header = options.skip_header;
                move || produce(source, &schema, &shared, skip_header)
            })
            .map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to start reader thread")
                    .with_source(err)
            })?;

        debug!(
            path = %path.display(),
            schema = schema.name(),
            capacity = options.capacity,
            "record stream opened"
        );
        Ok(Self {
            shared,
            control,
            schema,
            path,
            yielded: 0,
            terminated: false,
            worker: Some(worker),
        })
    }

    /// Waits for the next record; `Ok(None)` marks the end of the stream.
    pub async fn next_record(&mut self) -> Result<Option<Record>, Error> {
        poll_fn(|cx| self.poll_record(cx)).await
    }

    /// Number of records handed to the consumer so far.
    pub fn count(&self) -> u64 {
        self.yielded
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.shared.lock().capacity
    }

    /// Records decoded and waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Highest buffer occupancy observed since the stream opened.
    pub fn peak_buffered(&self) -> usize {
        self.shared.lock().peak
    }

    pub fn source_state(&self) -> SourceState {
        self.shared.lock().state
    }

    pub fn is_source_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_finished(&self) -> bool {
        self.terminated
    }

    fn poll_record(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<Record>, Error>> {
        if self.terminated {
            return Poll::Ready(Ok(None));
        }

        let mut buffer = self.shared.lock();
        if let Some(record) = buffer.queue.pop_front() {
            drop(buffer);
            self.yielded += 1;
            return Poll::Ready(Ok(Some(record)));
        }
        if let Some(err) = buffer.failure.take() {
            drop(buffer);
            self.terminated = true;
            debug!(path = %self.path.display(), yielded = self.yielded, "record stream failed");
            return Poll::Ready(Err(err));
        }
        if buffer.state == SourceState::Finished {
            drop(buffer);
            self.terminated = true;
            debug!(path = %self.path.display(), yielded = self.yielded, "record stream drained");
            return Poll::Ready(Ok(None));
        }

        self.control.resume();
        let stale = buffer
            .waker
            .as_ref()
            .is_none_or(|waker| !waker.will_wake(cx.waker()));
        if stale {
            buffer.waker = Some(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl Stream for RecordStream {
    type Item = Result<Record, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_record(cx).map(Result::transpose)
    }
}

impl Drop for RecordStream {
    fn drop(&mut self) {
        self.control.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn produce(source: LineSource, schema: &Schema, shared: &Shared, skip_header: bool) {
    let control = source.control().clone();
    let path = source.path().to_path_buf();
    let mut header_pending = skip_header;

    let result = source.run(
        |line| {
            if line.text.is_empty() {
                return Ok(());
            }
            if header_pending {
                header_pending = false;
                return Ok(());
            }
            let record = decode_line(schema, line.text)
                .map_err(|err| err.with_line(line.number).with_path(&path))?;
            shared.push(record, &control);
            Ok(())
        },
        || shared.finish(None),
    );

    if let Err(err) = result {
        shared.finish(Some(err));
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordStream, SourceState, StreamConfig, StreamOptions};
    use crate::core::error::ErrorKind;
    use crate::core::schema::Schema;
    use crate::core::value::{Converter, Value};
    use std::io::Write;
    use std::time::{Duration, Instant};
    use tempfile::NamedTempFile;
    use tokio_stream::StreamExt;

    fn fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file.flush().expect("flush");
        file
    }

    fn scores() -> Schema {
        Schema::builder("scores")
            .column("id", Converter::Text)
            .column("score", Converter::Real)
            .build()
            .expect("schema")
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|i| format!("id{i}\t{i}.5\n")).collect()
    }

    #[tokio::test]
    async fn skips_blank_lines_and_counts_yielded_records() {
        let file = fixture("tt001\t7.5\n\ntt002\t9.0\n");
        let mut stream =
            RecordStream::with_schema(file.path(), scores(), StreamOptions::default()).expect("open");

        let first = stream.next_record().await.expect("next").expect("record");
        assert_eq!(first.get("id"), Some(&Value::Text("tt001".to_string())));
        assert_eq!(first.get("score"), Some(&Value::Real(7.5)));
        assert_eq!(stream.count(), 1);

        let second = stream.next_record().await.expect("next").expect("record");
        assert_eq!(second.get("id"), Some(&Value::Text("tt002".to_string())));
        assert_eq!(second.get("score"), Some(&Value::Real(9.0)));

        assert!(stream.next_record().await.expect("end").is_none());
        assert_eq!(stream.count(), 2);
        assert_eq!(stream.source_state(), SourceState::Finished);
    }

    #[tokio::test]
    async fn end_of_stream_is_idempotent() {
        let file = fixture("tt001\t1.0\n");
        let mut stream =
            RecordStream::with_schema(file.path(), scores(), StreamOptions::default()).expect("open");
        assert!(stream.next_record().await.expect("next").is_some());
        for _ in 0..5 {
            assert!(stream.next_record().await.expect("end").is_none());
        }
        assert!(stream.is_finished());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn decode_error_surfaces_after_earlier_records() {
        let file = fixture("tt001\t1.0\ntt003\tNaN-ish\ntt004\t2.0\n");
        let mut stream =
            RecordStream::with_schema(file.path(), scores(), StreamOptions::default()).expect("open");

        assert!(stream.next_record().await.expect("first").is_some());
        let err = stream.next_record().await.expect_err("decode failure");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert_eq!(err.column(), Some("score"));
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.path(), Some(file.path()));

        assert!(stream.next_record().await.expect("terminated").is_none());
        assert_eq!(stream.count(), 1);
    }

    #[tokio::test]
    async fn preserves_file_order_through_small_buffer() {
        let file = fixture(&numbered_lines(500));
        let options = StreamOptions {
            capacity: 3,
            skip_header: false,
        };
        let mut stream = RecordStream::with_schema(file.path(), scores(), options).expect("open");

        let mut expected = 1;
        while let Some(record) = stream.next_record().await.expect("next") {
            assert_eq!(
                record.get("id").and_then(Value::as_str),
                Some(format!("id{expected}").as_str())
            );
            expected += 1;
        }
        assert_eq!(stream.count(), 500);
        assert!(stream.peak_buffered() <= 3);
    }

    #[tokio::test]
    async fn full_buffer_pauses_the_source() {
        let file = fixture(&numbered_lines(50));
        let options = StreamOptions {
            capacity: 4,
            skip_header: false,
        };
        let mut stream = RecordStream::with_schema(file.path(), scores(), options).expect("open");

        let deadline = Instant::now() + Duration::from_secs(5);
        while stream.buffered() < 4 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(stream.buffered(), 4);
        assert!(stream.is_source_paused());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stream.buffered(), 4);
        assert_eq!(stream.source_state(), SourceState::Working);

        while stream.next_record().await.expect("next").is_some() {}
        assert_eq!(stream.count(), 50);
        assert_eq!(stream.peak_buffered(), 4);
    }

    #[tokio::test]
    async fn header_is_skipped_when_requested() {
        let file = fixture("id\tscore\ntt001\t1.0\n");
        let options = StreamOptions {
            skip_header: true,
            ..StreamOptions::default()
        };
        let mut stream = RecordStream::with_schema(file.path(), scores(), options).expect("open");
        let records: Vec<_> = (&mut stream).collect::<Vec<_>>().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
        assert_eq!(stream.count(), 1);
    }

    #[tokio::test]
    async fn header_is_decoded_when_not_skipped() {
        let file = fixture("id\tscore\ntt001\t1.0\n");
        let mut stream =
            RecordStream::with_schema(file.path(), scores(), StreamOptions::default()).expect("open");
        let err = stream.next_record().await.expect_err("header is not a record");
        assert_eq!(err.column(), Some("score"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let file = fixture("tt001\t1.0\n");
        let options = StreamOptions {
            capacity: 0,
            skip_header: false,
        };
        let err = RecordStream::with_schema(file.path(), scores(), options)
            .err()
            .expect("config error");
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn unknown_record_type_fails_before_io() {
        let config = StreamConfig::new("/definitely/not/here.tsv", "title.unknown");
        let err = RecordStream::open(config).err().expect("config error");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.path().is_none());
    }

    #[test]
    fn missing_file_fails_synchronously() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StreamConfig::new(dir.path().join("s"), "title.ratings");
        let err = RecordStream::open(config).err().expect("config error");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().expect("message").starts_with("file path was invalid"));
    }

    #[tokio::test]
    async fn dropping_a_paused_stream_releases_the_reader() {
        let file = fixture(&numbered_lines(100));
        let options = StreamOptions {
            capacity: 2,
            skip_header: false,
        };
        let mut stream = RecordStream::with_schema(file.path(), scores(), options).expect("open");
        assert!(stream.next_record().await.expect("next").is_some());
        drop(stream);
    }
}
