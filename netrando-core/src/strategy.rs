//! Strategies describe how to walk a region of the image.
//!
//! They compose: a pointer list dispatches to an array, which dispatches to
//! a record strategy, which decodes, hands the record to a visitor and
//! re-encodes it in place.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::records::{Record, RecordCodec};
use crate::stream::ByteStream;
use crate::{RandomiserError, Result};

pub trait StreamStrategy {
    /// Process the image at the stream's current position.
    fn execute(&mut self, stream: &mut ByteStream<'_>) -> Result<()>;
}

impl<F> StreamStrategy for F
where
    F: FnMut(&mut ByteStream<'_>) -> Result<()>,
{
    fn execute(&mut self, stream: &mut ByteStream<'_>) -> Result<()> {
        self(stream)
    }
}

/// What a pointer list does when its inner strategy fails on an entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalMode {
    /// Abort the scan and return the error.
    #[default]
    FailFast,
    /// Record the error and continue with the next entry.
    BestEffort,
}

/// Walks a table of `length` little-endian `i32` offsets and runs the inner
/// strategy at each target.
///
/// Null entries are skipped unless `ignore_null` is off, and an offset that
/// already appeared earlier in the table is skipped unless `repeat` is on.
/// Targets are `base_pointer + offset`. After `execute` the stream sits
/// right past the table, whatever the inner strategy did.
pub struct PointerListStrategy<S> {
    strategy: S,
    length: usize,
    base_pointer: i64,
    repeat: bool,
    ignore_null: bool,
    mode: TraversalMode,
    failures: Vec<(i32, RandomiserError)>,
}

impl<S: StreamStrategy> PointerListStrategy<S> {
    pub fn new(strategy: S, length: usize) -> Self {
        Self {
            strategy,
            length,
            base_pointer: 0,
            repeat: false,
            ignore_null: true,
            mode: TraversalMode::FailFast,
            failures: Vec::new(),
        }
    }

    pub fn with_base_pointer(mut self, base_pointer: i64) -> Self {
        self.base_pointer = base_pointer;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_ignore_null(mut self, ignore_null: bool) -> Self {
        self.ignore_null = ignore_null;
        self
    }

    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Errors collected in best-effort mode, keyed by table entry.
    pub fn take_failures(&mut self) -> Vec<(i32, RandomiserError)> {
        std::mem::take(&mut self.failures)
    }
}

impl<S: StreamStrategy> StreamStrategy for PointerListStrategy<S> {
    fn execute(&mut self, stream: &mut ByteStream<'_>) -> Result<()> {
        let mut processed: HashSet<i32> = HashSet::new();

        for i in 0..self.length {
            let next = stream.read_i32()?;
            if (next == 0 && self.ignore_null) || (!self.repeat && processed.contains(&next)) {
                debug!(entry = i, offset = next, "skipping pointer");
                continue;
            }

            let target = self.base_pointer + i64::from(next);
            let strategy = &mut self.strategy;
            let result = stream.with_saved_position(|s| {
                s.seek(target)?;
                strategy.execute(s)
            });
            processed.insert(next);

            if let Err(err) = result {
                match self.mode {
                    TraversalMode::FailFast => return Err(err),
                    TraversalMode::BestEffort => {
                        warn!(entry = i, offset = next, "pointer target failed: {err}");
                        self.failures.push((next, err));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Runs the inner strategy `count` times back to back.
pub struct ArrayStrategy<S> {
    strategy: S,
    count: usize,
}

impl<S: StreamStrategy> ArrayStrategy<S> {
    pub fn new(strategy: S, count: usize) -> Self {
        Self { strategy, count }
    }
}

impl<S: StreamStrategy> StreamStrategy for ArrayStrategy<S> {
    fn execute(&mut self, stream: &mut ByteStream<'_>) -> Result<()> {
        for _ in 0..self.count {
            self.strategy.execute(stream)?;
        }
        Ok(())
    }
}

/// Decodes one record, passes it to `visitor`, and writes it back over the
/// bytes it came from.
pub struct RecordStrategy<F> {
    codec: RecordCodec,
    visitor: F,
}

impl<F> RecordStrategy<F>
where
    F: FnMut(&mut Record) -> Result<()>,
{
    pub fn new(codec: RecordCodec, visitor: F) -> Self {
        Self { codec, visitor }
    }
}

impl<F> StreamStrategy for RecordStrategy<F>
where
    F: FnMut(&mut Record) -> Result<()>,
{
    fn execute(&mut self, stream: &mut ByteStream<'_>) -> Result<()> {
        let mut record = self.codec.decode(stream)?;
        (self.visitor)(&mut record)?;

        let span = record.span();
        stream.set_position(span.offset)?;
        self.codec.encode(stream, &record)?;
        debug_assert_eq!(stream.position(), span.end());
        Ok(())
    }
}
