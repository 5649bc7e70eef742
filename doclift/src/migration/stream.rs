use crate::errors::{DocliftError, DocliftResult};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type Producer<T> = Box<dyn FnOnce(&mut dyn FnMut(T)) -> DocliftResult<()> + Send>;

/// Cold, single-subscriber push stream of migration notifications.
///
/// # Purpose
/// Carries either aggregate [crate::migration::MigrationState] emissions (from
/// the orchestrator) or per-document [crate::migration::DocumentAction]
/// emissions (from a generation migrator) to exactly one consumer.
///
/// # Semantics
/// - **Cold start**: the producer runs only once a consumer attaches via
///   [ProgressStream::subscribe] or one of the driving helpers; no document is
///   touched before that.
/// - **Single subscriber**: attaching consumes the stream.
/// - **Terminal signals**: after the value notifications, exactly one of
///   `on_error` / `on_complete` fires, and no value is delivered afterwards.
///
/// The producer runs on the consumer's thread; all emissions are therefore
/// serialized through a single consumer regardless of how concurrently the
/// underlying batch work executes.
pub struct ProgressStream<T> {
    producer: Producer<T>,
}

impl<T> ProgressStream<T> {
    /// Creates a stream around a producer closure. The closure receives the
    /// value sink and returns the terminal outcome.
    pub(crate) fn new<F>(producer: F) -> Self
    where
        F: FnOnce(&mut dyn FnMut(T)) -> DocliftResult<()> + Send + 'static,
    {
        ProgressStream {
            producer: Box::new(producer),
        }
    }

    /// Drives the stream, invoking `on_value` for every emission.
    ///
    /// Returns the terminal outcome: `Ok(())` for completion, the producer's
    /// error otherwise.
    pub fn for_each<F: FnMut(T)>(self, mut on_value: F) -> DocliftResult<()> {
        (self.producer)(&mut on_value)
    }

    /// Drives the stream to completion, collecting every emission.
    pub fn drain(self) -> DocliftResult<Vec<T>> {
        let mut values = Vec::new();
        self.for_each(|value| values.push(value))?;
        Ok(values)
    }

    /// Drives the stream to completion, discarding emissions.
    pub fn wait(self) -> DocliftResult<()> {
        self.for_each(|_| {})
    }

    /// Drives the stream to completion, returning the last emission.
    pub fn last(self) -> DocliftResult<Option<T>> {
        let mut last = None;
        self.for_each(|value| last = Some(value))?;
        Ok(last)
    }

    /// Attaches the listener and drives the stream on the calling thread.
    ///
    /// Every emission is delivered through `on_value`; afterwards exactly one
    /// of `on_error` / `on_complete` fires.
    pub fn subscribe(self, listener: MigrationListener<T>) {
        let outcome = (self.producer)(&mut |value| listener.notify_value(value));
        match outcome {
            Ok(()) => listener.notify_complete(),
            Err(e) => listener.notify_error(e),
        }
    }
}

impl<T> Debug for ProgressStream<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream").finish()
    }
}

/// Closure-based listener for a [ProgressStream].
///
/// Wraps an `on_value` callback plus optional terminal callbacks, mirroring
/// the three signals of the stream. Unset terminal callbacks are no-ops.
#[derive(Clone)]
pub struct MigrationListener<T> {
    on_value: Arc<dyn Fn(T) + Send + Sync>,
    on_error: Arc<dyn Fn(DocliftError) + Send + Sync>,
    on_complete: Arc<dyn Fn() + Send + Sync>,
}

impl<T> MigrationListener<T> {
    /// Creates a listener with the given value callback and no-op terminal
    /// callbacks.
    pub fn new(on_value: impl Fn(T) + Send + Sync + 'static) -> Self {
        MigrationListener {
            on_value: Arc::new(on_value),
            on_error: Arc::new(|_| {}),
            on_complete: Arc::new(|| {}),
        }
    }

    /// Sets the error callback.
    pub fn on_error(mut self, on_error: impl Fn(DocliftError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(on_error);
        self
    }

    /// Sets the completion callback.
    pub fn on_complete(mut self, on_complete: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Arc::new(on_complete);
        self
    }

    fn notify_value(&self, value: T) {
        (self.on_value)(value);
    }

    fn notify_error(&self, error: DocliftError) {
        (self.on_error)(error);
    }

    fn notify_complete(&self) {
        (self.on_complete)();
    }
}

impl<T> Debug for MigrationListener<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationListener").finish()
    }
}
