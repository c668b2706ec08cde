//! Purpose: Lazy bulk projections of a `RowAdapter` driven by one producer thread each.
//! Exports: `RowStream` plus the `rows`, `maps`, `array_records`, `object_records` projections.
//! Role: Moves the adapter into a producer thread and hands items over a rendezvous channel.
//! Invariants: The producer holds at most one item ahead of the consumer.
//! Invariants: Recoverable failures end the stream and stay on the adapter; they are never items.
//! Invariants: Closing or dropping a stream always lets the producer exit.
use std::iter::FusedIterator;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::core::adapter::{RowAdapter, row_to_map};
use crate::core::cursor::RowCursor;
use crate::core::encode::Encoder;
use crate::core::error::Error;
use crate::core::normalize::{normalize_map, normalize_row};
use crate::core::value::{RowMap, Value};

enum Producer<C> {
    Running(JoinHandle<RowAdapter<C>>),
    Settled(RowAdapter<C>),
    Released,
}

/// Single-pass iterator over one projection of a `RowAdapter`.
///
/// The adapter lives on the producer thread while the stream runs. Once the
/// iterator returns `None`, [`RowStream::error`] tells a clean end from a
/// failure; [`RowStream::close`] stops production early and hands the adapter
/// back either way. Dropping an unfinished stream cancels its producer.
pub struct RowStream<C, T> {
    items: Option<Receiver<T>>,
    cancel: Arc<AtomicBool>,
    producer: Producer<C>,
}

impl<C, T> RowStream<C, T> {
    fn settled(adapter: RowAdapter<C>) -> Self {
        Self {
            items: None,
            cancel: Arc::new(AtomicBool::new(true)),
            producer: Producer::Settled(adapter),
        }
    }

    /// Sticky error of the adapter, available once the stream has ended.
    pub fn error(&self) -> Option<&Error> {
        match &self.producer {
            Producer::Settled(adapter) => adapter.error(),
            Producer::Running(_) | Producer::Released => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.producer, Producer::Settled(_))
    }

    /// Stops production and returns the adapter with its sticky error.
    pub fn close(mut self) -> RowAdapter<C> {
        self.cancel.store(true, Ordering::Release);
        self.settle();
        match mem::replace(&mut self.producer, Producer::Released) {
            Producer::Settled(adapter) => adapter,
            Producer::Running(_) | Producer::Released => {
                unreachable!("row producer is settled before release")
            }
        }
    }

    fn settle(&mut self) {
        // Dropping the receiver fails any send the producer is blocked on.
        self.items = None;
        if !matches!(self.producer, Producer::Running(_)) {
            return;
        }
        if let Producer::Running(handle) = mem::replace(&mut self.producer, Producer::Released) {
            match handle.join() {
                Ok(adapter) => self.producer = Producer::Settled(adapter),
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
    }
}

impl<C, T> Iterator for RowStream<C, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let items = self.items.as_ref()?;
        match items.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                self.settle();
                None
            }
        }
    }
}

impl<C, T> FusedIterator for RowStream<C, T> {}

impl<C, T> Drop for RowStream<C, T> {
    fn drop(&mut self) {
        if matches!(self.producer, Producer::Running(_)) {
            debug!("row stream dropped before exhaustion; cancelling producer");
        }
        self.cancel.store(true, Ordering::Release);
        self.items = None;
    }
}

struct Emitter<T> {
    items: SyncSender<T>,
    cancel: Arc<AtomicBool>,
}

impl<T> Emitter<T> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn emit(&self, item: T) -> bool {
        !self.cancelled() && self.items.send(item).is_ok()
    }
}

fn spawn<C, T, F>(adapter: RowAdapter<C>, produce: F) -> RowStream<C, T>
where
    C: RowCursor + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut RowAdapter<C>, &Emitter<T>) + Send + 'static,
{
    if adapter.is_done() {
        return RowStream::settled(adapter);
    }

    let (tx, rx) = mpsc::sync_channel(0);
    let cancel = Arc::new(AtomicBool::new(false));
    let emitter = Emitter {
        items: tx,
        cancel: cancel.clone(),
    };
    let handle = thread::spawn(move || {
        let mut adapter = adapter;
        trace!("row producer started");
        produce(&mut adapter, &emitter);
        debug!(
            rows = adapter.rows_fetched(),
            failed = adapter.error().is_some(),
            "row producer finished"
        );
        adapter
    });

    RowStream {
        items: Some(rx),
        cancel,
        producer: Producer::Running(handle),
    }
}

fn produce<C, T, S>(adapter: &mut RowAdapter<C>, emitter: &Emitter<T>, header: bool, mut shape: S)
where
    C: RowCursor,
    S: FnMut(&[String], Vec<Value>) -> Result<T, Error>,
{
    let columns = adapter.columns();
    if header {
        match shape(&columns, adapter.header()) {
            Ok(item) => {
                if !emitter.emit(item) {
                    debug!("row stream cancelled before header was consumed");
                    return;
                }
            }
            Err(err) => {
                adapter.fail(err);
                return;
            }
        }
    }

    loop {
        if emitter.cancelled() {
            debug!(rows = adapter.rows_fetched(), "row stream cancelled");
            return;
        }
        let Some(row) = adapter.fetch_row() else {
            return;
        };
        let item = match shape(&columns, row) {
            Ok(item) => item,
            Err(err) => {
                adapter.fail(err);
                return;
            }
        };
        if !emitter.emit(item) {
            debug!(rows = adapter.rows_fetched(), "row stream cancelled");
            return;
        }
    }
}

impl<C: RowCursor + Send + 'static> RowAdapter<C> {
    /// Rows as value sequences, optionally preceded by the column names.
    pub fn rows(self, header: bool) -> RowStream<C, Vec<Value>> {
        spawn(self, move |adapter, emitter| {
            produce(adapter, emitter, header, |_, row| Ok(row))
        })
    }

    /// Rows keyed by column name.
    pub fn maps(self) -> RowStream<C, RowMap> {
        spawn(self, |adapter, emitter| {
            produce(adapter, emitter, false, |columns, row| {
                Ok(row_to_map(columns, row))
            })
        })
    }

    /// One encoded array record per row, optionally preceded by a header record.
    pub fn array_records<E>(self, header: bool, encoder: E) -> RowStream<C, String>
    where
        E: Encoder + Send + 'static,
    {
        spawn(self, move |adapter, emitter| {
            produce(adapter, emitter, header, |_, row| {
                encoder.encode(&normalize_row(row))
            })
        })
    }

    /// One encoded object record per row.
    pub fn object_records<E>(self, encoder: E) -> RowStream<C, String>
    where
        E: Encoder + Send + 'static,
    {
        spawn(self, move |adapter, emitter| {
            produce(adapter, emitter, false, |columns, row| {
                encoder.encode(&normalize_map(row_to_map(columns, row)))
            })
        })
    }
}
