//! Fire-and-forget remote writes on a dedicated thread.
//!
//! Local state is already updated when an op is submitted; a failed remote
//! write is logged and never rolls anything back.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use crate::domain::schema::{COL_NAME, PRICE_TABLE};
use crate::usecase::ports::store::{Filter, StoreError, TableStore};
use crate::usecase::services::ledger::RemoteOp;
use crate::usecase::services::remote_rows::{cleared_pending_patch, pending_row, product_row};

pub trait RemoteDispatch: Send + Sync {
    fn submit(&self, op: RemoteOp);
}

/// Carries one op out against the price table.
pub fn apply_op(store: &dyn TableStore, op: &RemoteOp) -> Result<(), StoreError> {
    match op {
        RemoteOp::UpsertPending { name, pending } => {
            store.upsert(PRICE_TABLE, COL_NAME, &pending_row(name, pending))
        }
        RemoteOp::ClearPending { name } => store
            .update(PRICE_TABLE, &[Filter::eq(COL_NAME, name.as_str())], &cleared_pending_patch())
            .map(|_| ()),
        // A row left behind by a local-only clear is overwritten, not duplicated.
        RemoteOp::Insert { product, pending } => store.upsert(
            PRICE_TABLE,
            COL_NAME,
            &product_row(product, pending.as_ref()),
        ),
        RemoteOp::Delete { name } => store
            .delete(PRICE_TABLE, &[Filter::eq(COL_NAME, name.as_str())])
            .map(|_| ()),
    }
}

enum SyncMessage {
    Op(RemoteOp),
    /// Replies once every op queued before it has been applied.
    Flush(Sender<()>),
    Shutdown,
}

pub struct RemoteSync {
    tx: Mutex<Sender<SyncMessage>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteSync {
    pub fn spawn(store: Arc<dyn TableStore>) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || sync_loop(rx, store.as_ref()));
        Self {
            tx: Mutex::new(tx),
            handle: Mutex::new(Some(handle)),
        }
    }

    fn send(&self, message: SyncMessage) -> bool {
        match self.tx.lock() {
            Ok(tx) => tx.send(message).is_ok(),
            Err(_) => false,
        }
    }

    /// Blocks until queued writes have been attempted.
    pub fn flush(&self) {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.send(SyncMessage::Flush(reply_tx)) {
            let _ = reply_rx.recv();
        }
    }

    pub fn shutdown(&self) {
        self.send(SyncMessage::Shutdown);
        let handle = match self.handle.lock() {
            Ok(mut handle) => handle.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("remote sync thread panicked");
            }
        }
    }
}

impl RemoteDispatch for RemoteSync {
    fn submit(&self, op: RemoteOp) {
        if !self.send(SyncMessage::Op(op)) {
            error!("remote sync thread is gone; write dropped");
        }
    }
}

impl Drop for RemoteSync {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sync_loop(rx: Receiver<SyncMessage>, store: &dyn TableStore) {
    info!("remote sync started");
    while let Ok(message) = rx.recv() {
        match message {
            SyncMessage::Op(op) => match apply_op(store, &op) {
                Ok(()) => debug!(product = op.product_name(), "remote write applied"),
                Err(err) => error!(product = op.product_name(), %err, "remote write failed"),
            },
            SyncMessage::Flush(reply) => {
                let _ = reply.send(());
            }
            SyncMessage::Shutdown => break,
        }
    }
    info!("remote sync stopped");
}

/// Keeps submitted ops in memory instead of sending them anywhere.
#[derive(Default)]
pub struct RecordingDispatch {
    ops: Mutex<Vec<RemoteOp>>,
}

impl RecordingDispatch {
    pub fn take(&self) -> Vec<RemoteOp> {
        match self.ops.lock() {
            Ok(mut ops) => std::mem::take(&mut *ops),
            Err(_) => Vec::new(),
        }
    }
}

impl RemoteDispatch for RecordingDispatch {
    fn submit(&self, op: RemoteOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }
}
