use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, oneshot};

use rundag::exec::JobFuture;

/// Something an executor built by an [`ExecutionProbe`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct ProbeInner {
    log: Mutex<Vec<ProbeEvent>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    changed: Notify,
}

/// Builds executors that record when they start and finish, and tracks how
/// many of them ran at the same time.
#[derive(Clone, Default)]
pub struct ExecutionProbe {
    inner: Arc<ProbeInner>,
}

/// Opens a gated executor built by [`ExecutionProbe::gated_task`].
pub struct Gate {
    tx: Option<oneshot::Sender<()>>,
}

impl Gate {
    pub fn open(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

impl ExecutionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor that sleeps for `delay` and succeeds.
    pub fn task(&self, id: &str, delay: Duration) -> impl FnOnce() -> JobFuture + Send + 'static {
        let probe = self.clone();
        let id = id.to_string();
        move || -> JobFuture {
            Box::pin(async move {
                probe.enter(&id);
                tokio::time::sleep(delay).await;
                probe.exit(&id);
                Ok(())
            })
        }
    }

    /// Executor that sleeps for `delay` and then fails with `message`.
    pub fn failing_task(
        &self,
        id: &str,
        delay: Duration,
        message: &str,
    ) -> impl FnOnce() -> JobFuture + Send + 'static {
        let probe = self.clone();
        let id = id.to_string();
        let message = message.to_string();
        move || -> JobFuture {
            Box::pin(async move {
                probe.enter(&id);
                tokio::time::sleep(delay).await;
                probe.exit(&id);
                Err(anyhow::anyhow!(message))
            })
        }
    }

    /// Executor that panics after recording its start.
    pub fn panicking_task(&self, id: &str) -> impl FnOnce() -> JobFuture + Send + 'static {
        let probe = self.clone();
        let id = id.to_string();
        move || -> JobFuture {
            Box::pin(async move {
                probe.enter(&id);
                probe.exit(&id);
                if !id.is_empty() {
                    panic!("boom in {id}");
                }
                Ok(())
            })
        }
    }

    /// Executor that runs until the returned [`Gate`] is opened (or dropped).
    pub fn gated_task(&self, id: &str) -> (impl FnOnce() -> JobFuture + Send + 'static, Gate) {
        let (tx, rx) = oneshot::channel::<()>();
        let probe = self.clone();
        let id = id.to_string();
        let executor = move || -> JobFuture {
            Box::pin(async move {
                probe.enter(&id);
                let _ = rx.await;
                probe.exit(&id);
                Ok(())
            })
        };
        (executor, Gate { tx: Some(tx) })
    }

    pub fn log(&self) -> Vec<ProbeEvent> {
        self.inner.log.lock().unwrap().clone()
    }

    /// Task ids in the order their executors started.
    pub fn started(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                ProbeEvent::Started(id) => Some(id),
                ProbeEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                ProbeEvent::Finished(id) => Some(id),
                ProbeEvent::Started(_) => None,
            })
            .collect()
    }

    pub fn has_started(&self, id: &str) -> bool {
        self.log()
            .iter()
            .any(|e| matches!(e, ProbeEvent::Started(s) if s == id))
    }

    /// Whether `first` finished before `then` started. `false` if either
    /// never happened.
    pub fn finished_before_started(&self, first: &str, then: &str) -> bool {
        let log = self.log();
        let finished = log
            .iter()
            .position(|e| matches!(e, ProbeEvent::Finished(s) if s == first));
        let started = log
            .iter()
            .position(|e| matches!(e, ProbeEvent::Started(s) if s == then));
        matches!((finished, started), (Some(f), Some(s)) if f < s)
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until the executor for `id` has started.
    pub async fn wait_started(&self, id: &str) {
        loop {
            let notified = self.inner.changed.notified();
            if self.has_started(id) {
                return;
            }
            notified.await;
        }
    }

    fn enter(&self, id: &str) {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.inner
            .log
            .lock()
            .unwrap()
            .push(ProbeEvent::Started(id.to_string()));
        self.inner.changed.notify_waiters();
    }

    fn exit(&self, id: &str) {
        self.inner
            .log
            .lock()
            .unwrap()
            .push(ProbeEvent::Finished(id.to_string()));
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.changed.notify_waiters();
    }
}
