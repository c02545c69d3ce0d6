//! Off-UI-thread icon loading.
//!
//! One worker takes window ids from a pending queue, runs the load function
//! and parks the result in a done queue. The owner is told through the
//! `notify` callback (a posted window message in the app) and then calls
//! [`IconQueue::drain`]. Jobs are never cancelled once queued.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::core::WindowId;

struct State<T> {
    pending: VecDeque<WindowId>,
    done: VecDeque<(WindowId, T)>,
    shutdown: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    wake: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // a panicking load must not wedge the UI thread
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

pub struct IconQueue<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> IconQueue<T> {
    /// Starts the worker. `load` returns `None` when the window is gone or
    /// yields nothing worth delivering.
    pub fn spawn<F, N>(mut load: F, notify: N) -> std::io::Result<Self>
    where
        F: FnMut(WindowId) -> Option<T> + Send + 'static,
        N: Fn() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: VecDeque::new(),
                done: VecDeque::new(),
                shutdown: false,
            }),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("icon-loader".into())
            .spawn(move || {
                loop {
                    let id = {
                        let mut st = worker_shared.lock();
                        loop {
                            if st.shutdown {
                                return;
                            }
                            if let Some(id) = st.pending.pop_front() {
                                break id;
                            }
                            st = worker_shared
                                .wake
                                .wait(st)
                                .unwrap_or_else(|p| p.into_inner());
                        }
                    };
                    let Some(result) = load(id) else {
                        tracing::trace!(window = id.0, "icon load produced nothing");
                        continue;
                    };
                    worker_shared.lock().done.push_back((id, result));
                    notify();
                }
            })?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queues `id` unless it is already waiting.
    pub fn request(&self, id: WindowId) {
        self.request_all([id]);
    }

    pub fn request_all(&self, ids: impl IntoIterator<Item = WindowId>) {
        {
            let mut st = self.shared.lock();
            for id in ids {
                if !st.pending.contains(&id) {
                    st.pending.push_back(id);
                }
            }
        }
        self.shared.wake.notify_one();
    }

    /// Takes every finished result, oldest first.
    pub fn drain(&self) -> Vec<(WindowId, T)> {
        self.shared.lock().done.drain(..).collect()
    }

    /// Stops the worker after its current job and joins it. Unstarted
    /// requests are dropped.
    pub fn shutdown(&mut self) {
        {
            let mut st = self.shared.lock();
            st.shutdown = true;
            st.pending.clear();
        }
        self.shared.wake.notify_all();
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
    }
}

impl<T: Send + 'static> Drop for IconQueue<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    /// Loader that reports each started id and then waits for the gate.
    fn gated(
        started: mpsc::Sender<WindowId>,
        gate: mpsc::Receiver<()>,
    ) -> impl FnMut(WindowId) -> Option<usize> + Send + 'static {
        move |id| {
            let _ = started.send(id);
            let _ = gate.recv();
            Some(id.0)
        }
    }

    #[test]
    fn delivers_in_request_order_and_notifies() {
        let (tx, rx) = mpsc::channel();
        let q = IconQueue::spawn(|id: WindowId| Some(id.0 * 10), move || {
            let _ = tx.send(());
        })
        .unwrap();
        q.request_all([WindowId(1), WindowId(2), WindowId(3)]);
        let mut got = Vec::new();
        while got.len() < 3 {
            rx.recv_timeout(Duration::from_secs(5)).expect("notified");
            got.extend(q.drain());
        }
        assert_eq!(got, vec![(WindowId(1), 10), (WindowId(2), 20), (WindowId(3), 30)]);
    }

    #[test]
    fn shutdown_joins_idle_worker() {
        let mut q = IconQueue::spawn(|_| Some(()), || {}).unwrap();
        q.shutdown();
        assert!(q.worker.is_none());
        assert!(q.drain().is_empty());
    }

    #[test]
    fn dead_windows_yield_nothing_and_no_notify() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let (tx, rx) = mpsc::channel();
        let mut q = IconQueue::spawn(
            |id: WindowId| (id.0 % 2 == 1).then_some(id.0),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            },
        )
        .unwrap();
        q.request_all([WindowId(1), WindowId(2), WindowId(3)]);
        let mut got = Vec::new();
        while got.len() < 2 {
            rx.recv_timeout(Duration::from_secs(5)).expect("notified");
            got.extend(q.drain());
        }
        q.shutdown();
        assert_eq!(got, vec![(WindowId(1), 1), (WindowId(3), 3)]);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
        assert!(q.drain().is_empty());
    }

    #[test]
    fn waiting_duplicates_are_queued_once() {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let q = IconQueue::spawn(gated(started_tx, gate_rx), move || {
            let _ = done_tx.send(());
        })
        .unwrap();
        q.request(WindowId(1));
        assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)), Ok(WindowId(1)));

        q.request_all([WindowId(2), WindowId(3), WindowId(2)]);
        q.request(WindowId(3));
        assert_eq!(
            q.shared.lock().pending.iter().copied().collect::<Vec<_>>(),
            vec![WindowId(2), WindowId(3)]
        );

        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }
        let mut got = Vec::new();
        while got.len() < 3 {
            done_rx.recv_timeout(Duration::from_secs(5)).expect("notified");
            got.extend(q.drain());
        }
        assert_eq!(got, vec![(WindowId(1), 1), (WindowId(2), 2), (WindowId(3), 3)]);
    }

    #[test]
    fn shutdown_drops_unstarted_requests() {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let mut q = IconQueue::spawn(gated(started_tx, gate_rx), || {}).unwrap();
        q.request_all([WindowId(1), WindowId(2), WindowId(3)]);
        assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)), Ok(WindowId(1)));

        // open the gate only once shutdown has cleared the queue
        let shared = Arc::clone(&q.shared);
        let releaser = std::thread::spawn(move || {
            while !shared.lock().shutdown {
                std::thread::sleep(Duration::from_millis(1));
            }
            let _ = gate_tx.send(());
        });
        q.shutdown();
        releaser.join().unwrap();

        assert_eq!(q.drain(), vec![(WindowId(1), 1)]);
        assert!(started_rx.try_recv().is_err());
    }
}
