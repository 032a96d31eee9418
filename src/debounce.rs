use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant},
};

pub struct Debouncer<T> {
    delay: Duration,
    stable: Arc<watch::Sender<T>>,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (stable, _) = watch::channel(initial);
        Self {
            delay,
            stable: Arc::new(stable),
            generation: Arc::default(),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn observe(&mut self, value: T) {
        self.cancel();

        // Measured from the call, not from when the task first runs.
        let deadline = Instant::now() + self.delay;
        let stable = Arc::downgrade(&self.stable);
        let generation = Arc::clone(&self.generation);
        let issued = generation.load(Ordering::SeqCst);

        self.pending = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            settle(&stable, &generation, issued, value);
        }));
    }

    pub fn value(&self) -> T {
        self.stable.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.stable.subscribe()
    }

    pub fn reset(&mut self, value: T) {
        self.cancel();
        self.stable.send_if_modified(|current| replace(current, value));
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }

    // An aborted task may already be running on another worker, so it also
    // has to find its generation current before it publishes.
    fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

fn settle<T>(stable: &Weak<watch::Sender<T>>, generation: &AtomicU64, issued: u64, value: T)
where
    T: PartialEq,
{
    let Some(stable) = stable.upgrade() else {
        return;
    };
    stable.send_if_modified(|current| {
        generation.load(Ordering::SeqCst) == issued && replace(current, value)
    });
}

fn replace<T>(current: &mut T, value: T) -> bool
where
    T: PartialEq,
{
    if *current == value {
        false
    } else {
        *current = value;
        true
    }
}
