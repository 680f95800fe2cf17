use std::time::Duration;

/// Suspends the calling flow between failed attempts of [`Retry::run`](crate::Retry::run).
pub trait Sleep {
    fn sleep(&mut self, dur: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

impl<F> Sleep for F
where
    F: FnMut(Duration),
{
    fn sleep(&mut self, dur: Duration) {
        self(dur)
    }
}
