//! Bounded worker pool: a counting semaphore plus `std::thread::scope`,
//! matching §5's model of independent blocking threads with no
//! cooperative yield points — every remote probe here shells out to
//! `git`, so there's no async I/O to hand to a task executor.

use std::sync::{Condvar, Mutex};

pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    pub fn acquire(&self) -> SemaphoreGuard<'_> {
        let mut count = self.state.lock().unwrap();
        while *count == 0 {
            count = self.cond.wait(count).unwrap();
        }
        *count -= 1;
        SemaphoreGuard { sem: self }
    }

    fn release(&self) {
        let mut count = self.state.lock().unwrap();
        *count += 1;
        self.cond.notify_one();
    }
}

pub struct SemaphoreGuard<'a> {
    sem: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

/// Default worker pool size for I/O-bound operations (§5).
pub const DEFAULT_WORKERS: usize = 8;

/// Run `work` for each item in `items`, bounded to at most
/// [`DEFAULT_WORKERS`] concurrently executing at once, using blocking
/// OS threads (no async runtime involved). Each item's result is
/// returned in input order.
pub fn run_bounded<T, R, F>(items: Vec<T>, workers: usize, work: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let sem = Semaphore::new(workers.max(1));
    let work = &work;
    let sem = &sem;
    std::thread::scope(|scope| {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let guard_sem = sem;
                scope.spawn(move || {
                    let _permit = guard_sem.acquire();
                    work(item)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn never_exceeds_bound() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..20).collect();
        let c = concurrent.clone();
        let m = max_seen.clone();
        let results = run_bounded(items, 4, move |i| {
            let now = c.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            c.fetch_sub(1, Ordering::SeqCst);
            i * 2
        });
        assert_eq!(results.len(), 20);
        assert!(max_seen.load(Ordering::SeqCst) <= 4);
    }
}
