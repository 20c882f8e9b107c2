//! Bounded worker pool for per-entry resolution.
//!
//! A fixed set of scoped threads pulls indices from a shared atomic cursor.
//! Workers only compute results and send them back over a channel; the calling
//! thread receives every result and is the only place that observes them, so
//! callers can mutate shared state from `on_result` without locking.
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Default number of concurrent resolutions.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Resolve every item with at most `concurrency` in flight.
///
/// The output is index-aligned with `items` regardless of completion order.
/// A resolver that panics yields `R::default()` for that item and does not
/// disturb its siblings. `on_result` runs on the calling thread as each result
/// arrives, in completion order.
pub fn resolve_all<T, R, F, G>(
    items: &[T],
    concurrency: usize,
    resolve: F,
    mut on_result: G,
) -> Vec<R>
where
    T: Sync,
    R: Default + Send,
    F: Fn(&T) -> R + Sync,
    G: FnMut(usize, &R),
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = concurrency.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);
    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<(usize, R)>();
        for worker in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            let resolve = &resolve;
            scope.spawn(move || loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(index) else {
                    break;
                };
                let result = panic::catch_unwind(AssertUnwindSafe(|| resolve(item)))
                    .unwrap_or_else(|_| {
                        tracing::error!(worker, index, "resolver panicked; item left unresolved");
                        R::default()
                    });
                if tx.send((index, result)).is_err() {
                    break;
                }
            });
        }
        // Only worker senders remain, so the loop ends once every worker exits.
        drop(tx);
        for (index, result) in rx {
            on_result(index, &result);
            slots[index] = Some(result);
        }
    });

    slots.into_iter().map(Option::unwrap_or_default).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[test]
    fn empty_input_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let out: Vec<u32> = resolve_all(
            &[] as &[u32],
            8,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                1
            },
            |_, _| {},
        );
        assert!(out.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn output_order_matches_input_order() {
        let items = vec![30u64, 0, 15, 5];
        let out = resolve_all(
            &items,
            4,
            |delay| {
                thread::sleep(Duration::from_millis(*delay));
                delay * 2
            },
            |_, _| {},
        );
        assert_eq!(out, vec![60, 0, 30, 10]);
    }

    #[test]
    fn single_worker_never_overlaps() {
        let items: Vec<usize> = (0..6).collect();
        let spans: Mutex<Vec<(Instant, Instant)>> = Mutex::new(Vec::new());
        resolve_all(
            &items,
            1,
            |_| {
                let start = Instant::now();
                thread::sleep(Duration::from_millis(5));
                spans.lock().expect("lock spans").push((start, Instant::now()));
                0u8
            },
            |_, _| {},
        );
        let mut spans = spans.into_inner().expect("spans");
        spans.sort();
        assert_eq!(spans.len(), 6);
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "resolutions overlapped");
        }
    }

    #[test]
    fn in_flight_never_exceeds_concurrency() {
        let items: Vec<usize> = (0..20).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        resolve_all(
            &items,
            3,
            |_| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                0u8
            },
            |_, _| {},
        );
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak {peak} exceeded concurrency");
        assert!(peak >= 1);
    }

    #[test]
    fn zero_concurrency_still_runs_one_worker() {
        let out = resolve_all(&[1u8, 2, 3], 0, |n| *n + 1, |_, _| {});
        assert_eq!(out, vec![2, 3, 4]);
    }

    #[test]
    fn panicking_item_yields_default_without_aborting_batch() {
        let out = resolve_all(
            &[1u32, 2, 3],
            2,
            |n| {
                if *n == 2 {
                    panic!("oracle wrapper blew up");
                }
                n * 10
            },
            |_, _| {},
        );
        assert_eq!(out, vec![10, 0, 30]);
    }

    #[test]
    fn on_result_sees_every_item_once() {
        let mut seen = Vec::new();
        resolve_all(
            &[5u8, 6, 7, 8],
            2,
            |n| *n,
            |index, value| seen.push((index, *value)),
        );
        seen.sort();
        assert_eq!(seen, vec![(0, 5), (1, 6), (2, 7), (3, 8)]);
    }
}
