//! Stress helpers for libcat.
//!
//! These drive a shared [`Library`] from several threads at once and count
//! what readers observe, so tests can assert that no reader ever sees a
//! half-applied mutation.

use libcat_core::{BookId, CatalogEntry, Library};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Mutations that succeeded.
    pub successful_ops: usize,
    /// Mutations the engine rejected.
    pub failed_ops: usize,
    /// Read passes completed by reader threads.
    pub reads: usize,
    /// Read passes that saw structures disagree.
    pub inconsistencies: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Mutations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.successful_ops + self.failed_ops) as f64 / secs
        } else {
            0.0
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Reads: {}", self.reads);
        println!("Inconsistent reads: {}", self.inconsistencies);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second());
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Mutations per writer thread.
    pub operations: usize,
    /// Number of writer threads.
    pub writers: usize,
    /// Number of reader threads.
    pub readers: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 500,
            writers: 2,
            readers: 4,
        }
    }
}

/// Runs writers that add, link and remove books while readers check the
/// catalog.
///
/// Each writer adds books titled `w{writer} {n}`, links each new book to the
/// previous one, and removes every third book it added. Readers repeatedly
/// take a statistics snapshot and run a prefix search, and count a pass as
/// inconsistent if the store, prefix index and graph sizes disagree or a
/// search returns a title outside the prefix.
///
/// The library must register graph nodes and have no link policy.
pub fn stress_readers_and_writers(library: Arc<Library>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let reads = Arc::new(AtomicUsize::new(0));
    let inconsistencies = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));

    let start = Instant::now();

    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let library = Arc::clone(&library);
            let reads = Arc::clone(&reads);
            let inconsistencies = Arc::clone(&inconsistencies);
            let done = Arc::clone(&done);

            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    if !consistent_read(&library) {
                        inconsistencies.fetch_add(1, Ordering::Relaxed);
                    }
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..config.writers)
        .map(|w| {
            let library = Arc::clone(&library);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                let tally = |ok: bool| {
                    let counter = if ok { &successful } else { &failed };
                    counter.fetch_add(1, Ordering::Relaxed);
                };
                let mut previous: Option<BookId> = None;
                for n in 0..operations {
                    let added = library.add_book(CatalogEntry::new(format!("w{w} {n}"), "Stress"));
                    tally(added.is_ok());
                    let Ok(id) = added else { continue };

                    if let Some(prev) = previous {
                        tally(library.link(prev, id, 0.5).is_ok());
                    }
                    if n % 3 == 2 {
                        tally(library.remove_book(id).is_ok());
                        previous = None;
                    } else {
                        previous = Some(id);
                    }
                }
            })
        })
        .collect();

    for handle in writers {
        handle.join().expect("Writer panicked");
    }
    done.store(true, Ordering::Release);
    for handle in readers {
        handle.join().expect("Reader panicked");
    }

    StressTestResult {
        successful_ops: successful.load(Ordering::Relaxed),
        failed_ops: failed.load(Ordering::Relaxed),
        reads: reads.load(Ordering::Relaxed),
        inconsistencies: inconsistencies.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}

fn consistent_read(library: &Library) -> bool {
    let snapshot = library.stats();
    // Title and author indexes each hold one pair per book.
    if snapshot.graph_nodes != snapshot.books || snapshot.prefix_entries != 2 * snapshot.books {
        return false;
    }
    library
        .search("w")
        .iter()
        .all(|entry| entry.title.starts_with('w'))
}
