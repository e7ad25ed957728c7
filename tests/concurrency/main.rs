//! Concurrent writers must never commit overlapping intervals in one group.


use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use interval_mutex::{
    overlaps, IntervalRecord, IntervalStore, MutexConfig, MutexError, MutexRepository,
};
use serde::{Deserialize, Serialize};
use slow_store::SlowStore;

#[derive(Clone, Debug, Serialize, Deserialize, IntervalRecord)]
#[interval(collision_fields = ["machine"])]
struct Job {
    id: Option<String>,
    #[interval(start)]
    #[serde(rename = "begins")]
    starts_at: Option<DateTime<Utc>>,
    #[interval(end)]
    ends_at: Option<DateTime<Utc>>,
    machine: String,
    worker: usize,
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minute)
}

fn job(machine: &str, worker: usize, from: i64, to: i64) -> Job {
    Job {
        id: None,
        starts_at: Some(at(from)),
        ends_at: Some(at(to)),
        machine: machine.to_string(),
        worker,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn assert_no_overlaps(jobs: &[Job]) {
    for (i, a) in jobs.iter().enumerate() {
        for b in &jobs[i + 1..] {
            if a.machine != b.machine {
                continue;
            }
            assert!(
                !overlaps(&a.starts_at, &a.ends_at, &b.starts_at, &b.ends_at),
                "{:?} overlaps {:?}",
                a,
                b
            );
        }
    }
}

#[test]
fn derive_honours_field_overrides() {
    assert_eq!(Job::COLLECTION, "jobs");
    assert_eq!(Job::START_FIELD, "begins");
    assert_eq!(Job::END_FIELD, "ends_at");
    assert_eq!(Job::ID_FIELD, "id");
}

#[test]
fn racing_writers_for_one_slot_commit_exactly_once() {
    init_tracing();
    let repo = Arc::new(MutexRepository::new(SlowStore::new(Duration::from_millis(5))));
    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.create(&mut job("lathe", worker, 0, 60))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let committed = results.iter().filter(|r| r.is_ok()).count();
    let collided = results
        .iter()
        .filter(|r| matches!(r, Err(MutexError::Collision(_))))
        .count();

    assert_eq!(committed, 1);
    assert_eq!(collided, writers - 1);
    assert_eq!(repo.count::<Job>().unwrap(), 1);
}

#[test]
fn staggered_writers_keep_the_invariant() {
    init_tracing();
    let repo = Arc::new(MutexRepository::new(SlowStore::new(Duration::from_millis(1))));
    let writers = 6;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for round in 0..10_i64 {
                    let from = (worker as i64 * 7 + round * 13) % 120;
                    let machine = if round % 2 == 0 { "lathe" } else { "mill" };
                    let _ = repo.create(&mut job(machine, worker, from, from + 15));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stored: Vec<Job> = repo
        .store()
        .find_records::<Job>(&|_| true)
        .unwrap()
        .into_iter()
        .map(|v| v.data)
        .collect();
    assert!(!stored.is_empty());
    assert_no_overlaps(&stored);
}

#[test]
fn racing_updates_into_one_slot_commit_exactly_once() {
    init_tracing();
    let repo = Arc::new(MutexRepository::new(SlowStore::new(Duration::from_millis(5))));
    let writers = 4;

    let mut jobs: Vec<Job> = (0..writers)
        .map(|worker| {
            let mut j = job("press", worker, 100 + worker as i64 * 10, 105 + worker as i64 * 10);
            repo.create(&mut j).unwrap();
            j
        })
        .collect();

    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = jobs
        .drain(..)
        .map(|mut j| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                j.starts_at = Some(at(0));
                j.ends_at = Some(at(30));
                barrier.wait();
                repo.update(&j)
            })
        })
        .collect();

    let committed = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(committed, 1);

    let stored: Vec<Job> = repo
        .find::<Job>(&|_| true)
        .unwrap()
        .into_iter()
        .map(|v| v.data)
        .collect();
    assert_eq!(stored.len(), writers);
    assert_no_overlaps(&stored);
}

#[test]
fn blocked_writer_times_out_with_retryable_error() {
    init_tracing();
    let repo = Arc::new(
        MutexRepository::new(SlowStore::new(Duration::from_millis(200)))
            .with_config(MutexConfig::default().with_lock_timeout(Duration::from_millis(20))),
    );

    let slow = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || repo.create(&mut job("kiln", 0, 0, 10)))
    };
    thread::sleep(Duration::from_millis(50));

    let err = repo.create(&mut job("kiln", 1, 20, 30)).unwrap_err();
    assert!(err.is_retryable(), "expected contention, got {err:?}");

    slow.join().unwrap().unwrap();
    repo.create(&mut job("kiln", 1, 20, 30)).unwrap();
}
