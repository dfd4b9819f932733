// src/pipeline/pool.rs

//! Bounded-concurrency task pool.
//!
//! Units are plain futures; nothing runs until [`TaskPool::run_all`] admits
//! them. At most `capacity` units are in flight at any instant, each holding
//! one semaphore permit that it releases when it finishes. The backlog may
//! grow while the pool drains: a [`PoolHandle`] can be moved into a running
//! unit and used to submit more work, and `run_all` keeps going until it
//! observes an empty backlog with nothing in flight.
//!
//! A failing or panicking unit never affects its siblings; its outcome is
//! recorded as an `Err` in its own result slot.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;

use crate::error::{AppError, Result};

type Unit<T> = BoxFuture<'static, Result<T>>;

/// Pending units in submission order.
struct Backlog<T> {
    pending: VecDeque<(usize, Unit<T>)>,
    submitted: usize,
}

struct Shared<T> {
    backlog: Mutex<Backlog<T>>,
    submitted: Notify,
}

impl<T> Shared<T> {
    fn push(&self, unit: Unit<T>) {
        {
            let mut backlog = self.backlog.lock().unwrap_or_else(PoisonError::into_inner);
            let index = backlog.submitted;
            backlog.submitted += 1;
            backlog.pending.push_back((index, unit));
        }
        self.submitted.notify_one();
    }

    fn pop(&self) -> Option<(usize, Unit<T>)> {
        self.backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .pop_front()
    }

    fn pending(&self) -> usize {
        self.backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

/// Bounded-concurrency executor returning results in submission order.
pub struct TaskPool<T> {
    capacity: usize,
    slots: Arc<Semaphore>,
    shared: Arc<Shared<T>>,
}

/// Cloneable submitter for a [`TaskPool`], usable from inside running units.
pub struct PoolHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> PoolHandle<T> {
    /// Enqueue one unit.
    pub fn submit<F>(&self, unit: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.shared.push(Box::pin(unit));
    }
}

impl<T: Send + 'static> TaskPool<T> {
    /// Create a pool running at most `capacity` units at once.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AppError::PoolConfiguration(
                "capacity must be a positive integer".into(),
            ));
        }

        Ok(Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            shared: Arc::new(Shared {
                backlog: Mutex::new(Backlog {
                    pending: VecDeque::new(),
                    submitted: 0,
                }),
                submitted: Notify::new(),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of units waiting for a slot.
    pub fn pending(&self) -> usize {
        self.shared.pending()
    }

    /// A submitter that can be moved into units.
    pub fn handle(&self) -> PoolHandle<T> {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Enqueue one unit.
    pub fn submit<F>(&self, unit: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.shared.push(Box::pin(unit));
    }

    /// Drain the backlog, returning one result per submitted unit.
    ///
    /// Results are ordered by submission, not completion. Units submitted
    /// through a [`PoolHandle`] while the drain is in progress are included.
    pub async fn run_all(self) -> Vec<Result<T>> {
        let mut running: JoinSet<(usize, Result<T>)> = JoinSet::new();
        let mut results: Vec<Option<Result<T>>> = Vec::new();

        loop {
            // Admit pending units while slots are free, oldest first.
            while let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() {
                let Some((index, unit)) = self.shared.pop() else {
                    break;
                };

                running.spawn(async move {
                    let result = AssertUnwindSafe(unit)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(AppError::TaskPanicked(panic_message(&panic))));
                    drop(permit);
                    (index, result)
                });
            }

            // Every slot is free and the backlog is empty.
            if running.is_empty() {
                break;
            }

            tokio::select! {
                joined = running.join_next() => match joined {
                    Some(Ok((index, result))) => {
                        if results.len() <= index {
                            results.resize_with(index + 1, || None);
                        }
                        results[index] = Some(result);
                    }
                    Some(Err(e)) => log::error!("Pool unit aborted: {e}"),
                    None => {}
                },
                _ = self.shared.submitted.notified() => {}
            }
        }

        let total = self.shared.backlog.lock().unwrap_or_else(PoisonError::into_inner).submitted;
        results.resize_with(total, || None);
        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(AppError::TaskPanicked("unit aborted".into()))))
            .collect()
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
