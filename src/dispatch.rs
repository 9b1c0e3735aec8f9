//! Job dispatch.
//!
//! Evaluations run out-of-band as [`Job`]s handed to a [`Dispatcher`].
//! The contract is fire-and-forget with at-least-once delivery assumed:
//! duplicate delivery must be tolerated (the execution protocol is
//! idempotent), and execution failures surface through the dispatcher's
//! failure counters and logs, not through `enqueue`.
//!
//! Two reference implementations are bundled: [`WorkerDispatcher`]
//! (bounded queue, worker threads) and [`InlineDispatcher`]
//! (synchronous, for embedded use and tests).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::engine::VigilEngine;
use crate::error::{DispatchError, VigilResult};
use crate::identity::{CheckSlug, Identifier};

/// A unit of dispatch.
///
/// Serializable so external task queues can carry it; the bundled
/// dispatchers pass it in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    /// Evaluate every subject a check currently generates.
    RunCheck {
        /// Slug of the check to run.
        slug: CheckSlug,
    },
    /// Evaluate one subject of a check.
    RunSubject {
        /// Slug of the check to run.
        slug: CheckSlug,
        /// Identifier of the subject to re-evaluate.
        identifier: Identifier,
    },
}

impl Job {
    /// The slug of the check this job runs.
    #[must_use]
    pub const fn slug(&self) -> &CheckSlug {
        match self {
            Self::RunCheck { slug } | Self::RunSubject { slug, .. } => slug,
        }
    }
}

/// Accepts jobs for out-of-band execution.
pub trait Dispatcher: Send + Sync {
    /// Enqueues a job.
    ///
    /// # Errors
    ///
    /// Fails when the job cannot be accepted
    /// ([`DispatchError::QueueFull`] is retryable). Never reports the
    /// job's execution result.
    fn enqueue(&self, job: Job) -> VigilResult<()>;
}

/// Configuration for [`WorkerDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued jobs before enqueue reports backpressure.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
        }
    }
}

/// Thread-pool dispatcher over a bounded queue.
///
/// Dropping the dispatcher drains already-queued jobs and joins the
/// workers.
pub struct WorkerDispatcher {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
    executed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl WorkerDispatcher {
    /// Starts the worker threads.
    #[must_use]
    pub fn start(config: DispatcherConfig, engine: Arc<VigilEngine>) -> Self {
        let workers = config.workers.max(1);
        let queue_capacity = config.queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let executed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx = rx.clone();
            let engine = Arc::clone(&engine);
            let executed = Arc::clone(&executed);
            let failed = Arc::clone(&failed);
            let thread_name = format!("vigil-worker-{idx}");
            let handle = thread::Builder::new()
                .name(thread_name)
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        match engine.execute(&job) {
                            Ok(_) => {
                                executed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(err) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                tracing::error!(job = ?job, error = %err, "check job failed");
                            }
                        }
                    }
                })
                .expect("failed to spawn vigil worker");
            handles.push(handle);
        }

        Self {
            tx,
            workers: handles,
            queue_capacity,
            executed,
            failed,
        }
    }

    /// Number of jobs that completed without error.
    #[must_use]
    pub fn executed_jobs(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Number of jobs that failed.
    #[must_use]
    pub fn failed_jobs(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Dispatcher for WorkerDispatcher {
    fn enqueue(&self, job: Job) -> VigilResult<()> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::Disconnected.into()),
        }
    }
}

impl Drop for WorkerDispatcher {
    fn drop(&mut self) {
        // Close the channel first: workers drain queued jobs then exit,
        // so no accepted job is lost on shutdown.
        let (dummy_tx, _) = bounded::<Job>(1);
        drop(std::mem::replace(&mut self.tx, dummy_tx));
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Synchronous dispatcher: executes each job on the calling thread.
///
/// Execution failures are counted and logged, never returned; that
/// keeps callers portable to queue-backed dispatchers.
pub struct InlineDispatcher {
    engine: Arc<VigilEngine>,
    executed: AtomicU64,
    failed: AtomicU64,
}

impl InlineDispatcher {
    /// Creates a dispatcher executing against the given engine.
    #[must_use]
    pub fn new(engine: Arc<VigilEngine>) -> Self {
        Self {
            engine,
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Number of jobs that completed without error.
    #[must_use]
    pub fn executed_jobs(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Number of jobs that failed.
    #[must_use]
    pub fn failed_jobs(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Dispatcher for InlineDispatcher {
    fn enqueue(&self, job: Job) -> VigilResult<()> {
        match self.engine.execute(&job) {
            Ok(_) => {
                self.executed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(job = ?job, error = %err, "check job failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::check::{CheckMeta, Subject};
    use crate::config::CheckConfig;
    use crate::registry::CheckRegistry;
    use crate::status::Status;
    use crate::store::{InMemoryRecordStore, RecordStore};
    use crate::Check;

    // Compile-time test: ensure the trait is object-safe
    fn _assert_dispatcher_object_safe(_: &dyn Dispatcher) {}

    struct SingleHost;

    impl Check for SingleHost {
        fn meta(&self) -> CheckMeta {
            CheckMeta::new("net", "SingleHost")
        }

        fn generate(&self) -> crate::VigilResult<Box<dyn Iterator<Item = Subject> + '_>> {
            Ok(Box::new(std::iter::once(Subject::new("only"))))
        }

        fn evaluate(&self, _subject: &Subject, _config: &CheckConfig) -> crate::VigilResult<Status> {
            Ok(Status::Ok)
        }

        fn identifier(&self, subject: &Subject) -> crate::VigilResult<crate::Identifier> {
            Ok(crate::Identifier::new(subject.to_string()))
        }
    }

    fn engine() -> (Arc<VigilEngine>, Arc<InMemoryRecordStore>) {
        let registry = Arc::new(CheckRegistry::new());
        registry.register(Arc::new(SingleHost)).unwrap();
        let store = Arc::new(InMemoryRecordStore::new());
        let engine = Arc::new(VigilEngine::new(
            registry,
            Arc::clone(&store) as Arc<dyn RecordStore>,
        ));
        (engine, store)
    }

    #[test]
    fn test_job_wire_format() {
        let job = Job::RunCheck {
            slug: CheckSlug::from("checks.DiskSpace"),
        };
        assert_eq!(
            serde_json::to_string(&job).unwrap(),
            "{\"type\":\"run_check\",\"slug\":\"checks.DiskSpace\"}"
        );

        let job = Job::RunSubject {
            slug: CheckSlug::from("checks.DiskSpace"),
            identifier: Identifier::new("host-1"),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"type\":\"run_subject\""));
        let parsed: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
        assert_eq!(parsed.slug().as_str(), "checks.DiskSpace");
    }

    #[test]
    fn test_dispatcher_config_default() {
        let config = DispatcherConfig::default();
        assert_eq!(config.workers, 2);
        assert_eq!(config.queue_capacity, 1024);
    }

    #[test]
    fn test_inline_dispatcher_executes_synchronously() {
        let (engine, store) = engine();
        let dispatcher = InlineDispatcher::new(Arc::clone(&engine));

        dispatcher
            .enqueue(Job::RunCheck {
                slug: CheckSlug::from("net.SingleHost"),
            })
            .unwrap();

        assert_eq!(dispatcher.executed_jobs(), 1);
        assert_eq!(dispatcher.failed_jobs(), 0);
        let record = store
            .get(&CheckSlug::from("net.SingleHost"), &Identifier::new("only"))
            .unwrap()
            .expect("record written");
        assert_eq!(record.status, Status::Ok);
    }

    #[test]
    fn test_inline_dispatcher_counts_failures_without_erroring() {
        let (engine, _store) = engine();
        let dispatcher = InlineDispatcher::new(engine);

        // Unknown slug: enqueue still succeeds, the failure is counted.
        dispatcher
            .enqueue(Job::RunCheck {
                slug: CheckSlug::from("net.Gone"),
            })
            .unwrap();

        assert_eq!(dispatcher.executed_jobs(), 0);
        assert_eq!(dispatcher.failed_jobs(), 1);
    }

    #[test]
    fn test_worker_dispatcher_drains_on_drop() {
        let (engine, store) = engine();
        let dispatcher = WorkerDispatcher::start(
            DispatcherConfig {
                workers: 1,
                queue_capacity: 16,
            },
            Arc::clone(&engine),
        );

        dispatcher
            .enqueue(Job::RunCheck {
                slug: CheckSlug::from("net.SingleHost"),
            })
            .unwrap();
        drop(dispatcher);

        let record = store
            .get(&CheckSlug::from("net.SingleHost"), &Identifier::new("only"))
            .unwrap();
        assert!(record.is_some());
    }
}
