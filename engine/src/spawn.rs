//! Where worker jobs actually run.

use std::io;
use std::thread;

use offload_config::DispatcherConfig;
use offload_types::DispatchId;

/// A worker body, ready to run exactly once.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Starts a job in its own execution context.
///
/// Implementations must either run the job on a context other than the
/// caller's or return an error. Dropping the job without running it is
/// allowed; the dispatch then resolves to a `Lost` failure.
pub trait Spawn {
    fn spawn(&self, id: DispatchId, job: Job) -> io::Result<()>;
}

/// Spawns one detached OS thread per dispatch.
///
/// The thread exits as soon as the job returns.
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name_prefix: String,
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    #[must_use]
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            stack_size: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self {
            name_prefix: config.thread_name_prefix.clone(),
            stack_size: config.stack_size_bytes,
        }
    }

    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn worker_name(&self, id: DispatchId) -> String {
        format!("{}-{id}", self.name_prefix)
    }

    #[must_use]
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::from_config(&DispatcherConfig::default())
    }
}

impl Spawn for ThreadSpawner {
    fn spawn(&self, id: DispatchId, job: Job) -> io::Result<()> {
        let mut builder = thread::Builder::new().name(self.worker_name(id));
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        // Detached: the join handle is dropped, the job reports through its slot.
        builder.spawn(job).map(drop)
    }
}

impl<S: Spawn + ?Sized> Spawn for &S {
    fn spawn(&self, id: DispatchId, job: Job) -> io::Result<()> {
        (**self).spawn(id, job)
    }
}
