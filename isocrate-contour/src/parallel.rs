//! Thread pool management for the contouring passes
//!
//! Passes 1, 2 and 4 run on a process-wide rayon pool. The pool is configured
//! once with [`init_thread_pool`]; otherwise it is created lazily with defaults.

use isocrate_core::{Error, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex, OnceLock};

static GLOBAL_THREAD_POOL: OnceLock<Arc<ThreadPool>> = OnceLock::new();
static THREAD_POOL_CONFIG: Mutex<ThreadPoolConfig> = Mutex::new(ThreadPoolConfig::new());

const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Thread pool configuration for parallel processing
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of threads to use (None = one per logical CPU)
    pub num_threads: Option<usize>,
    /// Thread stack size in bytes
    pub stack_size: Option<usize>,
    /// Thread name prefix
    pub thread_name_prefix: String,
    /// Enable parallel processing (can be disabled for debugging)
    pub enabled: bool,
}

impl ThreadPoolConfig {
    const fn new() -> Self {
        Self {
            num_threads: None,
            stack_size: None,
            thread_name_prefix: String::new(),
            enabled: true,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Enable or disable parallel processing
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn build_pool(&self) -> Result<ThreadPool> {
        let mut builder = ThreadPoolBuilder::new()
            .num_threads(self.num_threads.unwrap_or_else(num_cpus::get))
            .stack_size(self.stack_size.unwrap_or(DEFAULT_STACK_SIZE));

        if !self.thread_name_prefix.is_empty() {
            let prefix = self.thread_name_prefix.clone();
            builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
        }

        builder
            .build()
            .map_err(|e| Error::Algorithm(format!("Failed to create thread pool: {}", e)))
    }
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(DEFAULT_STACK_SIZE),
            thread_name_prefix: "isocrate-contour".to_string(),
            enabled: true,
        }
    }
}

/// Initialize the global thread pool with custom configuration
///
/// Only the first successful call creates the pool and records its settings.
/// Later calls leave the running pool alone and only update the enable switch.
pub fn init_thread_pool(config: ThreadPoolConfig) -> Result<()> {
    if GLOBAL_THREAD_POOL.get().is_none() {
        install_pool(config.clone())?;
    }

    if let Ok(mut global_config) = THREAD_POOL_CONFIG.lock() {
        global_config.enabled = config.enabled;
    }

    Ok(())
}

/// Get the global thread pool, initializing with defaults if needed
pub fn get_thread_pool() -> Result<Arc<ThreadPool>> {
    if let Some(pool) = GLOBAL_THREAD_POOL.get() {
        return Ok(pool.clone());
    }

    let config = ThreadPoolConfig {
        enabled: is_parallel_enabled(),
        ..ThreadPoolConfig::default()
    };
    install_pool(config)?;
    GLOBAL_THREAD_POOL
        .get()
        .cloned()
        .ok_or_else(|| Error::Algorithm("Thread pool was not installed".to_string()))
}

/// Build a pool from `config` and make it global, recording `config` if it won
fn install_pool(config: ThreadPoolConfig) -> Result<()> {
    let pool = config.build_pool()?;
    // A concurrent initializer may have won; its pool and settings are kept.
    if GLOBAL_THREAD_POOL.set(Arc::new(pool)).is_ok() {
        if let Ok(mut global_config) = THREAD_POOL_CONFIG.lock() {
            *global_config = config;
        }
    }
    Ok(())
}

/// Get current thread pool configuration
pub fn get_config() -> ThreadPoolConfig {
    THREAD_POOL_CONFIG
        .lock()
        .map(|config| config.clone())
        .unwrap_or_else(|_| ThreadPoolConfig::default())
}

/// Check if parallel processing is enabled
pub fn is_parallel_enabled() -> bool {
    get_config().enabled
}

/// Number of worker threads a parallel pass will use
pub fn current_num_threads() -> usize {
    get_thread_pool()
        .map(|pool| pool.current_num_threads())
        .unwrap_or(1)
}

/// Execute an operation on the global thread pool
pub fn execute_parallel<F, R>(op: F) -> Result<R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    if is_parallel_enabled() {
        Ok(get_thread_pool()?.install(op))
    } else {
        Ok(op())
    }
}
