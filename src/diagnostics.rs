//! Runtime diagnostics.
//!
//! Metrics (heap headroom, uptime, acquisition counters) are collected
//! on-demand for the housekeeping status line. Nothing is persisted; the
//! camera keeps no state across resets.

/// Heap figures as reported by ESP-IDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub free: u32,
    /// Low-water mark since boot.
    pub min_free: u32,
}

/// Runtime diagnostics snapshot collected on-demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeMetrics {
    pub uptime_secs: u64,
    pub frames_acquired: u64,
    pub failed_attempts: u64,
    /// `None` off-target, where there is no allocator to ask.
    pub heap: Option<HeapUsage>,
}

impl RuntimeMetrics {
    pub fn collect(uptime_secs: u64, frames_acquired: u64, failed_attempts: u64) -> Self {
        Self {
            uptime_secs,
            frames_acquired,
            failed_attempts,
            heap: heap_usage(),
        }
    }
}

#[cfg(target_os = "espidf")]
fn heap_usage() -> Option<HeapUsage> {
    use esp_idf_svc::sys::{esp_get_free_heap_size, esp_get_minimum_free_heap_size};
    // SAFETY: both are read-only queries of allocator counters.
    let (free, min_free) = unsafe { (esp_get_free_heap_size(), esp_get_minimum_free_heap_size()) };
    Some(HeapUsage { free, min_free })
}

#[cfg(not(target_os = "espidf"))]
fn heap_usage() -> Option<HeapUsage> {
    None
}

/// Install a panic hook that logs the reason before the default handler
/// aborts, so the message reaches the serial console.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        match info.location() {
            Some(loc) => log::error!("PANIC: {} at {}:{}", reason, loc.file(), loc.line()),
            None => log::error!("PANIC: {}", reason),
        }
    }));
}
