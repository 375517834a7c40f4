//! CPU core affinity for shard threads.
//!
//! Pinning each shard thread to its own core keeps cache and scheduling
//! behavior predictable. On platforms without an affinity syscall the
//! functions degrade to a logged no-op.

use super::RuntimeError;
#[cfg(not(target_os = "linux"))]
use tracing::warn;

/// Number of logical CPUs available to the process.
pub fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Pin the current thread to `cpu`.
#[cfg(target_os = "linux")]
pub fn set_affinity(cpu: usize) -> Result<(), RuntimeError> {
    use std::mem;
    use tracing::debug;

    unsafe {
        let mut cpuset: libc::cpu_set_t = mem::zeroed();
        libc::CPU_ZERO(&mut cpuset);
        libc::CPU_SET(cpu, &mut cpuset);

        let rc = libc::sched_setaffinity(0, mem::size_of::<libc::cpu_set_t>(), &cpuset);
        if rc == 0 {
            debug!(cpu = cpu, "pinned thread to core");
            Ok(())
        } else {
            Err(RuntimeError::AffinityError(format!(
                "sched_setaffinity({cpu}): {}",
                std::io::Error::last_os_error()
            )))
        }
    }
}

/// Pin the current thread to `cpu` (unsupported platform, no-op).
#[cfg(not(target_os = "linux"))]
pub fn set_affinity(cpu: usize) -> Result<(), RuntimeError> {
    warn!(cpu = cpu, "CPU affinity not supported on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_cpus_nonzero() {
        assert!(available_cpus() >= 1);
    }

    #[test]
    fn test_set_affinity_valid_cpu() {
        // CPU 0 always exists.
        assert!(set_affinity(0).is_ok());
    }
}
