//! Coarse single-threaded read-bandwidth estimate.

use std::hint::black_box;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::types::HardwareProfile;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthConfig {
    pub buffer_bytes: usize,
    pub passes: u32,
    /// Hosts with less RAM than this are left alone.
    pub min_total_ram_mb: u64,
}

impl Default for BandwidthConfig {
    fn default() -> Self {
        Self {
            buffer_bytes: 128 * 1024 * 1024,
            passes: 10,
            min_total_ram_mb: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Bandwidth {
    MbPerSec(f64),
    Insufficient(Shortfall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shortfall {
    LowMemory { total_ram_mb: u64 },
    AllocationFailed,
    ZeroElapsed,
}

/// [`estimate_with`] using the default 128 MB × 10 pass run.
pub fn estimate(profile: &HardwareProfile) -> Bandwidth {
    estimate_with(profile, &BandwidthConfig::default())
}

pub fn estimate_with(profile: &HardwareProfile, cfg: &BandwidthConfig) -> Bandwidth {
    let total_ram_mb = profile.memory.total_ram_mb;
    if total_ram_mb < cfg.min_total_ram_mb {
        return Bandwidth::Insufficient(Shortfall::LowMemory { total_ram_mb });
    }

    let len = cfg.buffer_bytes / std::mem::size_of::<f64>();
    let mut buf: Vec<f64> = Vec::new();
    if len == 0 || buf.try_reserve_exact(len).is_err() {
        return Bandwidth::Insufficient(Shortfall::AllocationFailed);
    }
    buf.extend((0..len).map(|i| i as f64));

    let start = Instant::now();
    let mut sum = 0.0f64;
    for _ in 0..cfg.passes {
        for &v in black_box(buf.as_slice()) {
            sum += v;
        }
        sum = black_box(sum);
    }
    let elapsed = start.elapsed().as_secs_f64();

    let bytes = (len * std::mem::size_of::<f64>()) as f64 * f64::from(cfg.passes);
    bandwidth_from(bytes, elapsed)
}

fn bandwidth_from(bytes: f64, elapsed_secs: f64) -> Bandwidth {
    if elapsed_secs <= 0.0 {
        return Bandwidth::Insufficient(Shortfall::ZeroElapsed);
    }
    let mbps = bytes / MB / elapsed_secs;
    debug!(mbps, elapsed_secs, "bandwidth estimate");
    Bandwidth::MbPerSec(mbps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(total_ram_mb: u64) -> HardwareProfile {
        let mut p = HardwareProfile::baseline();
        p.memory.total_ram_mb = total_ram_mb;
        p
    }

    #[test]
    fn refuses_low_memory_hosts() {
        assert_eq!(
            estimate(&profile(128)),
            Bandwidth::Insufficient(Shortfall::LowMemory { total_ram_mb: 128 })
        );
    }

    #[test]
    fn zero_elapsed_is_not_divided() {
        assert_eq!(
            bandwidth_from(1.0e9, 0.0),
            Bandwidth::Insufficient(Shortfall::ZeroElapsed)
        );
        assert_eq!(bandwidth_from(MB * 10.0, 2.0), Bandwidth::MbPerSec(5.0));
    }

    #[test]
    fn empty_buffer_is_an_allocation_failure() {
        let cfg = BandwidthConfig {
            buffer_bytes: 4,
            ..Default::default()
        };
        assert_eq!(
            estimate_with(&profile(4096), &cfg),
            Bandwidth::Insufficient(Shortfall::AllocationFailed)
        );
    }

    #[test]
    fn small_run_measures_something() {
        let cfg = BandwidthConfig {
            buffer_bytes: 4 * 1024 * 1024,
            passes: 4,
            min_total_ram_mb: 256,
        };
        match estimate_with(&profile(4096), &cfg) {
            Bandwidth::MbPerSec(v) => assert!(v > 0.0),
            Bandwidth::Insufficient(s) => assert_eq!(s, Shortfall::ZeroElapsed),
        }
    }
}
