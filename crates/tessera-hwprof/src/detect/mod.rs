use std::sync::Arc;
use std::time::Instant;

use sysinfo::System;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::types::{CpuCores, HardwareProfile, MemoryInfo};

pub mod cache;
pub mod cpu;
pub mod gpu;
mod util;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxPlatform;
#[cfg(target_os = "linux")]
pub type NativePlatform = LinuxPlatform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::MacPlatform;
#[cfg(target_os = "macos")]
pub type NativePlatform = MacPlatform;

mod portable;
pub use portable::PortablePlatform;
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub type NativePlatform = PortablePlatform;

use cache::CacheLevel;
use gpu::GpuQuery;

/// Fallback when the RAM query fails or reports nothing.
pub const DEFAULT_TOTAL_RAM_MB: u64 = 1024;

/// OS layer. Each method answers `None`/empty when it cannot tell; the
/// platform-agnostic code in this module owns every default.
pub trait PlatformProvider {
    fn name(&self) -> &'static str;
    fn logical_cores(&self) -> Option<u32>;
    fn physical_cores(&self) -> Option<u32>;
    fn cache_levels(&self) -> Vec<CacheLevel>;
    fn total_ram_bytes(&self) -> Option<u64>;

    /// Kernel-exposed CPU flag line, used to refine ARM features.
    fn cpu_features_line(&self) -> Option<String> {
        None
    }
}

pub(crate) fn sysinfo_total_ram() -> Option<u64> {
    let mut sys = System::new();
    sys.refresh_memory();
    Some(sys.total_memory()).filter(|&b| b > 0) // bytes
}

/// Probes the running machine with the native provider, the default GPU
/// chain and `TESSERA_HWPROF_*` configuration. Never fails.
pub fn detect() -> HardwareProfile {
    detect_with(
        &NativePlatform::default(),
        &gpu::default_gpu_queries(),
        &ProbeConfig::from_env(),
    )
}

/// [`detect`] with every collaborator supplied by the caller.
pub fn detect_with(
    platform: &dyn PlatformProvider,
    gpu_queries: &[Arc<dyn GpuQuery>],
    cfg: &ProbeConfig,
) -> HardwareProfile {
    let start = Instant::now();
    let mut diags: Vec<String> = Vec::new();

    let features_line = platform.cpu_features_line();
    let cpu_features = cpu::detect_features(features_line.as_deref());
    let cpu_brand = cpu::detect_brand().unwrap_or_else(|| "Unknown CPU".into());

    let logical = platform.logical_cores();
    let physical = platform.physical_cores();
    if logical.is_none() || physical.is_none() {
        diags.push(format!(
            "[{}] core count incomplete (logical={logical:?}, physical={physical:?})",
            platform.name()
        ));
    }
    let cpu_cores = reconcile_cores(logical, physical);

    let mut cache = cache::assemble(&platform.cache_levels());
    for field in cache::apply_defaults(&mut cache) {
        diags.push(format!("[{}] cache {field} defaulted", platform.name()));
    }

    let ram_bytes = platform.total_ram_bytes();
    let memory = resolve_memory(ram_bytes);
    if ram_bytes.map_or(true, |b| b / (1024 * 1024) == 0) {
        diags.push(format!(
            "[{}] total RAM unknown, assuming {DEFAULT_TOTAL_RAM_MB} MB",
            platform.name()
        ));
    }

    let (gpu, gpu_diags) = gpu::probe_gpu(gpu_queries, cfg);
    diags.extend(gpu_diags);

    for d in &diags {
        debug!("{d}");
    }
    debug!(
        platform = platform.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "hardware probe complete"
    );

    HardwareProfile {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu_brand,
        cpu_features,
        cpu_cores,
        cache,
        memory,
        gpu,
        diagnostics: cfg.debug.then_some(diags),
    }
}

/// Clamps both counts to at least 1 and forces `logical >= physical`, filling
/// a missing side from the other.
pub fn reconcile_cores(logical: Option<u32>, physical: Option<u32>) -> CpuCores {
    let logical = logical.filter(|&n| n > 0);
    let physical = physical.filter(|&n| n > 0);
    let physical = physical.or(logical).unwrap_or(1);
    let logical = logical.unwrap_or(physical).max(physical);
    CpuCores { physical, logical }
}

/// Bytes to MB, never zero.
pub fn resolve_memory(total_bytes: Option<u64>) -> MemoryInfo {
    let mb = total_bytes.unwrap_or(0) / (1024 * 1024);
    MemoryInfo {
        total_ram_mb: if mb == 0 { DEFAULT_TOTAL_RAM_MB } else { mb },
    }
}
