use super::cache::{cpuid_levels, CacheLevel};
use super::{sysinfo_total_ram, PlatformProvider};

/// Provider for Windows and any OS without a dedicated one: `num_cpus` for
/// topology, CPUID for caches, `sysinfo` for RAM.
#[derive(Debug, Clone, Default)]
pub struct PortablePlatform;

impl PlatformProvider for PortablePlatform {
    fn name(&self) -> &'static str {
        "portable"
    }

    fn logical_cores(&self) -> Option<u32> {
        u32::try_from(num_cpus::get()).ok()
    }

    fn physical_cores(&self) -> Option<u32> {
        u32::try_from(num_cpus::get_physical()).ok()
    }

    fn cache_levels(&self) -> Vec<CacheLevel> {
        cpuid_levels()
    }

    fn total_ram_bytes(&self) -> Option<u64> {
        sysinfo_total_ram()
    }
}
