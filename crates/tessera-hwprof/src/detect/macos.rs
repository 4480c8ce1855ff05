use super::cache::{CacheKind, CacheLevel};
use super::util::{parse_leading_u64, run_command};
use super::{sysinfo_total_ram, PlatformProvider};

/// macOS provider backed by `sysctl -n hw.*`.
#[derive(Debug, Clone, Default)]
pub struct MacPlatform;

fn sysctl_u64(key: &str) -> Option<u64> {
    run_command("sysctl", &["-n", key])
        .ok()
        .and_then(|s| parse_leading_u64(&s))
        .filter(|&v| v > 0)
}

fn sysctl_u32(key: &str) -> Option<u32> {
    sysctl_u64(key).and_then(|v| u32::try_from(v).ok())
}

fn sysctl_kb(key: &str) -> Option<u32> {
    sysctl_u64(key).and_then(|bytes| u32::try_from(bytes / 1024).ok())
}

impl PlatformProvider for MacPlatform {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn logical_cores(&self) -> Option<u32> {
        sysctl_u32("hw.logicalcpu").or_else(|| u32::try_from(num_cpus::get()).ok())
    }

    fn physical_cores(&self) -> Option<u32> {
        sysctl_u32("hw.physicalcpu").or_else(|| u32::try_from(num_cpus::get_physical()).ok())
    }

    fn cache_levels(&self) -> Vec<CacheLevel> {
        let line = sysctl_u32("hw.cachelinesize");
        let mut out = Vec::new();
        for (level, kind, key) in [
            (1, CacheKind::Data, "hw.l1dcachesize"),
            (1, CacheKind::Instruction, "hw.l1icachesize"),
            (2, CacheKind::Unified, "hw.l2cachesize"),
            (3, CacheKind::Unified, "hw.l3cachesize"),
        ] {
            if let Some(kb) = sysctl_kb(key) {
                out.push(CacheLevel {
                    level,
                    kind,
                    size_kb: Some(kb),
                    line_bytes: line,
                });
            }
        }
        out
    }

    fn total_ram_bytes(&self) -> Option<u64> {
        sysctl_u64("hw.memsize").or_else(sysinfo_total_ram)
    }
}
