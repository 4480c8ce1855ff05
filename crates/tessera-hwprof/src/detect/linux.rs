use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::cache::{cpuid_levels, CacheKind, CacheLevel};
use super::{sysinfo_total_ram, PlatformProvider};
use crate::detect::util::parse_leading_u64;

/// Linux provider: procfs for topology and ARM flags, sysfs for caches.
#[derive(Debug, Clone)]
pub struct LinuxPlatform {
    sysfs_root: PathBuf,
    procfs_root: PathBuf,
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::with_roots("/sys", "/proc")
    }
}

impl LinuxPlatform {
    /// Reads from alternate roots (fixture trees in tests, containers).
    pub fn with_roots(sysfs_root: impl Into<PathBuf>, procfs_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            procfs_root: procfs_root.into(),
        }
    }

    fn cpuinfo(&self) -> Option<String> {
        fs::read_to_string(self.procfs_root.join("cpuinfo")).ok()
    }

    fn sysfs_cache_levels(&self) -> Vec<CacheLevel> {
        let dir = self.sysfs_root.join("devices/system/cpu/cpu0/cache");
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut indices: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("index"))
            })
            .collect();
        indices.sort();
        indices.iter().filter_map(|p| read_cache_index(p)).collect()
    }
}

impl PlatformProvider for LinuxPlatform {
    fn name(&self) -> &'static str {
        "linux"
    }

    // Host-wide, same scope as physical_cores; num_cpus only sees this
    // process's affinity/cgroup share.
    fn logical_cores(&self) -> Option<u32> {
        read_trimmed(&self.sysfs_root.join("devices/system/cpu/online"))
            .as_deref()
            .and_then(parse_cpu_list)
            .or_else(|| self.cpuinfo().as_deref().and_then(parse_logical_cores))
            .or_else(|| u32::try_from(num_cpus::get()).ok())
    }

    fn physical_cores(&self) -> Option<u32> {
        self.cpuinfo()
            .as_deref()
            .and_then(parse_physical_cores)
            .or_else(|| u32::try_from(num_cpus::get_physical()).ok())
    }

    fn cache_levels(&self) -> Vec<CacheLevel> {
        let levels = self.sysfs_cache_levels();
        if levels.is_empty() {
            cpuid_levels()
        } else {
            levels
        }
    }

    fn total_ram_bytes(&self) -> Option<u64> {
        sysinfo_total_ram()
    }

    fn cpu_features_line(&self) -> Option<String> {
        self.cpuinfo().as_deref().and_then(features_line)
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_cache_index(dir: &Path) -> Option<CacheLevel> {
    let level = read_trimmed(&dir.join("level"))?.parse::<u8>().ok()?;
    let kind = CacheKind::parse(&read_trimmed(&dir.join("type"))?)?;
    let size_kb = read_trimmed(&dir.join("size")).and_then(|s| parse_size_kb(&s));
    let line_bytes = read_trimmed(&dir.join("coherency_line_size"))
        .and_then(|s| s.parse::<u32>().ok());
    Some(CacheLevel {
        level,
        kind,
        size_kb,
        line_bytes,
    })
}

/// sysfs sizes: `48K`, `2048K`, `32M`, or a bare KB count.
pub fn parse_size_kb(s: &str) -> Option<u32> {
    let s = s.trim();
    let n = u32::try_from(parse_leading_u64(s)?).ok()?;
    match s.trim_start_matches(|c: char| c.is_ascii_digit()).trim() {
        "" | "K" | "KB" => Some(n),
        "M" | "MB" => n.checked_mul(1024),
        "G" | "GB" => n.checked_mul(1024 * 1024),
        _ => None,
    }
}

/// Counts a sysfs CPU list such as `0-3,8-11` or `0`.
pub fn parse_cpu_list(s: &str) -> Option<u32> {
    let mut total = 0u32;
    for part in s.trim().split(',').filter(|p| !p.is_empty()) {
        let n = match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                hi.checked_sub(lo)? + 1
            }
            None => {
                part.trim().parse::<u32>().ok()?;
                1
            }
        };
        total = total.checked_add(n)?;
    }
    (total > 0).then_some(total)
}

/// Logical CPUs from `/proc/cpuinfo`: one `processor` entry each.
pub fn parse_logical_cores(cpuinfo: &str) -> Option<u32> {
    let n = cpuinfo
        .lines()
        .filter_map(|l| l.split_once(':'))
        .filter(|(k, _)| k.trim() == "processor")
        .count();
    u32::try_from(n).ok().filter(|&n| n > 0)
}

/// Physical cores from `/proc/cpuinfo`: distinct (package, core) pairs,
/// else `cpu cores` times the package count.
pub fn parse_physical_cores(cpuinfo: &str) -> Option<u32> {
    let mut pairs: HashSet<(u32, u32)> = HashSet::new();
    let mut packages: HashSet<u32> = HashSet::new();
    let mut cores_per_package: Option<u32> = None;

    for block in cpuinfo.split("\n\n") {
        let mut package = None;
        let mut core = None;
        for line in block.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "physical id" => package = value.parse().ok(),
                "core id" => core = value.parse().ok(),
                "cpu cores" => {
                    if let Ok(n) = value.parse::<u32>() {
                        cores_per_package = Some(n);
                    }
                }
                _ => {}
            }
        }
        if let Some(p) = package {
            packages.insert(p);
            if let Some(c) = core {
                pairs.insert((p, c));
            }
        }
    }

    if !pairs.is_empty() {
        return u32::try_from(pairs.len()).ok();
    }
    let per = cores_per_package.filter(|&n| n > 0)?;
    Some(per * u32::try_from(packages.len().max(1)).ok()?)
}

/// ARM kernels expose instruction-set flags on a `Features` line.
pub fn features_line(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|l| l.trim_start().starts_with("Features"))
        .map(|l| l.to_string())
}
