use std::sync::Arc;

use anyhow::{bail, Result};
use tessera_hwprof::detect::cache::CacheLevel;
use tessera_hwprof::{
    detect, detect_with, ComputeCapability, GpuInfo, GpuQuery, HardwareProfile, NativePlatform,
    PlatformProvider, ProbeConfig,
};

/// Provider that cannot answer anything.
struct NullPlatform;

impl PlatformProvider for NullPlatform {
    fn name(&self) -> &'static str {
        "null"
    }
    fn logical_cores(&self) -> Option<u32> {
        None
    }
    fn physical_cores(&self) -> Option<u32> {
        None
    }
    fn cache_levels(&self) -> Vec<CacheLevel> {
        Vec::new()
    }
    fn total_ram_bytes(&self) -> Option<u64> {
        None
    }
}

struct FakeGpu(Option<GpuInfo>);

impl GpuQuery for FakeGpu {
    fn name(&self) -> &'static str {
        "fake"
    }
    fn query(&self) -> Result<Option<GpuInfo>> {
        Ok(self.0.clone())
    }
}

struct BrokenGpu;

impl GpuQuery for BrokenGpu {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn query(&self) -> Result<Option<GpuInfo>> {
        bail!("driver exploded")
    }
}

#[test]
fn detect_satisfies_profile_invariants() {
    let p = detect();
    assert!(p.cpu_cores.physical >= 1);
    assert!(p.cpu_cores.logical >= p.cpu_cores.physical);
    assert!(p.memory.total_ram_mb > 0);
    if !p.gpu.present {
        assert_eq!(p.gpu.compute_capability, None);
    }
    #[cfg(target_arch = "x86_64")]
    assert!(p.cpu_features.sse2);
}

#[test]
fn repeated_probes_agree() {
    let cfg = ProbeConfig::default();
    let a = detect_with(&NativePlatform::default(), &[], &cfg);
    let b = detect_with(&NativePlatform::default(), &[], &cfg);
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn detect_is_idempotent() {
    let mut a = detect();
    let mut b = detect();
    // GPU sources are external processes with timeouts
    a.gpu = b.gpu.clone();
    a.diagnostics = None;
    b.diagnostics = None;
    assert_eq!(a, b);
}

#[test]
fn nothing_detectable_gives_the_floor() {
    let cfg = ProbeConfig {
        debug: true,
        ..Default::default()
    };
    let p = detect_with(&NullPlatform, &[], &cfg);

    assert_eq!(p.cpu_cores.physical, 1);
    assert_eq!(p.cpu_cores.logical, 1);
    assert_eq!(p.cache.l1_data_kb, Some(32));
    assert_eq!(p.cache.l1_instruction_kb, Some(32));
    assert_eq!(p.cache.l2_kb, Some(256));
    assert_eq!(p.cache.l3_kb, None);
    assert_eq!(p.cache.line_bytes, Some(64));
    assert_eq!(p.memory.total_ram_mb, 1024);
    assert!(!p.gpu.present);

    let diags = p.diagnostics.expect("debug config attaches diagnostics");
    assert!(diags.iter().any(|d| d.contains("total RAM unknown")));
}

#[test]
fn diagnostics_only_with_debug() {
    let p = detect_with(&NullPlatform, &[], &ProbeConfig::default());
    assert_eq!(p.diagnostics, None);
}

#[test]
fn gpu_chain_first_hit_wins() {
    let found = GpuInfo {
        present: false,
        name: "NVIDIA Fake".into(),
        compute_capability: Some(ComputeCapability::new(8, 6)),
        driver_version: Some("555.42".into()),
        memory_mb: Some(24576),
    };
    let chain: Vec<Arc<dyn GpuQuery>> = vec![
        Arc::new(BrokenGpu),
        Arc::new(FakeGpu(None)),
        Arc::new(FakeGpu(Some(found))),
    ];
    let p = detect_with(&NullPlatform, &chain, &ProbeConfig::default());
    assert!(p.gpu.present);
    assert_eq!(p.gpu.name, "NVIDIA Fake");
    assert_eq!(p.gpu.compute_capability, Some(ComputeCapability::new(8, 6)));
}

#[test]
fn gpu_without_capability_gets_fallback() {
    let found = GpuInfo {
        name: "NVIDIA Mystery".into(),
        ..GpuInfo::absent()
    };
    let chain: Vec<Arc<dyn GpuQuery>> = vec![Arc::new(FakeGpu(Some(found)))];
    let p = detect_with(&NullPlatform, &chain, &ProbeConfig::default());
    assert!(p.gpu.present);
    assert_eq!(p.gpu.compute_capability, Some(ComputeCapability::new(1, 0)));
}

#[test]
fn gpu_chain_disabled_by_config() {
    let chain: Vec<Arc<dyn GpuQuery>> = vec![Arc::new(FakeGpu(Some(GpuInfo::absent())))];
    let cfg = ProbeConfig {
        disabled: vec!["gpu".into()],
        ..Default::default()
    };
    let p = detect_with(&NullPlatform, &chain, &cfg);
    assert!(!p.gpu.present);
}

#[test]
fn profile_survives_json() {
    let mut p = HardwareProfile::baseline();
    p.gpu.present = true;
    p.gpu.compute_capability = Some(ComputeCapability::new(7, 5));
    let text = serde_json::to_string(&p).unwrap();
    let back: HardwareProfile = serde_json::from_str(&text).unwrap();
    assert_eq!(p, back);
}

#[cfg(target_os = "linux")]
mod linux_fixture {
    use std::fs;
    use std::path::Path;

    use tessera_hwprof::detect::LinuxPlatform;
    use tessera_hwprof::{detect_with, ProbeConfig};

    fn cache_index(root: &Path, idx: u32, level: &str, kind: &str, size: &str) {
        let dir = root.join(format!("devices/system/cpu/cpu0/cache/index{idx}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("level"), format!("{level}\n")).unwrap();
        fs::write(dir.join("type"), format!("{kind}\n")).unwrap();
        fs::write(dir.join("size"), format!("{size}\n")).unwrap();
        fs::write(dir.join("coherency_line_size"), "64\n").unwrap();
    }

    #[test]
    fn reads_sysfs_and_procfs() {
        let tmp = tempfile::tempdir().unwrap();
        let sys = tmp.path().join("sys");
        let proc_ = tmp.path().join("proc");
        fs::create_dir_all(&proc_).unwrap();

        cache_index(&sys, 0, "1", "Data", "48K");
        cache_index(&sys, 1, "1", "Instruction", "32K");
        cache_index(&sys, 2, "2", "Unified", "2048K");
        cache_index(&sys, 3, "3", "Unified", "30M");
        fs::write(
            proc_.join("cpuinfo"),
            "processor : 0\nphysical id : 0\ncore id : 0\n\n\
             processor : 1\nphysical id : 0\ncore id : 1\n\n\
             processor : 2\nphysical id : 0\ncore id : 0\n",
        )
        .unwrap();

        let platform = LinuxPlatform::with_roots(&sys, &proc_);
        let p = detect_with(&platform, &[], &ProbeConfig::default());

        assert_eq!(p.cache.l1_data_kb, Some(48));
        assert_eq!(p.cache.l1_instruction_kb, Some(32));
        assert_eq!(p.cache.l2_kb, Some(2048));
        assert_eq!(p.cache.l3_kb, Some(30 * 1024));
        assert_eq!(p.cache.line_bytes, Some(64));
        assert_eq!(p.cpu_cores.physical, 2);
        assert_eq!(p.cpu_cores.logical, 3);
    }

    fn smt_cpuinfo(cores: u32, threads_per_core: u32) -> String {
        let mut text = String::new();
        for cpu in 0..cores * threads_per_core {
            text.push_str(&format!(
                "processor : {cpu}\nphysical id : 0\ncore id : {}\ncpu cores : {cores}\n\n",
                cpu % cores
            ));
        }
        text
    }

    #[test]
    fn host_counts_share_one_scope() {
        let tmp = tempfile::tempdir().unwrap();
        let sys = tmp.path().join("sys");
        let proc_ = tmp.path().join("proc");
        fs::create_dir_all(&sys).unwrap();
        fs::create_dir_all(&proc_).unwrap();
        fs::write(proc_.join("cpuinfo"), smt_cpuinfo(16, 2)).unwrap();

        let platform = LinuxPlatform::with_roots(&sys, &proc_);
        let p = detect_with(&platform, &[], &ProbeConfig::default());
        assert_eq!(p.cpu_cores.physical, 16);
        assert_eq!(p.cpu_cores.logical, 32);
    }

    #[test]
    fn sysfs_online_list_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let sys = tmp.path().join("sys");
        let proc_ = tmp.path().join("proc");
        fs::create_dir_all(sys.join("devices/system/cpu")).unwrap();
        fs::create_dir_all(&proc_).unwrap();
        fs::write(sys.join("devices/system/cpu/online"), "0-7\n").unwrap();
        fs::write(proc_.join("cpuinfo"), smt_cpuinfo(4, 2)).unwrap();

        let platform = LinuxPlatform::with_roots(&sys, &proc_);
        let p = detect_with(&platform, &[], &ProbeConfig::default());
        assert_eq!(p.cpu_cores.physical, 4);
        assert_eq!(p.cpu_cores.logical, 8);
    }
}
