use serde::{Deserialize, Serialize};

/// Immutable snapshot of the host, built once by [`crate::detect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub os: String,
    pub arch: String,
    pub cpu_brand: String,

    pub cpu_features: CpuFeatures,
    pub cpu_cores: CpuCores,
    pub cache: CacheInfo,
    pub memory: MemoryInfo,
    pub gpu: GpuInfo,

    // Substituted defaults and probe notes (debug only)
    #[serde(default)]
    pub diagnostics: Option<Vec<String>>,
}

impl HardwareProfile {
    /// A host with no instruction-set extensions, one core, no GPU and the
    /// documented fallback values everywhere else.
    pub fn baseline() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_brand: "Unknown CPU".into(),
            cpu_features: CpuFeatures::default(),
            cpu_cores: CpuCores {
                physical: 1,
                logical: 1,
            },
            cache: CacheInfo {
                l1_data_kb: Some(32),
                l1_instruction_kb: Some(32),
                l2_kb: Some(256),
                l3_kb: None,
                line_bytes: Some(64),
            },
            memory: MemoryInfo { total_ram_mb: 1024 },
            gpu: GpuInfo::absent(),
            diagnostics: None,
        }
    }
}

/// Instruction-set flags. Every x86 AVX-family flag is already OS-gated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuFeatures {
    pub mmx: bool,
    pub sse: bool,
    pub sse2: bool,
    pub sse3: bool,
    pub ssse3: bool,
    pub sse4_1: bool,
    pub sse4_2: bool,
    pub fma: bool,
    pub avx: bool,
    pub avx2: bool,
    pub avx512f: bool,

    // ARM lattice
    pub neon: bool,
    pub sve: bool,
}

impl CpuFeatures {
    /// Names of the set flags, lowest tier first.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.mmx, "mmx"),
            (self.sse, "sse"),
            (self.sse2, "sse2"),
            (self.sse3, "sse3"),
            (self.ssse3, "ssse3"),
            (self.sse4_1, "sse4.1"),
            (self.sse4_2, "sse4.2"),
            (self.fma, "fma"),
            (self.avx, "avx"),
            (self.avx2, "avx2"),
            (self.avx512f, "avx512f"),
            (self.neon, "neon"),
            (self.sve, "sve"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

/// Core counts. `logical >= physical >= 1` once built by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCores {
    pub physical: u32,
    pub logical: u32,
}

/// Cache geometry. `None` means unknown; zero is never used as a placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    #[serde(default)]
    pub l1_data_kb: Option<u32>,
    #[serde(default)]
    pub l1_instruction_kb: Option<u32>,
    #[serde(default)]
    pub l2_kb: Option<u32>,
    #[serde(default)]
    pub l3_kb: Option<u32>,
    #[serde(default)]
    pub line_bytes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total_ram_mb: u64, // always > 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub present: bool,
    pub name: String,

    // None when no GPU was found; 0.x is a real tier
    #[serde(default)]
    pub compute_capability: Option<ComputeCapability>,

    #[serde(default)]
    pub driver_version: Option<String>,
    #[serde(default)]
    pub memory_mb: Option<u64>,
}

impl GpuInfo {
    pub fn absent() -> Self {
        Self {
            present: false,
            name: "Unknown".into(),
            compute_capability: None,
            driver_version: None,
            memory_mb: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputeCapability {
    pub major: u32,
    pub minor: u32,
}

impl ComputeCapability {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses `"8.6"` style strings as printed by nvidia-smi.
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.trim().split_once('.')?;
        Some(Self {
            major: major.trim().parse().ok()?,
            minor: minor.trim().parse().ok()?,
        })
    }
}

impl std::fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_capability_parses_smi_format() {
        assert_eq!(ComputeCapability::parse(" 8.6"), Some(ComputeCapability::new(8, 6)));
        assert_eq!(ComputeCapability::parse("[N/A]"), None);
        assert_eq!(ComputeCapability::parse("7"), None);
        assert!(ComputeCapability::new(7, 5) < ComputeCapability::new(8, 0));
    }

    #[test]
    fn feature_names_follow_tier_order() {
        let f = CpuFeatures {
            sse2: true,
            avx2: true,
            avx: true,
            ..Default::default()
        };
        assert_eq!(f.names(), vec!["sse2", "avx", "avx2"]);
    }

    #[test]
    fn absent_gpu_has_unknown_capability() {
        let g = GpuInfo::absent();
        assert!(!g.present);
        assert_eq!(g.compute_capability, None);
    }
}
