//! Platform-agnostic cache assembly. Providers hand over raw per-level
//! descriptors; this module folds them into [`CacheInfo`] and fills the gaps.

use crate::types::CacheInfo;

pub const DEFAULT_L1_DATA_KB: u32 = 32;
pub const DEFAULT_L1_INSTRUCTION_KB: u32 = 32;
pub const DEFAULT_L2_KB: u32 = 256;
pub const DEFAULT_LINE_BYTES: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Data,
    Instruction,
    Unified,
}

impl CacheKind {
    /// Parses sysfs `type` values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Data" => Some(Self::Data),
            "Instruction" => Some(Self::Instruction),
            "Unified" => Some(Self::Unified),
            _ => None,
        }
    }
}

/// One cache as reported by a platform source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLevel {
    pub level: u8,
    pub kind: CacheKind,
    pub size_kb: Option<u32>,
    pub line_bytes: Option<u32>,
}

/// Folds raw descriptors into a [`CacheInfo`]. Unreported fields stay `None`.
pub fn assemble(levels: &[CacheLevel]) -> CacheInfo {
    let mut info = CacheInfo::default();
    let mut l2_line = None;

    for c in levels {
        let size = c.size_kb.filter(|&s| s > 0);
        let line = c.line_bytes.filter(|&l| l > 0);
        match (c.level, c.kind) {
            (1, CacheKind::Data) => {
                info.l1_data_kb = size.or(info.l1_data_kb);
                info.line_bytes = line.or(info.line_bytes);
            }
            (1, CacheKind::Instruction) => {
                info.l1_instruction_kb = size.or(info.l1_instruction_kb);
            }
            (1, CacheKind::Unified) => {
                info.l1_data_kb = size.or(info.l1_data_kb);
                info.l1_instruction_kb = size.or(info.l1_instruction_kb);
                info.line_bytes = line.or(info.line_bytes);
            }
            (2, _) => {
                info.l2_kb = size.or(info.l2_kb);
                l2_line = line.or(l2_line);
            }
            (3, _) => {
                info.l3_kb = size.or(info.l3_kb);
            }
            _ => {}
        }
    }

    if info.line_bytes.is_none() {
        info.line_bytes = l2_line;
    }
    info
}

/// Substitutes the documented defaults. L3 has none and may stay unknown.
/// Returns the names of the fields that were defaulted.
pub fn apply_defaults(info: &mut CacheInfo) -> Vec<&'static str> {
    let mut filled = Vec::new();
    let mut fill = |slot: &mut Option<u32>, value: u32, name: &'static str| {
        if slot.is_none() {
            *slot = Some(value);
            filled.push(name);
        }
    };
    fill(&mut info.line_bytes, DEFAULT_LINE_BYTES, "line_bytes");
    fill(&mut info.l1_data_kb, DEFAULT_L1_DATA_KB, "l1_data_kb");
    fill(
        &mut info.l1_instruction_kb,
        DEFAULT_L1_INSTRUCTION_KB,
        "l1_instruction_kb",
    );
    fill(&mut info.l2_kb, DEFAULT_L2_KB, "l2_kb");
    filled
}

/// CPUID-based enumeration for hosts without a better topology source.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn cpuid_levels() -> Vec<CacheLevel> {
    use raw_cpuid::{CacheType, CpuId};

    let cpuid = CpuId::new();
    let mut out = Vec::new();

    // Deterministic cache parameters (leaf 4, Intel)
    if let Some(params) = cpuid.get_cache_parameters() {
        for p in params {
            let kind = match p.cache_type() {
                CacheType::Data => CacheKind::Data,
                CacheType::Instruction => CacheKind::Instruction,
                CacheType::Unified => CacheKind::Unified,
                _ => continue,
            };
            let bytes = p.associativity()
                * p.physical_line_partitions()
                * p.coherency_line_size()
                * p.sets();
            out.push(CacheLevel {
                level: p.level(),
                kind,
                size_kb: u32::try_from(bytes / 1024).ok(),
                line_bytes: u32::try_from(p.coherency_line_size()).ok(),
            });
        }
    }
    if !out.is_empty() {
        return out;
    }

    // AMD extended leaves 0x8000_0005 / 0x8000_0006
    if let Some(l1) = cpuid.get_l1_cache_and_tlb_info() {
        out.push(CacheLevel {
            level: 1,
            kind: CacheKind::Data,
            size_kb: Some(u32::from(l1.dcache_size())),
            line_bytes: Some(u32::from(l1.dcache_line_size())),
        });
        out.push(CacheLevel {
            level: 1,
            kind: CacheKind::Instruction,
            size_kb: Some(u32::from(l1.icache_size())),
            line_bytes: Some(u32::from(l1.icache_line_size())),
        });
    }
    if let Some(l23) = cpuid.get_l2_l3_cache_and_tlb_info() {
        out.push(CacheLevel {
            level: 2,
            kind: CacheKind::Unified,
            size_kb: Some(u32::from(l23.l2cache_size())),
            line_bytes: Some(u32::from(l23.l2cache_line_size())),
        });
        // reported in 512 KB units
        out.push(CacheLevel {
            level: 3,
            kind: CacheKind::Unified,
            size_kb: Some(u32::from(l23.l3cache_size()) * 512),
            line_bytes: Some(u32::from(l23.l3cache_line_size())),
        });
    }
    out
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn cpuid_levels() -> Vec<CacheLevel> {
    Vec::new()
}
