//! Human-readable profile dump. The layout is for people and logs; do not parse it.

use std::fmt;

use crate::advice::{thread_advice, ThreadAdvice};
use crate::types::{ComputeCapability, HardwareProfile};

const RULE: &str = "====================================================";
const TENSOR_CORE_MIN_CAPABILITY: ComputeCapability = ComputeCapability::new(6, 0);

pub struct ProfileReport<'a> {
    profile: &'a HardwareProfile,
}

impl<'a> ProfileReport<'a> {
    pub fn new(profile: &'a HardwareProfile) -> Self {
        Self { profile }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

fn kb_or_mb(kb: Option<u32>) -> String {
    match kb {
        Some(kb) if kb >= 1024 => format!("{:.1} MB", f64::from(kb) / 1024.0),
        Some(kb) if kb > 0 => format!("{kb} KB"),
        _ => "Unknown".into(),
    }
}

/// Best vector extension to target, as a display name.
pub fn vectorization_hint(p: &HardwareProfile) -> &'static str {
    let f = &p.cpu_features;
    if f.avx512f {
        "AVX-512"
    } else if f.avx2 {
        "AVX2"
    } else if f.avx {
        "AVX"
    } else if f.sse4_2 {
        "SSE4.2"
    } else if f.sse2 {
        "SSE2"
    } else if f.sve {
        "SVE"
    } else if f.neon {
        "NEON"
    } else {
        "scalar code"
    }
}

impl fmt::Display for ProfileReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.profile;
        let c = &p.cache;

        writeln!(f, "{RULE}")?;
        writeln!(f, "            HARDWARE PROFILE SUMMARY")?;
        writeln!(f, "{RULE}")?;

        writeln!(f, "\n=== CPU INFORMATION ===")?;
        writeln!(f, "Processor:      {}", p.cpu_brand)?;
        writeln!(f, "Platform:       {}/{}", p.os, p.arch)?;
        writeln!(f, "Physical cores: {}", p.cpu_cores.physical)?;
        writeln!(f, "Logical cores:  {}", p.cpu_cores.logical)?;

        writeln!(f, "\n=== CPU INSTRUCTION SETS ===")?;
        let x = &p.cpu_features;
        for (label, on) in [
            ("MMX", x.mmx),
            ("SSE", x.sse),
            ("SSE2", x.sse2),
            ("SSE3", x.sse3),
            ("SSSE3", x.ssse3),
            ("SSE4.1", x.sse4_1),
            ("SSE4.2", x.sse4_2),
            ("AVX", x.avx),
            ("AVX2", x.avx2),
            ("AVX-512F", x.avx512f),
            ("FMA", x.fma),
            ("NEON", x.neon),
            ("SVE", x.sve),
        ] {
            writeln!(f, "{:<10}{}", format!("{label}:"), yes_no(on))?;
        }

        writeln!(f, "\n=== CACHE INFORMATION ===")?;
        writeln!(f, "L1 Data:        {}", kb_or_mb(c.l1_data_kb))?;
        writeln!(f, "L1 Instruction: {}", kb_or_mb(c.l1_instruction_kb))?;
        writeln!(f, "L2:             {}", kb_or_mb(c.l2_kb))?;
        writeln!(f, "L3:             {}", kb_or_mb(c.l3_kb))?;
        match c.line_bytes {
            Some(b) => writeln!(f, "Cache Line:     {b} bytes")?,
            None => writeln!(f, "Cache Line:     Unknown")?,
        }

        writeln!(f, "\n=== MEMORY INFORMATION ===")?;
        writeln!(
            f,
            "Total RAM:      {} MB ({:.1} GB)",
            p.memory.total_ram_mb,
            p.memory.total_ram_mb as f64 / 1024.0
        )?;

        writeln!(f, "\n=== GPU INFORMATION ===")?;
        if p.gpu.present {
            writeln!(f, "CUDA GPU:       Yes")?;
            writeln!(f, "GPU Name:       {}", p.gpu.name)?;
            match p.gpu.compute_capability {
                Some(cc) => writeln!(f, "Compute:        {cc}")?,
                None => writeln!(f, "Compute:        Unknown")?,
            }
            if let Some(v) = &p.gpu.driver_version {
                writeln!(f, "Driver:         {v}")?;
            }
            if let Some(mb) = p.gpu.memory_mb {
                writeln!(f, "GPU Memory:     {mb} MB")?;
            }
        } else {
            writeln!(f, "CUDA GPU:       No")?;
        }

        writeln!(f, "\n=== OPTIMIZATION RECOMMENDATIONS ===")?;
        match vectorization_hint(p) {
            "scalar code" => writeln!(f, "Vectorization:  Use scalar code")?,
            isa => writeln!(f, "Vectorization:  Use {isa}")?,
        }
        match thread_advice(p.cpu_cores.logical, p.cpu_cores.physical) {
            ThreadAdvice::Split {
                compute_bound,
                memory_bound,
            } => {
                writeln!(f, "Threading:      Use {compute_bound} threads for compute-bound tasks")?;
                writeln!(f, "                Use {memory_bound} threads for memory-bound tasks")?;
            }
            ThreadAdvice::Pooled(n) => writeln!(f, "Threading:      Use thread pool with {n} threads")?,
            ThreadAdvice::Serial { .. } => {
                writeln!(f, "Threading:      Limited benefit, focus on vectorization")?
            }
        }
        match c.line_bytes {
            Some(b) => writeln!(f, "Memory:         Align data to {b}-byte boundaries")?,
            None => writeln!(f, "Memory:         Use 64-byte alignment (default cache line)")?,
        }
        if let Some(l1) = c.l1_data_kb.filter(|&k| k > 0) {
            writeln!(f, "                Use cache blocking ~{} KB for L1", l1 / 2)?;
        }
        if p.gpu.present {
            writeln!(f, "GPU:            Consider offloading compute-intensive tasks to GPU")?;
            if p
                .gpu
                .compute_capability
                .is_some_and(|cc| cc >= TENSOR_CORE_MIN_CAPABILITY)
            {
                writeln!(f, "                Use Tensor Cores for matrix operations (if supported)")?;
            }
        }
        write!(f, "{RULE}")
    }
}
