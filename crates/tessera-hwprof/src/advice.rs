//! Cache-aware blocking and threading advice for matrix-style kernels.
//! Advisory only; nothing here executes work.

use serde::Serialize;

use crate::types::{ComputeCapability, HardwareProfile};

/// A, B and C tiles live in the cache together.
pub const WORKING_SET_FACTOR: u64 = 3;
pub const ELEMENT_BYTES: u64 = std::mem::size_of::<f32>() as u64;

/// Matrices above this edge are worth offloading to a capable GPU.
pub const GPU_OFFLOAD_MIN_EDGE: u32 = 2048;
pub const GPU_OFFLOAD_MIN_CAPABILITY: ComputeCapability = ComputeCapability::new(3, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockSizes {
    /// Square tile edge (elements) sized for L1 data.
    pub l1: u32,
    /// Square tile edge (elements) sized for L2.
    pub l2: u32,
    /// Both edges are whole multiples of the cache-line element count.
    /// False when the line size is unknown or a cache is too small for one
    /// line-aligned edge.
    pub aligned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThreadAdvice {
    /// Large hosts: compute-bound work scales to SMT siblings, memory-bound
    /// work does not.
    Split { compute_bound: u32, memory_bound: u32 },
    Pooled(u32),
    /// Too few cores to pay for threading; vectorize instead.
    Serial { logical: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockingAdvice {
    /// `None` when cache sizes are unknown.
    pub blocks: Option<BlockSizes>,
    pub threads: ThreadAdvice,
    pub gpu_offload: bool,
}

pub fn advise(profile: &HardwareProfile) -> BlockingAdvice {
    let cache = &profile.cache;
    let known = |kb: Option<u32>| kb.filter(|&k| k > 0);

    let blocks = match (known(cache.l1_data_kb), known(cache.l2_kb)) {
        (Some(l1), Some(l2)) => {
            let line_elems = cache
                .line_bytes
                .map(|b| u64::from(b) / ELEMENT_BYTES)
                .unwrap_or(0);
            let l1 = block_edge(l1, line_elems);
            let l2 = block_edge(l2, line_elems);
            let aligned = line_elems > 0
                && u64::from(l1) % line_elems == 0
                && u64::from(l2) % line_elems == 0;
            Some(BlockSizes { l1, l2, aligned })
        }
        _ => None,
    };

    BlockingAdvice {
        blocks,
        threads: thread_advice(profile.cpu_cores.logical, profile.cpu_cores.physical),
        gpu_offload: profile.gpu.present
            && profile
                .gpu
                .compute_capability
                .is_some_and(|cc| cc >= GPU_OFFLOAD_MIN_CAPABILITY),
    }
}

/// `floor(sqrt(bytes / (3 * 4)))`, rounded down to whole cache lines when
/// that leaves something.
pub fn block_edge(cache_kb: u32, line_elems: u64) -> u32 {
    let bytes = u64::from(cache_kb) * 1024;
    let edge = ((bytes / (WORKING_SET_FACTOR * ELEMENT_BYTES)) as f64).sqrt() as u64;
    let aligned = if line_elems > 0 {
        edge / line_elems * line_elems
    } else {
        edge
    };
    let edge = if aligned > 0 { aligned } else { edge };
    u32::try_from(edge).unwrap_or(u32::MAX)
}

pub fn thread_advice(logical: u32, physical: u32) -> ThreadAdvice {
    match logical {
        16.. => ThreadAdvice::Split {
            compute_bound: logical,
            memory_bound: physical,
        },
        4..=15 => ThreadAdvice::Pooled(logical),
        _ => ThreadAdvice::Serial { logical },
    }
}
