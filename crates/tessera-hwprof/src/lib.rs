//! Tessera hardware profiling crate.
//! Probes CPU features, topology, caches, RAM and CUDA GPUs into a
//! [`HardwareProfile`], and derives bandwidth and blocking advice from it.

pub mod advice;
pub mod bandwidth;
pub mod config;
pub mod detect;
pub mod fingerprint;
pub mod report;
pub mod types;

pub use advice::{advise, BlockSizes, BlockingAdvice, ThreadAdvice};
pub use bandwidth::{estimate, estimate_with, Bandwidth, BandwidthConfig, Shortfall};
pub use config::ProbeConfig;
pub use detect::gpu::{default_gpu_queries, GpuQuery};
pub use detect::{detect, detect_with, NativePlatform, PlatformProvider};
pub use fingerprint::fingerprint;
pub use report::ProfileReport;
pub use types::{
    CacheInfo, ComputeCapability, CpuCores, CpuFeatures, GpuInfo, HardwareProfile, MemoryInfo,
};
