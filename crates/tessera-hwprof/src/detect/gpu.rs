#![allow(non_snake_case)]

//! CUDA GPU discovery. Each source sits behind [`GpuQuery`] so the chain can
//! be replaced wholesale (tests use fakes). First source to report a device
//! wins; errors, timeouts and empty answers fall through to the next one.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use libloading::{Library, Symbol};
use tracing::{debug, warn};

use super::util::{self, run_command};
use crate::config::ProbeConfig;
use crate::types::{ComputeCapability, GpuInfo};

/// Assumed tier for a device that is present but would not say.
pub const FALLBACK_COMPUTE_CAPABILITY: ComputeCapability = ComputeCapability::new(1, 0);

pub trait GpuQuery: Send + Sync {
    /// Short lowercase name, also used by `TESSERA_HWPROF_DISABLE_<NAME>`.
    fn name(&self) -> &'static str;

    /// `Ok(None)` means the source works but saw no CUDA device.
    fn query(&self) -> Result<Option<GpuInfo>>;
}

/// The chain used by [`crate::detect`].
pub fn default_gpu_queries() -> Vec<Arc<dyn GpuQuery>> {
    let mut chain: Vec<Arc<dyn GpuQuery>> =
        vec![Arc::new(CudaDriverQuery), Arc::new(NvidiaSmiQuery)];
    if cfg!(target_os = "linux") {
        chain.push(Arc::new(LspciQuery));
    }
    chain
}

/// Walks `queries` in order. Never fails; returns notes for diagnostics.
pub fn probe_gpu(queries: &[Arc<dyn GpuQuery>], cfg: &ProbeConfig) -> (GpuInfo, Vec<String>) {
    let mut diags = Vec::new();

    for q in queries {
        let name = q.name();
        if cfg.is_disabled(name) {
            diags.push(format!("[gpu:{name}] disabled by env"));
            continue;
        }
        let worker = Arc::clone(q);
        let (out, reason, ms) = util::with_timeout(name, cfg.timeout, move || worker.query());
        debug!(query = name, elapsed_ms = ms, "gpu query finished");
        match out {
            Some(Ok(Some(info))) => {
                let mut info = info;
                info.present = true;
                if info.compute_capability.is_none() {
                    diags.push(format!(
                        "[gpu:{name}] compute capability unknown, assuming {FALLBACK_COMPUTE_CAPABILITY}"
                    ));
                    info.compute_capability = Some(FALLBACK_COMPUTE_CAPABILITY);
                }
                return (info, diags);
            }
            Some(Ok(None)) => diags.push(format!("[gpu:{name}] no device")),
            Some(Err(e)) => diags.push(format!("[gpu:{name}] error: {e:#}")),
            None => {
                let reason = reason.unwrap_or_else(|| "timeout".into());
                warn!(query = name, %reason, "gpu query timed out");
                diags.push(format!("[gpu:{name}] {reason}"));
            }
        }
    }

    (GpuInfo::absent(), diags)
}

// --- CUDA (driver API, dlopen) ---
#[allow(non_camel_case_types)]
type CuInit = unsafe extern "C" fn(u32) -> i32;
#[allow(non_camel_case_types)]
type CuDevCnt = unsafe extern "C" fn(*mut i32) -> i32;
#[allow(non_camel_case_types)]
type CuDrvVer = unsafe extern "C" fn(*mut i32) -> i32;
#[allow(non_camel_case_types)]
type CuDevGet = unsafe extern "C" fn(*mut i32, i32) -> i32;
#[allow(non_camel_case_types)]
type CuDevGetName = unsafe extern "C" fn(*mut std::ffi::c_char, i32, i32) -> i32;
#[allow(non_camel_case_types)]
type CuDevGetAttr = unsafe extern "C" fn(*mut i32, i32, i32) -> i32;
#[allow(non_camel_case_types)]
type CuDevTotalMem = unsafe extern "C" fn(*mut usize, i32) -> i32;

const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR: i32 = 75;
const CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR: i32 = 76;

#[cfg(target_os = "windows")]
const CUDA_CANDIDATES: &[&str] = &["nvcuda.dll"];
#[cfg(not(target_os = "windows"))]
const CUDA_CANDIDATES: &[&str] = &["libcuda.so.1", "libcuda.so"];

/// Device 0 through the CUDA driver library, if one can be loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CudaDriverQuery;

impl GpuQuery for CudaDriverQuery {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn query(&self) -> Result<Option<GpuInfo>> {
        let mut last_err = None;
        for name in CUDA_CANDIDATES {
            // SAFETY: loading the vendor driver runs its initializers only.
            match unsafe { Library::new(name) } {
                Ok(lib) => return unsafe { cuda_device0(&lib) },
                Err(e) => last_err = Some(anyhow!(e)),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("No CUDA driver library found")))
    }
}

unsafe fn cuda_device0(lib: &Library) -> Result<Option<GpuInfo>> {
    let cuInit: Symbol<CuInit> = lib.get(b"cuInit").context("get cuInit")?;
    let cuDeviceGetCount: Symbol<CuDevCnt> = lib
        .get(b"cuDeviceGetCount")
        .context("get cuDeviceGetCount")?;
    let cuDeviceGet: Symbol<CuDevGet> = lib.get(b"cuDeviceGet").context("get cuDeviceGet")?;
    let cuDeviceGetName: Symbol<CuDevGetName> = lib
        .get(b"cuDeviceGetName")
        .context("get cuDeviceGetName")?;
    let cuDeviceGetAttribute: Symbol<CuDevGetAttr> = lib
        .get(b"cuDeviceGetAttribute")
        .context("get cuDeviceGetAttribute")?;

    if cuInit(0) != 0 {
        return Err(anyhow!("cuInit failed"));
    }
    let mut cnt = 0i32;
    if cuDeviceGetCount(&mut cnt as *mut i32) != 0 {
        return Err(anyhow!("cuDeviceGetCount failed"));
    }
    if cnt <= 0 {
        return Ok(None);
    }

    let mut dev = 0i32;
    if cuDeviceGet(&mut dev as *mut i32, 0) != 0 {
        return Err(anyhow!("cuDeviceGet failed"));
    }

    let mut buf = [0 as std::ffi::c_char; 256];
    let name = if cuDeviceGetName(buf.as_mut_ptr(), buf.len() as i32, dev) == 0 {
        cstr_to_string(&buf)
    } else {
        "NVIDIA GPU".to_string()
    };

    let mut major = -1i32;
    let mut minor = -1i32;
    let cc_ok = cuDeviceGetAttribute(
        &mut major as *mut i32,
        CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR,
        dev,
    ) == 0
        && cuDeviceGetAttribute(
            &mut minor as *mut i32,
            CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR,
            dev,
        ) == 0;
    let compute_capability = (cc_ok && major >= 0 && minor >= 0)
        .then(|| ComputeCapability::new(major as u32, minor as u32));

    // Optional symbols
    let driver_version = lib
        .get::<CuDrvVer>(b"cuDriverGetVersion")
        .ok()
        .and_then(|f| {
            let mut ver = 0i32;
            (f(&mut ver as *mut i32) == 0)
                .then_some(ver)
                .and_then(ver_string)
        });
    let memory_mb = lib
        .get::<CuDevTotalMem>(b"cuDeviceTotalMem_v2")
        .ok()
        .and_then(|f| {
            let mut bytes = 0usize;
            (f(&mut bytes as *mut usize, dev) == 0 && bytes > 0)
                .then(|| bytes as u64 / (1024 * 1024))
        });

    Ok(Some(GpuInfo {
        present: true,
        name,
        compute_capability,
        driver_version,
        memory_mb,
    }))
}

fn ver_string(v: i32) -> Option<String> {
    if v <= 0 {
        return None;
    }
    let major = v / 1000;
    let minor = (v % 1000) / 10;
    Some(format!("{major}.{minor}"))
}

fn cstr_to_string(arr: &[std::ffi::c_char]) -> String {
    let bytes = arr
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| *b as u8)
        .collect::<Vec<_>>();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

// --- nvidia-smi ---

/// Asks `nvidia-smi` for the first device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NvidiaSmiQuery;

impl GpuQuery for NvidiaSmiQuery {
    fn name(&self) -> &'static str {
        "nvidia_smi"
    }

    fn query(&self) -> Result<Option<GpuInfo>> {
        let out = run_command(
            "nvidia-smi",
            &[
                "--query-gpu=name,driver_version,compute_cap,memory.total",
                "--format=csv,noheader,nounits",
            ],
        )?;
        Ok(parse_nvidia_smi(&out))
    }
}

/// First CSV row of `name, driver_version, compute_cap, memory.total`.
pub fn parse_nvidia_smi(out: &str) -> Option<GpuInfo> {
    let line = out.lines().map(str::trim).find(|l| !l.is_empty())?;
    let mut fields = line.split(',').map(str::trim);
    let name = fields.next().filter(|n| !n.is_empty())?.to_string();
    let driver_version = fields
        .next()
        .filter(|v| !v.is_empty() && !v.starts_with('['))
        .map(String::from);
    let compute_capability = fields.next().and_then(ComputeCapability::parse);
    let memory_mb = fields.next().and_then(|m| m.parse::<u64>().ok());
    Some(GpuInfo {
        present: true,
        name,
        compute_capability,
        driver_version,
        memory_mb,
    })
}

// --- lspci ---

/// Scans the PCI bus listing for an NVIDIA display controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct LspciQuery;

impl GpuQuery for LspciQuery {
    fn name(&self) -> &'static str {
        "lspci"
    }

    fn query(&self) -> Result<Option<GpuInfo>> {
        Ok(parse_lspci(&run_command("lspci", &[])?))
    }
}

pub fn parse_lspci(out: &str) -> Option<GpuInfo> {
    let line = out.lines().find(|l| {
        let lower = l.to_ascii_lowercase();
        lower.contains("nvidia")
            && (lower.contains("vga")
                || lower.contains("3d controller")
                || lower.contains("display controller"))
    })?;
    let start = line.find("NVIDIA").unwrap_or(0);
    Some(GpuInfo {
        present: true,
        name: line[start..].trim().to_string(),
        compute_capability: None,
        driver_version: None,
        memory_mb: None,
    })
}
