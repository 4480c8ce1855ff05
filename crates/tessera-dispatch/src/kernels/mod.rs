//! `out[i] = a[i] + b[i]` variants. Every entry point is a safe function that
//! writes the first `min(a.len(), b.len(), out.len())` elements, handles any
//! length including shorter than its vector width, and falls back to a lower
//! variant when the host lacks its instruction set.

pub mod scalar;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod x86;

#[cfg(target_arch = "aarch64")]
pub mod neon;

pub type AddFn = fn(&[f32], &[f32], &mut [f32]);

#[inline]
fn common_len(a: &[f32], b: &[f32], out: &[f32]) -> usize {
    out.len().min(a.len()).min(b.len())
}
