//! SSE2 / AVX / AVX2 / AVX-512F variants. Loads and stores are unaligned; the
//! remainder after the last full vector goes through the scalar loop.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{common_len, scalar};

pub fn add_sse2(a: &[f32], b: &[f32], out: &mut [f32]) {
    if is_x86_feature_detected!("sse2") {
        // SAFETY: sse2 confirmed at runtime.
        unsafe { add_sse2_impl(a, b, out) }
    } else {
        scalar::add(a, b, out)
    }
}

pub fn add_avx(a: &[f32], b: &[f32], out: &mut [f32]) {
    if is_x86_feature_detected!("avx") {
        // SAFETY: avx confirmed at runtime.
        unsafe { add_avx_impl(a, b, out) }
    } else {
        add_sse2(a, b, out)
    }
}

pub fn add_avx2(a: &[f32], b: &[f32], out: &mut [f32]) {
    if is_x86_feature_detected!("avx2") {
        // SAFETY: avx2 confirmed at runtime.
        unsafe { add_avx2_impl(a, b, out) }
    } else {
        add_avx(a, b, out)
    }
}

pub fn add_avx512(a: &[f32], b: &[f32], out: &mut [f32]) {
    if is_x86_feature_detected!("avx512f") {
        // SAFETY: avx512f confirmed at runtime.
        unsafe { add_avx512_impl(a, b, out) }
    } else {
        add_avx2(a, b, out)
    }
}

#[target_feature(enable = "sse2")]
unsafe fn add_sse2_impl(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = common_len(a, b, out);
    let (pa, pb, po) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    let mut i = 0;
    while i + 4 <= n {
        let v = _mm_add_ps(_mm_loadu_ps(pa.add(i)), _mm_loadu_ps(pb.add(i)));
        _mm_storeu_ps(po.add(i), v);
        i += 4;
    }
    scalar::add(&a[i..n], &b[i..n], &mut out[i..n]);
}

#[target_feature(enable = "avx")]
unsafe fn add_avx_impl(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = common_len(a, b, out);
    let (pa, pb, po) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    let mut i = 0;
    while i + 8 <= n {
        let v = _mm256_add_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)));
        _mm256_storeu_ps(po.add(i), v);
        i += 8;
    }
    scalar::add(&a[i..n], &b[i..n], &mut out[i..n]);
}

// Two 256-bit lanes per iteration; a single-lane pass picks up the next 8.
#[target_feature(enable = "avx2")]
unsafe fn add_avx2_impl(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = common_len(a, b, out);
    let (pa, pb, po) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    let mut i = 0;
    while i + 16 <= n {
        let v0 = _mm256_add_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)));
        let v1 = _mm256_add_ps(_mm256_loadu_ps(pa.add(i + 8)), _mm256_loadu_ps(pb.add(i + 8)));
        _mm256_storeu_ps(po.add(i), v0);
        _mm256_storeu_ps(po.add(i + 8), v1);
        i += 16;
    }
    if i + 8 <= n {
        let v = _mm256_add_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)));
        _mm256_storeu_ps(po.add(i), v);
        i += 8;
    }
    scalar::add(&a[i..n], &b[i..n], &mut out[i..n]);
}

#[target_feature(enable = "avx512f")]
unsafe fn add_avx512_impl(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = common_len(a, b, out);
    let (pa, pb, po) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    let mut i = 0;
    while i + 16 <= n {
        let v = _mm512_add_ps(_mm512_loadu_ps(pa.add(i)), _mm512_loadu_ps(pb.add(i)));
        _mm512_storeu_ps(po.add(i), v);
        i += 16;
    }
    scalar::add(&a[i..n], &b[i..n], &mut out[i..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::AddFn;

    fn check(kernel: AddFn) {
        for n in [0usize, 1, 3, 4, 7, 8, 15, 16, 17, 31, 33, 100] {
            let a: Vec<f32> = (0..n).map(|i| i as f32).collect();
            let b: Vec<f32> = (0..n).map(|i| 0.5 * i as f32).collect();
            let mut got = vec![0.0; n];
            let mut want = vec![0.0; n];
            kernel(&a, &b, &mut got);
            scalar::add(&a, &b, &mut want);
            assert_eq!(got, want, "n = {n}");
        }
    }

    #[test]
    fn every_width_matches_scalar() {
        check(add_sse2);
        check(add_avx);
        check(add_avx2);
        check(add_avx512);
    }

    #[test]
    fn short_output_bounds_the_write() {
        let a = [1.0f32; 20];
        let b = [2.0f32; 20];
        let mut out = [0.0f32; 10];
        add_avx512(&a, &b, &mut out);
        assert_eq!(out, [3.0; 10]);
    }
}
