use std::arch::aarch64::*;
use std::arch::is_aarch64_feature_detected;

use super::{common_len, scalar};

pub fn add_neon(a: &[f32], b: &[f32], out: &mut [f32]) {
    if is_aarch64_feature_detected!("neon") {
        // SAFETY: neon confirmed at runtime.
        unsafe { add_neon_impl(a, b, out) }
    } else {
        scalar::add(a, b, out)
    }
}

#[target_feature(enable = "neon")]
unsafe fn add_neon_impl(a: &[f32], b: &[f32], out: &mut [f32]) {
    let n = common_len(a, b, out);
    let (pa, pb, po) = (a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    let mut i = 0;
    while i + 4 <= n {
        vst1q_f32(po.add(i), vaddq_f32(vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i))));
        i += 4;
    }
    scalar::add(&a[i..n], &b[i..n], &mut out[i..n]);
}
