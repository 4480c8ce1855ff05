//! Instruction-set detection.
//!
//! On x86 a feature is reported only when CPUID advertises it *and* the OS has
//! enabled the matching XSAVE state components in XCR0. Trusting CPUID alone
//! faults on kernels that do not context-switch YMM/ZMM registers.

use crate::types::CpuFeatures;

/// XCR0 bit 1 (SSE/XMM) and bit 2 (AVX/YMM upper halves).
pub const XCR0_AVX_STATE: u64 = 0b0000_0110;
/// XCR0 bit 5 (opmask), bit 6 (ZMM_Hi256), bit 7 (Hi16_ZMM).
pub const XCR0_AVX512_STATE: u64 = 0b1110_0000;

/// Raw CPUID feature bits before OS gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct X86FeatureBits {
    // leaf 1 EDX
    pub mmx: bool,
    pub sse: bool,
    pub sse2: bool,
    // leaf 1 ECX
    pub sse3: bool,
    pub ssse3: bool,
    pub sse4_1: bool,
    pub sse4_2: bool,
    pub fma: bool,
    pub osxsave: bool,
    pub avx: bool,
    // leaf 7.0 EBX
    pub avx2: bool,
    pub avx512f: bool,
}

/// Applies OS-support gating. `xcr0` must be `None` when `osxsave` is clear.
pub fn gate_x86(bits: X86FeatureBits, xcr0: Option<u64>) -> CpuFeatures {
    let xcr0 = if bits.osxsave { xcr0.unwrap_or(0) } else { 0 };
    let os_avx = xcr0 & XCR0_AVX_STATE == XCR0_AVX_STATE;
    let os_avx512 = os_avx && xcr0 & XCR0_AVX512_STATE == XCR0_AVX512_STATE;

    CpuFeatures {
        mmx: bits.mmx,
        sse: bits.sse,
        sse2: bits.sse2,
        sse3: bits.sse3,
        ssse3: bits.ssse3,
        sse4_1: bits.sse4_1,
        sse4_2: bits.sse4_2,
        // VEX-encoded; needs YMM state like AVX
        fma: bits.fma && os_avx,
        avx: bits.avx && os_avx,
        avx2: bits.avx2 && os_avx,
        avx512f: bits.avx512f && os_avx512,
        neon: false,
        sve: false,
    }
}

/// Compile-time ARM signal.
pub fn compile_time_arm() -> CpuFeatures {
    CpuFeatures {
        neon: cfg!(target_feature = "neon"),
        sve: cfg!(target_feature = "sve"),
        ..Default::default()
    }
}

/// Refines the compile-time ARM signal with a kernel `Features` line.
/// Refinement only adds flags; with no line the base is final.
pub fn refine_arm(base: CpuFeatures, features_line: Option<&str>) -> CpuFeatures {
    let Some(line) = features_line else {
        return base;
    };
    let flags = line.split_once(':').map(|(_, v)| v).unwrap_or(line);
    let mut out = base;
    for tok in flags.split_whitespace() {
        match tok {
            "neon" | "asimd" => out.neon = true,
            "sve" => out.sve = true,
            _ => {}
        }
    }
    out
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod native {
    use super::{gate_x86, X86FeatureBits};
    use crate::types::CpuFeatures;
    use raw_cpuid::CpuId;

    #[cfg(target_arch = "x86")]
    use std::arch::x86::_xgetbv;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::_xgetbv;

    pub fn read_bits() -> X86FeatureBits {
        let cpuid = CpuId::new();
        let mut bits = X86FeatureBits::default();

        if let Some(f) = cpuid.get_feature_info() {
            bits.mmx = f.has_mmx();
            bits.sse = f.has_sse();
            bits.sse2 = f.has_sse2();
            bits.sse3 = f.has_sse3();
            bits.ssse3 = f.has_ssse3();
            bits.sse4_1 = f.has_sse41();
            bits.sse4_2 = f.has_sse42();
            bits.fma = f.has_fma();
            bits.osxsave = f.has_oxsave();
            bits.avx = f.has_avx();
        }
        if let Some(f) = cpuid.get_extended_feature_info() {
            bits.avx2 = f.has_avx2();
            bits.avx512f = f.has_avx512f();
        }
        bits
    }

    #[target_feature(enable = "xsave")]
    unsafe fn xgetbv0() -> u64 {
        _xgetbv(0)
    }

    pub fn read_xcr0(bits: &X86FeatureBits) -> Option<u64> {
        if !bits.osxsave {
            return None;
        }
        // SAFETY: OSXSAVE set means the OS enabled XGETBV.
        Some(unsafe { xgetbv0() })
    }

    pub fn detect() -> CpuFeatures {
        let bits = read_bits();
        gate_x86(bits, read_xcr0(&bits))
    }

    pub fn brand() -> Option<String> {
        let cpuid = CpuId::new();
        cpuid
            .get_processor_brand_string()
            .map(|b| b.as_str().trim().to_string())
            .filter(|b| !b.is_empty())
            .or_else(|| cpuid.get_vendor_info().map(|v| v.as_str().to_string()))
    }
}

/// Detected, OS-gated features. `features_line` feeds the ARM refinement.
pub fn detect_features(features_line: Option<&str>) -> CpuFeatures {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        let _ = features_line;
        native::detect()
    }
    #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
    {
        refine_arm(compile_time_arm(), features_line)
    }
    #[cfg(not(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64"
    )))]
    {
        let _ = features_line;
        CpuFeatures::default()
    }
}

pub fn detect_brand() -> Option<String> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        native::brand()
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avx512_cpu() -> X86FeatureBits {
        X86FeatureBits {
            mmx: true,
            sse: true,
            sse2: true,
            sse3: true,
            ssse3: true,
            sse4_1: true,
            sse4_2: true,
            fma: true,
            osxsave: true,
            avx: true,
            avx2: true,
            avx512f: true,
        }
    }

    #[test]
    fn full_xcr0_enables_everything() {
        let f = gate_x86(avx512_cpu(), Some(0xE7));
        assert!(f.avx && f.avx2 && f.fma && f.avx512f);
        assert!(f.sse2 && f.sse4_2);
    }

    #[test]
    fn os_without_ymm_state_disables_avx_family() {
        // x87 + SSE only
        let f = gate_x86(avx512_cpu(), Some(0b011));
        assert!(!f.avx);
        assert!(!f.avx2);
        assert!(!f.fma);
        assert!(!f.avx512f);
        assert!(f.sse2, "legacy SSE stays usable");
    }

    #[test]
    fn os_without_zmm_state_keeps_avx2() {
        let f = gate_x86(avx512_cpu(), Some(0b111));
        assert!(f.avx && f.avx2);
        assert!(!f.avx512f);
    }

    #[test]
    fn zmm_state_without_ymm_state_is_not_enough() {
        let f = gate_x86(avx512_cpu(), Some(0xE1));
        assert!(!f.avx512f);
    }

    #[test]
    fn osxsave_clear_ignores_xcr0() {
        let bits = X86FeatureBits {
            osxsave: false,
            ..avx512_cpu()
        };
        let f = gate_x86(bits, Some(0xE7));
        assert!(!f.avx && !f.avx2 && !f.avx512f);
    }

    #[test]
    fn cpuid_bit_required_even_with_os_support() {
        let bits = X86FeatureBits {
            avx512f: false,
            ..avx512_cpu()
        };
        assert!(!gate_x86(bits, Some(0xE7)).avx512f);
    }

    #[test]
    fn arm_refinement_adds_flags() {
        let base = CpuFeatures::default();
        let f = refine_arm(base, Some("Features\t: fp asimd evtstrm aes sve sve2"));
        assert!(f.neon);
        assert!(f.sve);
    }

    #[test]
    fn arm_refinement_matches_whole_tokens() {
        let f = refine_arm(CpuFeatures::default(), Some("Features : fp svebf16"));
        assert!(!f.sve);
        assert!(!f.neon);
    }

    #[test]
    fn arm_without_source_keeps_compile_time_signal() {
        let base = CpuFeatures {
            neon: true,
            ..Default::default()
        };
        assert_eq!(refine_arm(base, None), base);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn native_detection_agrees_with_std() {
        let f = detect_features(None);
        assert_eq!(f.sse2, is_x86_feature_detected!("sse2"));
        assert_eq!(f.avx, is_x86_feature_detected!("avx"));
        assert_eq!(f.avx2, is_x86_feature_detected!("avx2"));
        assert_eq!(f.avx512f, is_x86_feature_detected!("avx512f"));
    }
}
