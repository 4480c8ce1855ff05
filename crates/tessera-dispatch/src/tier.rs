use std::fmt;

use tessera_hwprof::CpuFeatures;

/// Instruction-set requirement of a kernel variant. x86 and ARM are separate
/// lattices that share the scalar floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Scalar,
    Sse2,
    Avx,
    Avx2,
    Avx512,
    Neon,
    Sve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Generic,
    X86,
    Arm,
}

impl Tier {
    /// Position within its lattice; scalar is 0 everywhere.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Scalar => 0,
            Tier::Sse2 | Tier::Neon => 1,
            Tier::Avx | Tier::Sve => 2,
            Tier::Avx2 => 3,
            Tier::Avx512 => 4,
        }
    }

    pub fn family(self) -> Family {
        match self {
            Tier::Scalar => Family::Generic,
            Tier::Sse2 | Tier::Avx | Tier::Avx2 | Tier::Avx512 => Family::X86,
            Tier::Neon | Tier::Sve => Family::Arm,
        }
    }

    pub fn is_satisfied_by(self, f: &CpuFeatures) -> bool {
        match self {
            Tier::Scalar => true,
            Tier::Sse2 => f.sse2,
            Tier::Avx => f.avx,
            Tier::Avx2 => f.avx2,
            Tier::Avx512 => f.avx512f,
            Tier::Neon => f.neon,
            Tier::Sve => f.sve,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Scalar => "scalar",
            Tier::Sse2 => "sse2",
            Tier::Avx => "avx",
            Tier::Avx2 => "avx2",
            Tier::Avx512 => "avx512f",
            Tier::Neon => "neon",
            Tier::Sve => "sve",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_always_satisfied() {
        assert!(Tier::Scalar.is_satisfied_by(&CpuFeatures::default()));
        assert!(!Tier::Sse2.is_satisfied_by(&CpuFeatures::default()));
    }

    #[test]
    fn x86_lattice_is_ordered() {
        let ranks: Vec<u8> = [Tier::Scalar, Tier::Sse2, Tier::Avx, Tier::Avx2, Tier::Avx512]
            .into_iter()
            .map(Tier::rank)
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
        assert!(Tier::Neon.rank() < Tier::Sve.rank());
        assert_eq!(Tier::Sve.family(), Family::Arm);
    }
}
