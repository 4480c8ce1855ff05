use crate::errors::CatalogError;
use crate::kernels::{self, AddFn};
use crate::tier::Tier;

#[derive(Debug, Clone, Copy)]
pub struct KernelDescriptor {
    pub tier: Tier,
    pub name: &'static str,
    pub entry: AddFn,
}

impl KernelDescriptor {
    pub const fn new(tier: Tier, name: &'static str, entry: AddFn) -> Self {
        Self { tier, name, entry }
    }
}

/// Variants of one operation, most capable first. Holds exactly one scalar
/// descriptor, so selection over it is total.
#[derive(Debug, Clone)]
pub struct KernelCatalog {
    descriptors: Vec<KernelDescriptor>,
    scalar: KernelDescriptor,
}

impl KernelCatalog {
    pub fn new(mut descriptors: Vec<KernelDescriptor>) -> Result<Self, CatalogError> {
        let mut scalars = descriptors.iter().filter(|d| d.tier == Tier::Scalar);
        let scalar = *scalars.next().ok_or(CatalogError::MissingScalar)?;
        let extra = scalars.count();
        if extra > 0 {
            return Err(CatalogError::DuplicateScalar(extra + 1));
        }
        // stable: equal ranks keep registration order
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.tier.rank()));
        Ok(Self {
            descriptors,
            scalar,
        })
    }

    /// Element-wise `f32` add, with every variant compiled for this target.
    pub fn builtin_add() -> Self {
        let scalar = KernelDescriptor::new(Tier::Scalar, "scalar", kernels::scalar::add);
        let mut descriptors = Vec::new();

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            use kernels::x86;
            descriptors.push(KernelDescriptor::new(Tier::Avx512, "avx512f", x86::add_avx512));
            descriptors.push(KernelDescriptor::new(Tier::Avx2, "avx2", x86::add_avx2));
            descriptors.push(KernelDescriptor::new(Tier::Avx, "avx", x86::add_avx));
            descriptors.push(KernelDescriptor::new(Tier::Sse2, "sse2", x86::add_sse2));
        }
        #[cfg(target_arch = "aarch64")]
        descriptors.push(KernelDescriptor::new(Tier::Neon, "neon", kernels::neon::add_neon));

        descriptors.push(scalar);
        Self {
            descriptors,
            scalar,
        }
    }

    pub fn descriptors(&self) -> &[KernelDescriptor] {
        &self.descriptors
    }

    pub fn scalar(&self) -> &KernelDescriptor {
        &self.scalar
    }
}
