use tessera_hwprof::HardwareProfile;
use tracing::{error, info};

use crate::catalog::{KernelCatalog, KernelDescriptor};
use crate::errors::DispatchError;
use crate::kernels::AddFn;
use crate::tier::Tier;

/// The variant chosen for one profile. Fixed until the owning dispatcher is
/// re-initialized.
#[derive(Debug, Clone)]
pub struct ResolvedKernel {
    tier: Tier,
    name: &'static str,
    entry: AddFn,
    fingerprint: String,
}

impl ResolvedKernel {
    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fingerprint of the profile this kernel was resolved from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Raw entry point. Writes the common prefix of the three slices.
    pub fn entry(&self) -> AddFn {
        self.entry
    }

    /// `out[i] = a[i] + b[i]`; all three slices must have the same length.
    pub fn add(&self, a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), DispatchError> {
        if a.len() != out.len() || b.len() != out.len() {
            return Err(DispatchError::LengthMismatch {
                a: a.len(),
                b: b.len(),
                out: out.len(),
            });
        }
        (self.entry)(a, b, out);
        Ok(())
    }
}

/// Best-first scan: the first descriptor whose tier the profile satisfies,
/// else the catalog's scalar variant.
pub fn select(profile: &HardwareProfile, catalog: &KernelCatalog) -> ResolvedKernel {
    let chosen: &KernelDescriptor = catalog
        .descriptors()
        .iter()
        .find(|d| d.tier.is_satisfied_by(&profile.cpu_features))
        .unwrap_or_else(|| catalog.scalar());

    let fingerprint = profile.fingerprint();
    info!(
        tier = %chosen.tier,
        kernel = chosen.name,
        fingerprint = %&fingerprint[..12],
        "selected add kernel"
    );

    ResolvedKernel {
        tier: chosen.tier,
        name: chosen.name,
        entry: chosen.entry,
        fingerprint,
    }
}

/// Caller-owned binding from a catalog to the kernel for one profile.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: KernelCatalog,
    resolved: Option<ResolvedKernel>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Uninitialized, over the built-in add catalog.
    pub fn new() -> Self {
        Self::with_catalog(KernelCatalog::builtin_add())
    }

    pub fn with_catalog(catalog: KernelCatalog) -> Self {
        Self {
            catalog,
            resolved: None,
        }
    }

    /// Resolves against `profile`, replacing any earlier binding.
    pub fn init(&mut self, profile: &HardwareProfile) -> &ResolvedKernel {
        self.resolved.insert(select(profile, &self.catalog))
    }

    pub fn is_initialized(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn kernel(&self) -> Result<&ResolvedKernel, DispatchError> {
        self.resolved.as_ref().ok_or_else(|| {
            error!("add kernel requested before dispatcher init");
            DispatchError::NotInitialized
        })
    }

    pub fn add(&self, a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), DispatchError> {
        self.kernel()?.add(a, b, out)
    }
}

/// A dispatcher already initialized for `profile`.
pub fn init(profile: &HardwareProfile) -> Dispatcher {
    let mut d = Dispatcher::new();
    d.init(profile);
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubled(a: &[f32], b: &[f32], out: &mut [f32]) {
        for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
            *o = 2.0 * (x + y);
        }
    }

    fn fake_catalog() -> KernelCatalog {
        KernelCatalog::new(vec![
            KernelDescriptor::new(Tier::Scalar, "scalar", crate::kernels::scalar::add),
            KernelDescriptor::new(Tier::Sse2, "fake-sse2", doubled),
        ])
        .unwrap()
    }

    #[test]
    fn falls_to_scalar_without_features() {
        let k = select(&HardwareProfile::baseline(), &fake_catalog());
        assert_eq!(k.tier(), Tier::Scalar);
        assert_eq!(k.name(), "scalar");
    }

    #[test]
    fn picks_satisfied_tier() {
        let mut p = HardwareProfile::baseline();
        p.cpu_features.sse2 = true;
        let k = select(&p, &fake_catalog());
        assert_eq!(k.name(), "fake-sse2");

        let mut out = [0.0; 2];
        k.add(&[1.0, 2.0], &[1.0, 1.0], &mut out).unwrap();
        assert_eq!(out, [4.0, 6.0]);

        // raw entry writes the common prefix without a length check
        let mut out = [0.0; 3];
        (k.entry())(&[1.0, 2.0, 3.0], &[1.0, 1.0], &mut out);
        assert_eq!(out, [4.0, 6.0, 0.0]);
    }

    #[test]
    fn reinit_replaces_binding() {
        let mut d = Dispatcher::with_catalog(fake_catalog());
        let mut p = HardwareProfile::baseline();
        assert_eq!(d.init(&p).tier(), Tier::Scalar);
        p.cpu_features.sse2 = true;
        assert_eq!(d.init(&p).tier(), Tier::Sse2);
        assert_eq!(d.kernel().unwrap().fingerprint(), p.fingerprint());
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let d = init(&HardwareProfile::baseline());
        let mut out = [0.0; 3];
        assert_eq!(
            d.add(&[1.0; 3], &[1.0; 2], &mut out),
            Err(DispatchError::LengthMismatch { a: 3, b: 2, out: 3 })
        );
    }
}
