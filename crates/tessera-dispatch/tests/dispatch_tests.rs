use tessera_dispatch::{init, DispatchError, Dispatcher, Tier};
use tessera_hwprof::{detect, CpuFeatures, HardwareProfile};

fn profile_with(features: CpuFeatures) -> HardwareProfile {
    let mut p = HardwareProfile::baseline();
    p.cpu_features = features;
    p
}

#[test]
fn avx2_host_adds_4097_elements() {
    let p = profile_with(CpuFeatures {
        sse: true,
        sse2: true,
        avx: true,
        avx2: true,
        avx512f: false,
        ..Default::default()
    });
    let d = init(&p);
    let k = d.kernel().unwrap();
    #[cfg(target_arch = "x86_64")]
    assert_eq!(k.tier(), Tier::Avx2);

    let a = vec![1.0f32; 4097];
    let b = vec![2.0f32; 4097];
    let mut out = vec![0.0f32; 4097];
    k.add(&a, &b, &mut out).unwrap();
    assert!(out.iter().all(|&v| v == 3.0));
}

#[cfg(target_arch = "x86_64")]
#[test]
fn avx512_never_resolves_below_avx2() {
    let p = profile_with(CpuFeatures {
        sse2: true,
        avx: true,
        avx2: true,
        avx512f: true,
        ..Default::default()
    });
    let tier = init(&p).kernel().unwrap().tier();
    assert!(tier.rank() >= Tier::Avx2.rank(), "got {tier}");

    // an overstated profile still runs
    let mut out = [0.0f32; 33];
    init(&p).add(&[1.0; 33], &[1.0; 33], &mut out).unwrap();
    assert_eq!(out, [2.0; 33]);
}

#[test]
fn no_features_resolves_scalar() {
    let d = init(&HardwareProfile::baseline());
    assert_eq!(d.kernel().unwrap().tier(), Tier::Scalar);
}

#[test]
fn selection_is_idempotent() {
    let p = detect();
    let first = init(&p);
    let second = init(&p);
    let (a, b) = (first.kernel().unwrap(), second.kernel().unwrap());
    assert_eq!(a.tier(), b.tier());
    assert_eq!(a.name(), b.name());
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn kernel_before_init_is_an_error() {
    let d = Dispatcher::new();
    assert!(!d.is_initialized());
    assert_eq!(d.kernel().unwrap_err(), DispatchError::NotInitialized);

    let mut out = [0.0f32; 1];
    assert_eq!(
        d.add(&[1.0], &[1.0], &mut out),
        Err(DispatchError::NotInitialized)
    );
}

#[test]
fn empty_input_is_fine() {
    let d = init(&detect());
    let mut out: [f32; 0] = [];
    d.add(&[], &[], &mut out).unwrap();
}
