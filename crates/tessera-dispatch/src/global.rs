//! Optional process-wide dispatcher for code that cannot thread a
//! [`Dispatcher`] through. Written once; never replaced.

use once_cell::sync::OnceCell;
use tessera_hwprof::HardwareProfile;
use tracing::{error, warn};

use crate::dispatcher::{self, Dispatcher, ResolvedKernel};
use crate::errors::DispatchError;

static GLOBAL: OnceCell<Dispatcher> = OnceCell::new();

/// Resolves and installs the process-wide kernel. Only the first call wins.
pub fn install(profile: &HardwareProfile) -> Result<&'static ResolvedKernel, DispatchError> {
    let mut installed_now = false;
    let d = GLOBAL.get_or_init(|| {
        installed_now = true;
        dispatcher::init(profile)
    });
    if !installed_now {
        warn!("process-wide dispatcher already installed");
        return Err(DispatchError::AlreadyInitialized);
    }
    d.kernel()
}

pub fn get() -> Result<&'static ResolvedKernel, DispatchError> {
    match GLOBAL.get() {
        Some(d) => d.kernel(),
        None => {
            error!("process-wide kernel requested before install");
            Err(DispatchError::NotInitialized)
        }
    }
}

pub fn add(a: &[f32], b: &[f32], out: &mut [f32]) -> Result<(), DispatchError> {
    get()?.add(a, b, out)
}
