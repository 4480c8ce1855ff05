//! Tessera kernel dispatch.
//! Resolves the best compiled variant of an operation for a
//! [`tessera_hwprof::HardwareProfile`] and exposes it behind one entry point.

pub mod catalog;
pub mod dispatcher;
pub mod errors;
pub mod global;
pub mod kernels;
pub mod tier;

pub use catalog::{KernelCatalog, KernelDescriptor};
pub use dispatcher::{init, select, Dispatcher, ResolvedKernel};
pub use errors::{CatalogError, DispatchError};
pub use kernels::AddFn;
pub use tier::{Family, Tier};
