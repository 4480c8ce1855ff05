use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("kernel requested before the dispatcher was initialized")]
    NotInitialized,

    #[error("process-wide dispatcher is already installed")]
    AlreadyInitialized,

    #[error("length mismatch: a={a}, b={b}, out={out}")]
    LengthMismatch { a: usize, b: usize, out: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no scalar variant")]
    MissingScalar,

    #[error("catalog has {0} scalar variants, expected exactly one")]
    DuplicateScalar(usize),
}
