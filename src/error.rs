use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between declaring an asset and holding its
/// native handle.
///
/// Terminal failures are cached on the asset and replayed verbatim to every
/// later `load()` call, so the whole taxonomy is `Clone`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The byte source cannot resolve the name.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The byte source resolved the name but reading it failed.
    #[error("reading {name}: {message}")]
    Io { name: String, message: String },

    /// The backend rejected the raw bytes as malformed or unsupported.
    #[error("backend rejected {name}: {reason}")]
    Decode { name: String, reason: String },

    /// The backend refused a downstream operation on a live handle.
    #[error("rendering {name}: {reason}")]
    Render { name: String, reason: String },

    /// Declaring this asset would close a loop in the dependency graph.
    #[error("asset dependency cycle through {0}")]
    CycleDetected(String),

    /// The asset was accessed after its handle had been released.
    #[error("asset {0} used after disposal")]
    UseAfterDispose(String),

    /// A chained upstream asset reached `Failed`; production of the
    /// dependent was never attempted.
    #[error("upstream asset {name} failed: {cause}")]
    Upstream { name: String, cause: Box<Error> },
}

impl Error {
    pub(crate) fn upstream(name: impl Into<String>, cause: Error) -> Self {
        Error::Upstream {
            name: name.into(),
            cause: Box::new(cause),
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}
