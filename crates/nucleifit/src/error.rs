/// Errors indicating an input-contract violation upstream of the fitter.
///
/// Per-cluster numerical failures (degenerate crops, non-converging fits)
/// are contained and never surface here; these variants mark structural
/// defects where continuing would silently corrupt results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitError {
    /// A flattened parameter vector's length is not an exact multiple of
    /// the per-blob parameter count.
    MalformedParams {
        /// Offending vector length.
        len: usize,
    },
    /// The same seed tag appeared more than once.
    DuplicateTag {
        /// Offending tag.
        tag: usize,
    },
    /// A cluster referenced a tag that matches no input seed.
    UnknownTag {
        /// Offending tag.
        tag: usize,
    },
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedParams { len } => {
                write!(
                    f,
                    "parameter vector length {} is not a multiple of {}",
                    len,
                    crate::gaussian::PARAMS_PER_BLOB
                )
            }
            Self::DuplicateTag { tag } => write!(f, "duplicate seed tag {}", tag),
            Self::UnknownTag { tag } => write!(f, "unknown seed tag {}", tag),
        }
    }
}

impl std::error::Error for FitError {}
