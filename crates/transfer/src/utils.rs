//! Utility macros used across the crate.

/// A macro for early returns with an error if a condition is not met.
///
/// Like `assert!`, but returns the error instead of panicking.
///
/// ```ignore
/// ensure!(sent == declared, SendError::content_length_mismatch(declared, sent));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
