//! Stream errors

use core::fmt::{self, Display};

/// An error from a stream operation
///
/// `FailedPrecondition` from a write is expected, recoverable contention
/// signaling: another write owns the transmit channel, and the caller may
/// retry once it completes. The other variants report misuse or a fault
/// in the underlying peripheral setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A malformed configuration or request: zero source clock or baud
    /// rate at initialization, or an empty write
    InvalidArgument,
    /// Another write is already in flight, or the stream was never
    /// initialized
    FailedPrecondition,
    /// The underlying peripheral or DMA setup failed
    Internal,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::FailedPrecondition => f.write_str("failed precondition"),
            Error::Internal => f.write_str("internal peripheral or DMA failure"),
        }
    }
}

#[cfg(feature = "embedded-io")]
impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::InvalidArgument => embedded_io::ErrorKind::InvalidInput,
            Error::FailedPrecondition | Error::Internal => embedded_io::ErrorKind::Other,
        }
    }
}
