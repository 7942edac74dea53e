//! DMA-backed USART stream driver
//!
//! `usart-dma-stream` moves byte buffers over a USART peripheral using a
//! DMA engine instead of per-byte interrupts. The driver
//!
//! - splits buffers larger than one transfer descriptor into
//!   hardware-sized segments, and re-arms the next segment directly from
//!   the completion interrupt so large writes never round-trip through
//!   thread context between segments
//! - serializes writers with an atomic try-acquire busy flag: a second
//!   concurrent write fails fast with [`Error::FailedPrecondition`]
//!   instead of queueing
//! - treats the hardware below it as an opaque [`UsartDma`] capability,
//!   so the same transfer protocol runs against any vendor HAL, or
//!   against a host-side mock in tests
//!
//! A write blocks its caller until the final segment completes. The
//! bridge from interrupt context back to the blocked caller is a
//! single-slot notification released exactly once per write.
//!
//! # Pinning
//!
//! [`UsartDmaStream::init`] registers a completion callback with the
//! capability that refers back to the stream. The stream must therefore
//! be pinned before initialization, and it stays pinned until drop.
//!
//! ### License
//!
//! Licensed under either of
//!
//! - [Apache License, Version 2.0](http://www.apache.org/licenses/LICENSE-2.0) ([LICENSE-APACHE](./LICENSE-APACHE))
//! - [MIT License](http://opensource.org/licenses/MIT) ([LICENSE-MIT](./LICENSE-MIT))
//!
//! at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted
//! for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
//! dual licensed as above, without any additional terms or conditions.

#![no_std]

mod config;
mod error;
pub mod hal;
mod stream;
mod sync;

pub use config::{Config, Parity};
pub use error::Error;
pub use hal::{CompletionCallback, Direction, UsartDma};
#[cfg(feature = "embedded-io")]
pub use stream::Writer;
pub use stream::UsartDmaStream;

/// A stream result
pub type Result<T> = core::result::Result<T, Error>;
