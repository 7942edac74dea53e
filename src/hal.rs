//! Hardware capability interface
//!
//! The stream controller never touches registers. Everything it needs
//! from the USART peripheral and the DMA engine is expressed by the
//! [`UsartDma`] trait: peripheral configuration, channel setup and
//! teardown, and asynchronous segment transfers with a completion
//! callback. HAL authors implement this trait for their parts; tests
//! implement it with a host-side mock.

use crate::{config::Parity, Result};

/// Transfer direction reported to the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// A transmit segment finished
    Transmit,
    /// A receive segment finished
    Receive,
}

/// Completion callback registered with the capability
///
/// A plain function pointer plus an opaque context, so the capability can
/// store and invoke it from interrupt context without knowing the
/// stream's concrete type.
#[derive(Clone, Copy)]
pub struct CompletionCallback {
    func: unsafe fn(*const (), Direction),
    context: *const (),
}

impl CompletionCallback {
    pub(crate) fn new(func: unsafe fn(*const (), Direction), context: *const ()) -> Self {
        CompletionCallback { func, context }
    }

    /// Report a finished segment on `direction`'s channel.
    ///
    /// # Safety
    ///
    /// May only be invoked under the contract documented on [`UsartDma`]:
    /// after a successful `register_callback`, before the channel is
    /// disabled, exactly once per completed segment, and never re-entered
    /// for the same channel.
    pub unsafe fn complete(&self, direction: Direction) {
        (self.func)(self.context, direction)
    }
}

// The context points at a pinned stream that remains valid for as long
// as the registration is live; see the `UsartDma` contract.
unsafe impl Send for CompletionCallback {}
unsafe impl Sync for CompletionCallback {}

/// The USART peripheral and DMA engine, as one opaque capability
///
/// Channel numbers and request signals used below come from the stream's
/// [`Config`](crate::Config).
///
/// # Safety
///
/// Implementations must uphold the completion contract the stream's
/// transfer protocol relies on:
///
/// - [`start_transfer`](Self::start_transfer) begins an asynchronous
///   transfer and returns without blocking. The source bytes are only
///   read until the segment's completion is reported.
/// - The registered [`CompletionCallback`] is invoked exactly once per
///   completed segment, and never for a segment that was not started.
/// - The callback is not re-entered for the same channel: a new
///   completion for a channel is only delivered after the previous
///   invocation for that channel returned.
/// - No callback is invoked before [`register_callback`](Self::register_callback)
///   succeeds, or after the channel is disabled or the peripheral
///   deinitialized.
pub unsafe trait UsartDma {
    /// Opaque binding between a DMA channel and its descriptor state,
    /// created by [`create_channel_handle`](Self::create_channel_handle)
    type Handle: Copy + Send + Sync;

    /// Largest byte count one transfer descriptor can move
    ///
    /// Must be non-zero.
    const MAX_TRANSFER_LEN: usize;

    /// Apply baud rate and parity, and enable the transmitter and
    /// receiver.
    fn configure(&self, source_clock_hz: u32, baud_rate: u32, parity: Parity) -> Result<()>;

    /// Undo [`configure`](Self::configure), returning the peripheral to
    /// its reset state.
    fn deinit(&self);

    /// Route a DMA request signal through the input mux.
    fn enable_request_signal(&self, signal: u32);

    /// Enable a DMA channel.
    fn enable_channel(&self, channel: u32);

    /// Disable a DMA channel, preventing further transfers and
    /// completion callbacks for it.
    fn disable_channel(&self, channel: u32);

    /// Create the per-channel handle consumed by
    /// [`start_transfer`](Self::start_transfer).
    fn create_channel_handle(&self, channel: u32) -> Self::Handle;

    /// Bind `callback` to the completion events of both channels.
    fn register_callback(
        &self,
        tx: Self::Handle,
        rx: Self::Handle,
        callback: CompletionCallback,
    ) -> Result<()>;

    /// Begin an asynchronous transfer of `len` bytes starting at `src`.
    fn start_transfer(&self, handle: Self::Handle, src: *const u8, len: usize);
}
