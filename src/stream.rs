//! USART DMA stream controller

use crate::{
    config::Config,
    hal::{CompletionCallback, Direction, UsartDma},
    sync::{Notification, WriteLock},
    Error, Result,
};

use core::{cell::RefCell, marker::PhantomPinned, pin::Pin};

use critical_section::Mutex;

/// Length of the next transfer segment
///
/// Pure chunking policy: a segment covers the remaining bytes, capped at
/// the capability's descriptor limit.
const fn segment_len(remaining: usize, max_transfer: usize) -> usize {
    if remaining < max_transfer {
        remaining
    } else {
        max_transfer
    }
}

/// Transmit bookkeeping shared with the completion context
///
/// Thread context touches this record before triggering a segment and
/// after being woken; the completion context touches it only inside the
/// handler. Each touch happens under a critical section.
struct TxTransfer<Hd> {
    /// Channel handle, created at init and cleared at deinit
    handle: Option<Hd>,
    /// Caller's buffer, valid only while a write is in flight
    data: *const u8,
    len: usize,
    /// Byte offset of the next segment; monotonic within one write
    cursor: usize,
    /// Length of the segment currently on the wire
    in_flight: usize,
}

// The data pointer is only dereferenced by the DMA engine, and it never
// outlives the blocking write call that stored it.
unsafe impl<Hd: Send> Send for TxTransfer<Hd> {}

struct TxState<Hd> {
    busy: WriteLock,
    done: Notification,
    transfer: Mutex<RefCell<TxTransfer<Hd>>>,
}

/// A byte stream over a USART peripheral, transferred by DMA
///
/// Writes of arbitrary size are split into descriptor-sized segments;
/// the completion interrupt re-arms the next segment until the buffer is
/// exhausted, then wakes the blocked caller. At most one write may be in
/// flight; a concurrent write fails fast with
/// [`Error::FailedPrecondition`].
///
/// # Example
///
/// ```no_run
/// use usart_dma_stream::{Config, Parity, Result, UsartDmaStream};
/// # struct Hal;
/// # unsafe impl usart_dma_stream::UsartDma for Hal {
/// #     type Handle = u32;
/// #     const MAX_TRANSFER_LEN: usize = 512;
/// #     fn configure(&self, _: u32, _: u32, _: Parity) -> Result<()> { Ok(()) }
/// #     fn deinit(&self) {}
/// #     fn enable_request_signal(&self, _: u32) {}
/// #     fn enable_channel(&self, _: u32) {}
/// #     fn disable_channel(&self, _: u32) {}
/// #     fn create_channel_handle(&self, channel: u32) -> u32 { channel }
/// #     fn register_callback(
/// #         &self,
/// #         _: u32,
/// #         _: u32,
/// #         _: usart_dma_stream::CompletionCallback,
/// #     ) -> Result<()> { Ok(()) }
/// #     fn start_transfer(&self, _: u32, _: *const u8, _: usize) {}
/// # }
/// # fn hal() -> Hal { Hal }
/// # fn run() -> Result<()> {
/// let config = Config {
///     baud_rate: 115_200,
///     parity: Parity::None,
///     tx_channel: 7,
///     rx_channel: 8,
///     tx_request_signal: 10,
///     rx_request_signal: 11,
/// };
///
/// let mut stream = core::pin::pin!(UsartDmaStream::new(hal(), config));
/// stream.as_mut().init(24_000_000)?;
/// stream.as_ref().get_ref().write(b"hello over DMA")?;
/// # Ok(()) }
/// ```
pub struct UsartDmaStream<H: UsartDma> {
    hal: H,
    config: Config,
    tx: TxState<H::Handle>,
    initialized: bool,
    _pinned: PhantomPinned,
}

impl<H: UsartDma> UsartDmaStream<H> {
    /// Creates an uninitialized stream over `hal`.
    ///
    /// The stream is inert until pinned and [`init`](Self::init)ialized.
    pub fn new(hal: H, config: Config) -> Self {
        UsartDmaStream {
            hal,
            config,
            tx: TxState {
                busy: WriteLock::new(),
                done: Notification::new(),
                transfer: Mutex::new(RefCell::new(TxTransfer {
                    handle: None,
                    data: core::ptr::null(),
                    len: 0,
                    cursor: 0,
                    in_flight: 0,
                })),
            },
            initialized: false,
            _pinned: PhantomPinned,
        }
    }

    /// Initializes the peripheral and both DMA channels.
    ///
    /// Fails with [`Error::InvalidArgument`] if `source_clock_hz` or the
    /// configured baud rate is zero, and with [`Error::Internal`] if the
    /// capability rejects the peripheral configuration or the callback
    /// registration. A failed init leaves the stream uninitialized and
    /// safe to retry.
    pub fn init(self: Pin<&mut Self>, source_clock_hz: u32) -> Result<()> {
        // Safety: nothing is moved out of the pinned stream.
        let this = unsafe { self.get_unchecked_mut() };

        if source_clock_hz == 0 || this.config.baud_rate == 0 {
            return Err(Error::InvalidArgument);
        }

        this.hal
            .configure(source_clock_hz, this.config.baud_rate, this.config.parity)
            .map_err(|_| Error::Internal)?;

        // Channel and request-mux registers are shared across unrelated
        // peripheral instances. Update them without preemption so another
        // instance's setup cannot interleave a read-modify-write.
        let (tx_handle, rx_handle) = critical_section::with(|cs| {
            this.hal
                .enable_request_signal(this.config.rx_request_signal);
            this.hal
                .enable_request_signal(this.config.tx_request_signal);

            this.hal.enable_channel(this.config.tx_channel);
            this.hal.enable_channel(this.config.rx_channel);

            let tx_handle = this.hal.create_channel_handle(this.config.tx_channel);
            let rx_handle = this.hal.create_channel_handle(this.config.rx_channel);
            this.tx.transfer.borrow(cs).borrow_mut().handle = Some(tx_handle);
            (tx_handle, rx_handle)
        });

        // The stream is pinned, so the context pointer stays valid until
        // drop tears the registration down.
        let callback =
            CompletionCallback::new(Self::completion, this as *const Self as *const ());
        if this
            .hal
            .register_callback(tx_handle, rx_handle, callback)
            .is_err()
        {
            this.teardown();
            return Err(Error::Internal);
        }

        this.initialized = true;
        Ok(())
    }

    /// Disables both DMA channels and deinitializes the peripheral.
    ///
    /// Idempotent: a second call, or a drop after this call, issues no
    /// further capability calls.
    pub fn deinit(self: Pin<&mut Self>) {
        // Safety: nothing is moved out of the pinned stream.
        let this = unsafe { self.get_unchecked_mut() };
        if !this.initialized {
            return;
        }
        this.initialized = false;
        this.teardown();
    }

    /// Sends `data` over the USART, blocking until the last byte is
    /// handed to the wire.
    ///
    /// Fails with [`Error::InvalidArgument`] on an empty buffer and with
    /// [`Error::FailedPrecondition`] if another write is in flight; the
    /// contended call returns immediately rather than queueing.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidArgument);
        }

        // Sole admission gate: at most one write in flight.
        let _guard = self
            .tx
            .busy
            .try_acquire()
            .ok_or(Error::FailedPrecondition)?;

        let (handle, src, len) = critical_section::with(|cs| {
            let transfer = self.tx.transfer.borrow(cs);
            let mut transfer = transfer.borrow_mut();
            if transfer.handle.is_none() {
                // Init never completed, or the stream was deinitialized.
                return Err(Error::FailedPrecondition);
            }
            transfer.data = data.as_ptr();
            transfer.len = data.len();
            transfer.cursor = 0;
            Ok(Self::stage_segment(&mut transfer))
        })?;
        self.hal.start_transfer(handle, src, len);

        // Block until the completion context reports the final segment.
        // The buffer pointer shared above cannot outlive this call.
        self.tx.done.acquire();

        Ok(())
    }

    /// Reads up to `data.len()` bytes.
    ///
    /// The receive path performs no DMA-backed reception yet: the call
    /// only honors the length accounting of the request and moves no
    /// data. Do not rely on the buffer contents.
    pub fn read(&self, data: &mut [u8]) -> Result<usize> {
        Ok(data.len())
    }

    /// Stages the next segment of the in-flight write.
    ///
    /// Records the segment length so the completion handler can advance
    /// the cursor by exactly what was sent.
    fn stage_segment(transfer: &mut TxTransfer<H::Handle>) -> (H::Handle, *const u8, usize) {
        let remaining = transfer.len - transfer.cursor;
        let len = segment_len(remaining, H::MAX_TRANSFER_LEN);
        transfer.in_flight = len;
        // Safety: cursor never exceeds the buffer length, so the offset
        // stays within the caller's allocation.
        let src = unsafe { transfer.data.add(transfer.cursor) };
        match transfer.handle {
            Some(handle) => (handle, src, len),
            None => unreachable!("segment staged before channel setup"),
        }
    }

    /// Completion trampoline handed to the capability.
    ///
    /// # Safety
    ///
    /// `context` must be the pointer registered by [`init`](Self::init),
    /// invoked under the [`UsartDma`] completion contract.
    unsafe fn completion(context: *const (), direction: Direction) {
        let stream = &*(context as *const Self);
        if direction == Direction::Transmit {
            stream.on_tx_complete();
        }
    }

    /// Handles one transmit segment completion, in interrupt context.
    ///
    /// Explicit transition of the write state machine: segment done, and
    /// either the buffer is exhausted (wake the writer) or the next
    /// segment is triggered from right here, without a round trip
    /// through thread context.
    fn on_tx_complete(&self) {
        let next = critical_section::with(|cs| {
            let transfer = self.tx.transfer.borrow(cs);
            let mut transfer = transfer.borrow_mut();
            transfer.cursor += transfer.in_flight;
            transfer.in_flight = 0;
            if transfer.cursor == transfer.len {
                None
            } else {
                // An overrun is a contract breach in the completion
                // accounting, not a recoverable runtime condition.
                assert!(
                    transfer.cursor < transfer.len,
                    "transmit cursor overran the write buffer"
                );
                Some(Self::stage_segment(&mut transfer))
            }
        });

        match next {
            // The write request is satisfied; wake the blocked writer.
            None => self.tx.done.release(),
            Some((handle, src, len)) => self.hal.start_transfer(handle, src, len),
        }
    }

    /// Channel and peripheral teardown shared by deinit, drop, and the
    /// init rollback path.
    fn teardown(&self) {
        // Same register-sharing window as setup.
        critical_section::with(|cs| {
            self.hal.disable_channel(self.config.tx_channel);
            self.hal.disable_channel(self.config.rx_channel);
            self.tx.transfer.borrow(cs).borrow_mut().handle = None;
        });
        self.hal.deinit();
    }
}

impl<H: UsartDma> Drop for UsartDmaStream<H> {
    fn drop(&mut self) {
        // A stream that never reached init skips teardown.
        if self.initialized {
            self.initialized = false;
            self.teardown();
        }
    }
}

/// Byte-sink adapter implementing [`embedded_io::Write`]
///
/// Created by [`UsartDmaStream::writer`]. A write through the adapter
/// blocks until the full buffer is on the wire, so `flush` has nothing
/// left to do.
#[cfg(feature = "embedded-io")]
pub struct Writer<'a, H: UsartDma>(&'a UsartDmaStream<H>);

#[cfg(feature = "embedded-io")]
impl<H: UsartDma> UsartDmaStream<H> {
    /// Borrows the transmit path as an [`embedded_io::Write`] sink.
    pub fn writer(&self) -> Writer<'_, H> {
        Writer(self)
    }
}

#[cfg(feature = "embedded-io")]
impl<H: UsartDma> embedded_io::ErrorType for Writer<'_, H> {
    type Error = Error;
}

#[cfg(feature = "embedded-io")]
impl<H: UsartDma> embedded_io::Write for Writer<'_, H> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.0.write(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::segment_len;

    #[test]
    fn segment_len_caps_at_descriptor_limit() {
        assert_eq!(segment_len(10, 64), 10);
        assert_eq!(segment_len(64, 64), 64);
        assert_eq!(segment_len(150, 64), 64);
    }

    #[test]
    fn segment_sequence_covers_buffer() {
        for (len, max) in [(150, 64), (1, 64), (64, 64), (65, 64), (1024, 64), (5, 1)] {
            let mut cursor = 0;
            let mut count = 0;
            while cursor < len {
                let segment = segment_len(len - cursor, max);
                assert!(segment > 0);
                assert!(segment <= max);
                cursor += segment;
                count += 1;
            }
            assert_eq!(cursor, len);
            assert_eq!(count, len.div_ceil(max));
        }
    }
}
