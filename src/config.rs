//! Stream configuration

/// USART parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    /// No parity bit
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// USART DMA stream configuration
///
/// Immutable once the stream is constructed. [`init`](crate::UsartDmaStream::init)
/// rejects a zero `baud_rate` with [`Error::InvalidArgument`](crate::Error::InvalidArgument).
///
/// The channel numbers and request signals must match the routing your
/// hardware expects; consult the reference manual for your part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Desired communication speed
    pub baud_rate: u32,
    /// Parity setting
    pub parity: Parity,
    /// Transmit DMA channel
    pub tx_channel: u32,
    /// Receive DMA channel
    pub rx_channel: u32,
    /// Request-mux signal routing transmit DMA requests to `tx_channel`
    pub tx_request_signal: u32,
    /// Request-mux signal routing receive DMA requests to `rx_channel`
    pub rx_request_signal: u32,
}
