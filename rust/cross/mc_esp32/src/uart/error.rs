use esp_hal::uart::TxError;

#[derive(Debug)]
pub enum SerialError {
    /// The UART refused to transmit.
    TxError(TxError),
    /// A telemetry line did not fit its buffer.
    LineTooLong,
}

impl From<TxError> for SerialError {
    fn from(value: TxError) -> Self {
        SerialError::TxError(value)
    }
}

impl From<core::fmt::Error> for SerialError {
    fn from(_: core::fmt::Error) -> Self {
        SerialError::LineTooLong
    }
}
