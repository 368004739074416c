pub mod error;

use el_messages::{BAUD_RATE, Command};
use embassy_sync::{
    blocking_mutex::raw::NoopRawMutex,
    channel::{Channel, Sender},
};
use esp_hal::{
    Async,
    uart::{Config, UartRx, UartTx},
};
use log::warn;
use static_cell::ConstStaticCell;

use crate::uart::error::SerialError;

/// How many host commands can wait for the sampling loop before the receiver has to wait.
pub const COMMAND_CAPACITY: usize = 4;

/// Host commands are single bytes, so a small buffer is enough to drain the RX FIFO.
pub const RX_BUFFER_SIZE: usize = 16;

/// Used for passing commands from the UART receiver to the sampling loop.
///
/// This uses `NoopRawMutex` because data is only shared in one executor.
pub static COMMAND_CHANNEL: ConstStaticCell<Channel<NoopRawMutex, Command, COMMAND_CAPACITY>> =
    ConstStaticCell::new(Channel::new());

/// 8 data bits, no parity, 1 stop bit and no flow control at [`BAUD_RATE`].
pub fn config() -> Config {
    Config::default().with_baudrate(BAUD_RATE)
}

/// Receives bytes from the host device, and sends the commands among them to the sampling loop.
///
/// Bytes that are not commands are dropped. Receive errors (e.g. FIFO overflow or framing errors
/// while the host opens the port) are logged and reception continues.
#[embassy_executor::task]
pub async fn receive_commands(
    mut rx: UartRx<'static, Async>,
    to_sampler: Sender<'static, NoopRawMutex, Command, COMMAND_CAPACITY>,
) {
    let mut buffer = [0u8; RX_BUFFER_SIZE];
    loop {
        match rx.read_async(&mut buffer).await {
            Ok(len) => {
                for command in buffer[..len].iter().copied().filter_map(Command::from_byte) {
                    if to_sampler.try_send(command).is_err() {
                        warn!(
                            "UART: Receiver has no space to send the command. Please consider increasing channel capacity."
                        );
                        to_sampler.send(command).await;
                    }
                }
            }
            Err(err) => warn!("UART: Receive error: {err:?}"),
        }
    }
}

/// Writes `line` completely, waiting for room in the TX FIFO as needed.
///
/// # Errors
/// Returns an error if the UART reports a transmit error.
pub async fn send_line(tx: &mut UartTx<'static, Async>, line: &str) -> Result<(), SerialError> {
    let mut remaining = line.as_bytes();
    while !remaining.is_empty() {
        let written = tx.write_async(remaining).await?;
        remaining = &remaining[written..];
    }
    Ok(())
}
