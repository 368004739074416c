use std::{fmt, time::Duration};

use bytes::{Buf, BytesMut};
use color_eyre::{
    Result,
    eyre::{OptionExt, WrapErr, eyre},
};
use el_messages::{Command, ParseError, Report};
use futures::{FutureExt, StreamExt};
use ratatui::crossterm::event::Event as CrosstermEvent;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

pub const READ_BUFFER_SIZE: usize = 4096;
/// Longest line accepted from the MCU. Anything longer is noise and is thrown away.
pub const MAX_LINE_LEN: usize = 256;
/// How often the screen is redrawn while data is streaming in.
pub const TICK_PERIOD: Duration = Duration::from_millis(200);
pub const RETRY_PERIOD: Duration = Duration::from_secs(1);

/// Representation of all possible events.
#[derive(Clone, Debug)]
pub enum TuiEvent {
    /// Crossterm events such as keyboard inputs.
    ///
    /// These events are emitted by the terminal.
    Crossterm(CrosstermEvent),
    /// A telemetry line from the MCU.
    Report(Report),
    /// Any other line the MCU printed, such as boot or panic output.
    Console(String),
    /// The serial link closed or failed. Nothing more will be received from the MCU.
    Disconnected(String),
    /// Time to redraw.
    Tick,
}

/// Opens the serial port, retrying until the device shows up.
///
/// Bytes already waiting in the input buffer are discarded.
pub async fn open_serial(port: &str, baud_rate: u32) -> SerialStream {
    loop {
        match tokio_serial::new(port, baud_rate).open_native_async() {
            Ok(mut stream) => {
                // Let the board finish resetting before dropping what it printed.
                tokio::time::sleep(RETRY_PERIOD).await;
                if let Err(error) = stream.clear(ClearBuffer::Input) {
                    eprintln!("Could not clear the input buffer of {port}: {error}");
                }
                return stream;
            }
            Err(error) => {
                eprintln!("Waiting for {port} ({error})");
                tokio::time::sleep(RETRY_PERIOD).await;
            }
        }
    }
}

/// Terminal event handler.
pub struct EventHandler {
    /// Event receiver channel.
    from_tasks: UnboundedReceiver<Result<TuiEvent>>,
    to_mcu: Box<dyn AsyncWrite + Send + Unpin>,
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("from_tasks", &self.from_tasks)
            .finish_non_exhaustive()
    }
}

impl EventHandler {
    /// Constructs a new instance of [`EventHandler`] and spawns the tasks that produce events:
    /// terminal input, lines from the MCU on `link`, and redraw ticks.
    pub fn new<L>(link: L) -> Self
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (to_handler, from_tasks) = mpsc::unbounded_channel();
        tokio::spawn(await_crossterm_events(to_handler.clone()));
        tokio::spawn(tick(to_handler.clone()));
        Self::listen(link, to_handler, from_tasks)
    }

    /// Only listens to the MCU, for use without a terminal.
    #[cfg(test)]
    pub fn link_only<L>(link: L) -> Self
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (to_handler, from_tasks) = mpsc::unbounded_channel();
        Self::listen(link, to_handler, from_tasks)
    }

    fn listen<L>(
        link: L,
        to_handler: UnboundedSender<Result<TuiEvent>>,
        from_tasks: UnboundedReceiver<Result<TuiEvent>>,
    ) -> Self
    where
        L: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (from_mcu, to_mcu) = tokio::io::split(link);
        tokio::spawn(await_serial_lines(from_mcu, to_handler));
        Self {
            from_tasks,
            to_mcu: Box::new(to_mcu),
        }
    }

    /// Receives an event from the sender.
    ///
    /// This function blocks until an event is received.
    ///
    /// # Errors
    ///
    /// This function returns an error if the sender channel is disconnected. This can happen if an
    /// error occurs in the event thread. In practice, this should not happen unless there is a
    /// problem with the underlying terminal.
    pub async fn next(&mut self) -> Result<Result<TuiEvent>> {
        self.from_tasks
            .recv()
            .await
            .ok_or_eyre("Failed to receive event")
    }

    /// Sends a command byte to the MCU.
    ///
    /// # Errors
    /// Returns an error if writing to the serial port fails.
    pub async fn send(&mut self, command: Command) -> Result<()> {
        self.to_mcu
            .write_all(&[command.as_byte()])
            .await
            .wrap_err("Failed to write to the serial port")?;
        self.to_mcu.flush().await?;
        Ok(())
    }
}

async fn await_crossterm_events(to_handler: UnboundedSender<Result<TuiEvent>>) {
    let mut reader = crossterm::event::EventStream::new();
    loop {
        match reader.next().fuse().await {
            Some(Ok(event)) => {
                // If the channel is closed, this task is done.
                if to_handler.send(Ok(TuiEvent::Crossterm(event))).is_err() {
                    return;
                }
            }
            Some(Err(error)) => {
                let error = eyre!(error).wrap_err("Terminal event stream failed");
                let _ = to_handler.send(Err(error));
                return;
            }
            // If the stream is closed, this task is done.
            None => return,
        }
    }
}

async fn tick(to_handler: UnboundedSender<Result<TuiEvent>>) {
    let mut interval = tokio::time::interval(TICK_PERIOD);
    loop {
        interval.tick().await;
        if to_handler.send(Ok(TuiEvent::Tick)).is_err() {
            return;
        }
    }
}

/// Reads bytes from the MCU, splits them into lines and sends one event per line to the handler
/// (and repeats until the port closes).
///
/// Losing the port is not an error for the app: it ends with [`TuiEvent::Disconnected`] so the
/// recording can still be saved.
async fn await_serial_lines<R: AsyncRead + Unpin>(
    mut from_mcu: R,
    to_handler: UnboundedSender<Result<TuiEvent>>,
) {
    let mut buffer = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        match from_mcu.read_buf(&mut buffer).await {
            // End of file
            Ok(0) => {
                let closed = TuiEvent::Disconnected("The serial port was closed".to_owned());
                let _ = to_handler.send(Ok(closed));
                return;
            }
            Ok(_) => {
                while let Some(line) = take_line(&mut buffer) {
                    if let Some(event) = line_event(&line) {
                        // If the channel is closed, this task is done.
                        if to_handler.send(Ok(event)).is_err() {
                            return;
                        }
                    }
                }
                // A partial line this long will never turn into telemetry.
                if buffer.len() > MAX_LINE_LEN {
                    buffer.clear();
                }
                buffer.reserve(READ_BUFFER_SIZE);
            }
            Err(error) => {
                // If reading fails, the task is done.
                let reason = format!("Failed to read the serial port: {error}");
                let _ = to_handler.send(Ok(TuiEvent::Disconnected(reason)));
                return;
            }
        }
    }
}

/// Splits the first complete line off the front of `buffer`, without its line ending.
pub fn take_line(buffer: &mut BytesMut) -> Option<BytesMut> {
    let idx = buffer.iter().position(|byte| *byte == b'\n')?;
    let mut line = buffer.split_to(idx);
    buffer.advance(1);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    Some(line)
}

/// Turns a received line into an event. Blank lines produce nothing.
pub fn line_event(line: &[u8]) -> Option<TuiEvent> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(match Report::parse(text) {
        Ok(report) => TuiEvent::Report(report),
        Err(ParseError::NotTelemetry) => TuiEvent::Console(text.to_owned()),
        Err(error) => TuiEvent::Console(format!("{text} ({error})")),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::BufMut;
    use el_messages::Sample;

    /// Incremental writes like those in a serial stream must work properly.
    #[test]
    fn test_incremental_writes() {
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        buf.put(&b"-0.0360,30.0"[..]);
        assert!(take_line(&mut buf).is_none());
        buf.put(&b"000,1,\n-0.07"[..]);
        assert_eq!(take_line(&mut buf).unwrap(), b"-0.0360,30.0000,1,"[..]);
        assert!(take_line(&mut buf).is_none());
        assert_eq!(buf, b"-0.07"[..]);
    }

    #[test]
    fn test_line_endings() {
        let mut buf = BytesMut::from(&b"a\r\nb\n\n"[..]);
        assert_eq!(take_line(&mut buf).unwrap(), b"a"[..]);
        assert_eq!(take_line(&mut buf).unwrap(), b"b"[..]);
        assert_eq!(take_line(&mut buf).unwrap(), b""[..]);
        assert!(take_line(&mut buf).is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_line_events() {
        match line_event(b"12.5000,30.0000,42,") {
            Some(TuiEvent::Report(Report::Sample(sample))) => assert_eq!(
                sample,
                Sample {
                    angle_deg: 12.5,
                    duty_percent: 30.0,
                    time_ms: 42,
                }
            ),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(line_event(b"Fim"), Some(TuiEvent::Report(Report::End))));
        assert!(matches!(
            line_event(b"I (31) boot: ESP-IDF"),
            Some(TuiEvent::Console(text)) if text == "I (31) boot: ESP-IDF"
        ));
        assert!(matches!(line_event(b"a,b,c,"), Some(TuiEvent::Console(_))));
        assert!(line_event(b"   ").is_none());
    }

    #[tokio::test]
    async fn test_link_lines_and_close() {
        let (host, mut mcu) = tokio::io::duplex(256);
        let mut events = EventHandler::link_only(host);

        mcu.write_all(b"boot\r\n-0.0360,30.0000,1,\nFi").await.unwrap();
        assert!(matches!(
            events.next().await.unwrap().unwrap(),
            TuiEvent::Console(text) if text == "boot"
        ));
        assert!(matches!(
            events.next().await.unwrap().unwrap(),
            TuiEvent::Report(Report::Sample(Sample { time_ms: 1, .. }))
        ));
        mcu.write_all(b"m\n").await.unwrap();
        assert!(matches!(
            events.next().await.unwrap().unwrap(),
            TuiEvent::Report(Report::End)
        ));

        events.send(Command::Start).await.unwrap();
        let mut byte = [0u8; 1];
        mcu.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte, [b's']);

        // Unplugging the board is reported, not raised as an error.
        drop(mcu);
        assert!(matches!(
            events.next().await.unwrap().unwrap(),
            TuiEvent::Disconnected(_)
        ));
        assert!(events.send(Command::Stop).await.is_err());
    }
}
