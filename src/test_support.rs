//! Recording session shared by the connection and server tests.

use crate::session::{LineSender, Session, SessionError};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// What a [`Recorder`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(String),
    Disconnected,
}

/// Session that reports every callback to the test.
///
/// - `ECHO <text>` sends `<text>` back
/// - `QUIT` sends `ERROR :Closing Link` and closes
/// - `FAIL` returns a protocol error
/// - `PANIC` panics
pub struct Recorder {
    events: UnboundedSender<Event>,
    sender: LineSender,
}

impl Session for Recorder {
    fn on_line(&mut self, line: &str) -> Result<(), SessionError> {
        let _ = self.events.send(Event::Line(line.to_string()));

        if let Some(text) = line.strip_prefix("ECHO ") {
            self.sender.send_line(text);
        } else if line == "QUIT" {
            self.sender.send_line("ERROR :Closing Link");
            self.sender.close();
        } else if line == "FAIL" {
            return Err(SessionError::Protocol("asked to fail".into()));
        } else if line == "PANIC" {
            panic!("asked to panic");
        }
        Ok(())
    }

    fn on_disconnect(&mut self) {
        let _ = self.events.send(Event::Disconnected);
    }
}

/// The test's view of one accepted connection.
pub struct RecorderHandle {
    pub peer: SocketAddr,
    pub events: UnboundedReceiver<Event>,
    pub sender: LineSender,
}

impl RecorderHandle {
    /// Waits for the next event, failing the test after a few seconds.
    pub async fn next_event(&mut self) -> Event {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("session dropped")
    }
}

/// Factory producing [`Recorder`]s, plus a receiver yielding one handle per
/// accepted connection.
pub fn recorder_factory() -> (
    impl Fn(SocketAddr, LineSender) -> Result<Recorder, SessionError> + Send + Sync + 'static,
    UnboundedReceiver<RecorderHandle>,
) {
    let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();

    let factory = move |peer: SocketAddr, sender: LineSender| -> Result<Recorder, SessionError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = accepted_tx.send(RecorderHandle {
            peer,
            events: events_rx,
            sender: sender.clone(),
        });
        Ok(Recorder {
            events: events_tx,
            sender,
        })
    };

    (factory, accepted_rx)
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Routes this thread's log events into a [`LogCapture`] until the guard
/// is dropped. Only reliable on the current-thread test runtime.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
