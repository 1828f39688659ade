//! Background consumers for child process output.
//!
//! Each stream is drained on its own thread so a full pipe on one stream can
//! never stall the child while the caller waits on the other.

use crate::listener::MessageListener;
use crate::{ManagedSdkError, Result};
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Receives a stream line by line. Lines keep their terminator.
pub trait LineHandler: Send + 'static {
    type Output: Send + 'static;

    fn line(&mut self, line: &str);

    fn finish(self) -> Self::Output;
}

/// Accumulates the whole stream into a string.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    buffer: String,
}

impl LineHandler for CollectingHandler {
    type Output = String;

    fn line(&mut self, line: &str) {
        self.buffer.push_str(line);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

/// Hands each line to a message listener as it arrives.
pub struct ForwardingHandler {
    listener: Arc<dyn MessageListener>,
}

impl ForwardingHandler {
    pub fn new(listener: Arc<dyn MessageListener>) -> Self {
        Self { listener }
    }
}

impl LineHandler for ForwardingHandler {
    type Output = ();

    fn line(&mut self, line: &str) {
        self.listener.message(line);
    }

    fn finish(self) {}
}

/// A stream being consumed on a background thread; `result()` waits for the
/// stream to close and yields the handler's output.
pub struct AsyncStreamHandler<T> {
    handle: JoinHandle<std::io::Result<T>>,
}

/// An async handler whose result is the collected stream text.
pub type AsyncStreamSaver = AsyncStreamHandler<String>;

impl<T: Send + 'static> AsyncStreamHandler<T> {
    pub fn spawn<R, H>(name: &str, stream: R, mut handler: H) -> Result<Self>
    where
        R: Read + Send + 'static,
        H: LineHandler<Output = T>,
    {
        let handle = thread::Builder::new()
            .name(format!("stream-{}", name))
            .spawn(move || {
                let mut reader = BufReader::new(stream);
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    if reader.read_until(b'\n', &mut buf)? == 0 {
                        break;
                    }
                    handler.line(&String::from_utf8_lossy(&buf));
                }
                Ok(handler.finish())
            })?;
        Ok(Self { handle })
    }

    /// Block until the stream closes.
    pub fn result(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => result.map_err(ManagedSdkError::from),
            Err(_) => Err(ManagedSdkError::command_execution("stream consumer panicked")),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::testing::RecordingListener;
    use std::io::{self, Cursor};

    #[test]
    fn test_saver_collects_everything() {
        let saver: AsyncStreamSaver = AsyncStreamHandler::spawn(
            "test",
            Cursor::new(b"line1\nline2\nno newline".to_vec()),
            CollectingHandler::default(),
        )
        .unwrap();
        assert_eq!(saver.result().unwrap(), "line1\nline2\nno newline");
    }

    #[test]
    fn test_forwarder_streams_lines() {
        let listener = Arc::new(RecordingListener::default());
        let handler = AsyncStreamHandler::spawn(
            "test",
            Cursor::new(b"a\nb\n".to_vec()),
            ForwardingHandler::new(listener.clone()),
        )
        .unwrap();
        handler.result().unwrap();
        assert_eq!(listener.messages(), vec!["a\n".to_string(), "b\n".to_string()]);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe went away"))
        }
    }

    #[test]
    fn test_io_error_surfaces_through_result() {
        let saver = AsyncStreamHandler::spawn("test", FailingReader, CollectingHandler::default()).unwrap();
        let err = saver.result().unwrap_err();
        assert!(matches!(err, ManagedSdkError::Io(_)));
    }
}
