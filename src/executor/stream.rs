//! Line-oriented draining of child output streams.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Which standard stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line of child output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub text: String,
}

/// Per-stream ordered buffers. Written only by the supervising thread.
#[derive(Debug, Default)]
pub(crate) struct CapturedOutput {
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl CapturedOutput {
    pub(crate) fn push(&mut self, line: OutputLine) {
        match line.stream {
            StreamKind::Stdout => self.stdout.push(line.text),
            StreamKind::Stderr => self.stderr.push(line.text),
        }
    }

    /// Joined `(stdout, stderr)` text.
    pub(crate) fn into_text(self) -> (String, String) {
        (self.stdout.join("\n"), self.stderr.join("\n"))
    }
}

/// Spawn a thread that forwards each line of `reader` onto `tx`.
///
/// The thread ends at EOF, on a read error, or once the receiver is gone.
/// Bytes that are not valid UTF-8 are replaced rather than dropped.
pub(crate) fn spawn_reader<R>(
    stream: StreamKind,
    reader: R,
    tx: Sender<OutputLine>,
) -> std::io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let name = match stream {
        StreamKind::Stdout => "bimbridge-stdout",
        StreamKind::Stderr => "bimbridge-stderr",
    };

    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    let line = OutputLine {
                        stream,
                        text: String::from_utf8_lossy(&buf).into_owned(),
                    };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn test_reader_splits_lines_and_strips_terminators() {
        let (tx, rx) = mpsc::channel();
        let data = Cursor::new(b"first\r\nsecond\n\nlast without newline".to_vec());

        spawn_reader(StreamKind::Stdout, data, tx)
            .unwrap()
            .join()
            .unwrap();

        let lines: Vec<String> = rx.iter().map(|l| l.text).collect();
        assert_eq!(lines, vec!["first", "second", "", "last without newline"]);
    }

    #[test]
    fn test_reader_replaces_invalid_utf8() {
        let (tx, rx) = mpsc::channel();
        let data = Cursor::new(vec![b'o', b'k', 0xff, b'\n']);

        spawn_reader(StreamKind::Stderr, data, tx)
            .unwrap()
            .join()
            .unwrap();

        let line = rx.recv().unwrap();
        assert_eq!(line.stream, StreamKind::Stderr);
        assert_eq!(line.text, "ok\u{FFFD}");
    }

    #[test]
    fn test_captured_output_keeps_streams_apart() {
        let mut output = CapturedOutput::default();
        output.push(OutputLine {
            stream: StreamKind::Stdout,
            text: "a".to_string(),
        });
        output.push(OutputLine {
            stream: StreamKind::Stderr,
            text: "x".to_string(),
        });
        output.push(OutputLine {
            stream: StreamKind::Stdout,
            text: "b".to_string(),
        });

        assert_eq!(output.into_text(), ("a\nb".to_string(), "x".to_string()));
    }
}
