use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::{timeout, Duration};

use crate::transport::Transport;

/// Default timeout for a single write (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted input line. Reads stop at this many bytes even when no
/// newline has arrived.
const MAX_LINE_LEN: usize = 4096;

/// Newline-delimited text over a TCP stream.
pub struct TcpTransport {
    reader: BufReader<OwnedReadHalf>,
    /// Bytes of the line being assembled. Kept across calls so a `recv`
    /// cancelled by `select!` loses nothing.
    pending: Vec<u8>,
    writer: OwnedWriteHalf,
    timeout_duration: Duration,
    max_line_len: usize,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_timeout(stream, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(stream: TcpStream, timeout_duration: Duration) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            pending: Vec::new(),
            writer,
            timeout_duration,
            max_line_len: MAX_LINE_LEN,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

fn map_io_error(e: std::io::Error) -> anyhow::Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
            anyhow::anyhow!("Connection closed by peer")
        }
        std::io::ErrorKind::InvalidData => anyhow::anyhow!("Client sent invalid UTF-8"),
        _ => anyhow::anyhow!("I/O error: {}", e),
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, text: &str) -> anyhow::Result<()> {
        let send_op = async {
            self.writer.write_all(text.as_bytes()).await.map_err(map_io_error)?;
            self.writer.write_all(b"\n").await.map_err(map_io_error)?;
            self.writer.flush().await.map_err(map_io_error)?;
            anyhow::Ok(())
        };

        timeout(self.timeout_duration, send_op)
            .await
            .map_err(|_| anyhow::anyhow!("Send timeout after {:?}", self.timeout_duration))?
    }

    async fn recv(&mut self) -> anyhow::Result<String> {
        loop {
            let room = (self.max_line_len + 1).saturating_sub(self.pending.len()) as u64;
            let read = (&mut self.reader)
                .take(room)
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(map_io_error)?;

            if self.pending.last() == Some(&b'\n') {
                let mut line = std::mem::take(&mut self.pending);
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|_| anyhow::anyhow!("Client sent invalid UTF-8"));
            }
            if self.pending.len() > self.max_line_len {
                self.pending.clear();
                return Err(anyhow::anyhow!(
                    "Line too long: more than {} bytes without a newline",
                    self.max_line_len
                ));
            }
            if read == 0 {
                return Err(anyhow::anyhow!("Connection closed by peer"));
            }
        }
    }
}
