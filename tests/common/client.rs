//! Test chat client.
//!
//! A line-oriented client for integration testing that can join the room,
//! send chat lines, and assert on what the server delivers.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test chat client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream))
    }

    /// Connect with SO_LINGER zero so dropping the client resets the
    /// connection, exercising the server's read-error path rather than a
    /// clean end-of-stream.
    pub async fn connect_abortive(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_linger(Some(Duration::from_secs(0)))?;
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send one newline-terminated line.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(RECV_TIMEOUT).await
    }

    /// Receive a line with a custom timeout. Only the terminator is
    /// trimmed, so significant trailing whitespace survives.
    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(n > 0, "connection closed by server");
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Consume the greeting, send `username`, and return the roster line.
    pub async fn join(&mut self, username: &str) -> anyhow::Result<String> {
        let greeting = self.recv_line().await?;
        anyhow::ensure!(
            greeting.contains("What is your username?"),
            "unexpected greeting: {greeting}"
        );
        self.send_line(username).await?;
        self.recv_line().await
    }

    /// Consume the greeting and return the session id it carries.
    pub async fn recv_greeting_id(&mut self) -> anyhow::Result<u64> {
        let greeting = self.recv_line().await?;
        let rest = greeting
            .strip_prefix("[id: ")
            .ok_or_else(|| anyhow::anyhow!("unexpected greeting: {greeting}"))?;
        let end = rest
            .find(']')
            .ok_or_else(|| anyhow::anyhow!("unexpected greeting: {greeting}"))?;
        Ok(rest[..end].parse()?)
    }

    /// Assert the server sends nothing for `dur` and keeps the connection
    /// open.
    pub async fn assert_silent(&mut self, dur: Duration) -> anyhow::Result<()> {
        let mut line = String::new();
        match timeout(dur, self.reader.read_line(&mut line)).await {
            Err(_) => Ok(()),
            Ok(Ok(0)) => anyhow::bail!("connection closed while expecting silence"),
            Ok(Ok(_)) => anyhow::bail!("unexpected line: {:?}", line.trim_end()),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    /// Assert the server closes the connection without sending another
    /// line. A connection reset also counts as closed.
    pub async fn expect_close(&mut self) -> anyhow::Result<()> {
        let mut line = String::new();
        match timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await {
            Err(_) => anyhow::bail!("server did not close the connection"),
            Ok(Ok(0)) => Ok(()),
            Ok(Ok(_)) => anyhow::bail!("unexpected line before close: {:?}", line.trim_end()),
            Ok(Err(_)) => Ok(()),
        }
    }
}
