//! Connection - drives one client session.
//!
//! Each connection runs in two phases:
//!
//! Phase 1: Handshake - sequential owned writes on the current task: send
//! the greeting, read and validate the username.
//!
//! Phase 2: Relay - the inbound loop keeps running on this task while a
//! dispatcher task takes ownership of the write half and drains the
//! session's mailbox. Every post-handshake byte to the client goes through
//! that one writer, so concurrent broadcasts never interleave partial
//! writes on the socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::SessionError;
use crate::protocol::{self, LineCodec};
use crate::state::mailbox::Mailbox;
use crate::state::room::{Member, Room};
use crate::state::session::Session;
use crate::state::SessionId;

type Reader = FramedRead<OwnedReadHalf, LineCodec>;
type Writer = FramedWrite<OwnedWriteHalf, LineCodec>;

/// A client connection handler.
pub struct Connection {
    session: Session,
    addr: SocketAddr,
    stream: TcpStream,
    room: Arc<Room>,
    config: Arc<Config>,
}

impl Connection {
    pub fn new(
        id: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        room: Arc<Room>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            session: Session::new(id),
            addr,
            stream,
            room,
            config,
        }
    }

    /// Drive the session from greeting to teardown.
    #[instrument(skip(self), fields(id = %self.session.id(), addr = %self.addr), name = "session")]
    pub async fn run(self) -> anyhow::Result<()> {
        let Connection {
            mut session,
            addr: _,
            stream,
            room,
            config,
        } = self;

        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::new(config.limits.max_line_len));
        let mut writer = FramedWrite::new(write_half, LineCodec::new(config.limits.max_line_len));

        // Phase 1: greeting, then username negotiation.
        let greeting = protocol::greeting(session.id(), &config.server.room);
        if let Err(e) = writer.send(greeting.as_str()).await {
            debug!(error = %e, "Write failed before handshake");
            return Ok(());
        }

        let username = match negotiate_username(&mut reader, &config).await {
            Ok(name) => name,
            Err(e) => {
                debug!(code = e.error_code(), error = %e, "Handshake failed");
                if matches!(e, SessionError::InvalidUsername(_))
                    && let Some(notice) = &config.session.rejection_notice
                {
                    let _ = writer.send(notice.as_str()).await;
                }
                session.close();
                return Ok(());
            }
        };

        // Phase 2: join the room and relay until the stream ends.
        session.join(username.clone());
        let mailbox = Mailbox::new(config.limits.mailbox_capacity);
        let others = room.join(
            session.id(),
            Member {
                username: username.clone(),
                mailbox: mailbox.clone(),
            },
        )?;
        info!(username = %username, others, "Joined the room");

        let mut dispatcher = tokio::spawn(dispatch(mailbox.clone(), writer));

        let mut writer_gone = false;
        loop {
            tokio::select! {
                next = reader.next() => match next {
                    Some(Ok(text)) => {
                        room.broadcast(&protocol::chat(&username, &text), Some(session.id()));
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                    None => {
                        info!("Client disconnected");
                        break;
                    }
                },
                // The dispatcher exits on write failure or a closed mailbox
                // (slow-consumer eviction); either way the session is over.
                _ = &mut dispatcher => {
                    writer_gone = true;
                    break;
                }
            }
        }

        // Teardown. leave() announces at most once, so racing a
        // slow-consumer eviction cannot double-announce.
        if room.leave(session.id()).is_some() {
            info!(username = %username, "Left the room");
        }
        mailbox.close();
        if !writer_gone {
            // Let the dispatcher drain what is already queued.
            let _ = dispatcher.await;
        }
        session.close();
        Ok(())
    }
}

/// Read one line as the proposed username, bounded by the handshake timeout.
async fn negotiate_username(reader: &mut Reader, config: &Config) -> Result<String, SessionError> {
    let deadline = Duration::from_secs(config.session.handshake_timeout_secs);
    let line = match timeout(deadline, reader.next()).await {
        Err(_) => return Err(SessionError::HandshakeTimeout),
        Ok(None) => return Err(SessionError::EndOfStream),
        Ok(Some(Err(e))) => return Err(e.into()),
        Ok(Some(Ok(line))) => line,
    };

    if !protocol::is_valid_username(&line) {
        return Err(SessionError::InvalidUsername(line));
    }
    Ok(line)
}

/// Outbound worker: sole writer for the session after the handshake.
/// Drains the mailbox until it is closed or a write fails. A write stalled
/// on a dead peer is abandoned as soon as the mailbox closes, so teardown
/// never waits on the transport.
async fn dispatch(mailbox: Mailbox, mut writer: Writer) {
    while let Some(line) = mailbox.recv().await {
        tokio::select! {
            result = writer.send(&*line) => {
                if let Err(e) = result {
                    debug!(error = %e, "Write failed");
                    return;
                }
            }
            _ = mailbox.closed() => return,
        }
    }
}
