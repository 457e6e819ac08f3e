//! Keepalive session.
//!
//! The smallest useful session: it keeps IRC clients connected by answering
//! `PING` and lets them leave with `QUIT`. Everything else is ignored.
//! The binary uses it when no richer session is plugged in.

use super::{LineSender, Session, SessionError, SessionFactory};
use std::net::SocketAddr;
use tracing::debug;

/// Answers `PING` with `PONG` and closes on `QUIT`.
#[derive(Debug)]
pub struct KeepaliveSession {
    sender: LineSender,
}

impl KeepaliveSession {
    pub fn new(sender: LineSender) -> Self {
        Self { sender }
    }
}

impl Session for KeepaliveSession {
    fn on_line(&mut self, line: &str) -> Result<(), SessionError> {
        let (command, params) = match line.split_once(' ') {
            Some((command, params)) => (command, Some(params)),
            None => (line, None),
        };

        if command.eq_ignore_ascii_case("PING") {
            match params {
                Some(params) => self.sender.send_line(format!("PONG {}", params)),
                None => self.sender.send_line("PONG"),
            };
        } else if command.eq_ignore_ascii_case("QUIT") {
            self.sender.send_line("ERROR :Closing Link");
            self.sender.close();
        } else if !command.is_empty() {
            debug!(peer = %self.sender.peer_addr(), command, "Ignoring command");
        }

        Ok(())
    }
}

/// Builds a [`KeepaliveSession`] for every connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepaliveFactory;

impl SessionFactory for KeepaliveFactory {
    type Session = KeepaliveSession;

    fn on_accept(
        &self,
        _peer: SocketAddr,
        sender: LineSender,
    ) -> Result<KeepaliveSession, SessionError> {
        Ok(KeepaliveSession::new(sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Outbound;
    use tokio::sync::mpsc;

    fn session() -> (KeepaliveSession, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = "127.0.0.1:50000".parse().unwrap();
        let session = KeepaliveFactory
            .on_accept(peer, LineSender::new(tx, peer))
            .unwrap();
        (session, rx)
    }

    #[test]
    fn test_ping_pong() {
        let (mut session, mut rx) = session();

        session.on_line("PING :irc.example.net").unwrap();
        session.on_line("ping").unwrap();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Line("PONG :irc.example.net".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Line("PONG".into()));
    }

    #[test]
    fn test_quit_closes_after_reply() {
        let (mut session, mut rx) = session();

        session.on_line("QUIT :gone fishing").unwrap();

        assert_eq!(rx.try_recv().unwrap(), Outbound::Line("ERROR :Closing Link".into()));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }

    #[test]
    fn test_other_commands_are_ignored() {
        let (mut session, mut rx) = session();

        session.on_line("NICK foo").unwrap();
        session.on_line("").unwrap();

        assert!(rx.try_recv().is_err());
    }
}
