//! The connection lifecycle state machine.
//!
//! `PRELOGIN -> SSL_NEGOTIATION -> LOGIN -> POST_LOGIN -> READY`, then the
//! `READY` state cycles through `SENDING`/`RECEIVING` once per exchange
//! before returning to `READY`; `CLOSED` is terminal and reachable from any
//! state. The state only tracks *which* decoder/encoder phase of the
//! handshake or exchange the connection is in; `mssql-tls` and
//! `tds-protocol::{prelogin, login7}` own the byte-level content of each
//! phase.

/// One state in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial PRELOGIN packet exchange; negotiates encryption level and
    /// protocol version before any credentials are sent.
    PreLogin,
    /// TLS handshake tunneled inside PRELOGIN-type packets, entered only
    /// when PRELOGIN negotiated `EncryptionLevel::On` or `Required`.
    SslNegotiation,
    /// LOGIN7 request sent; awaiting LOGINACK/ERROR/FEDAUTHINFO.
    Login,
    /// LOGINACK received; draining ENVCHANGE/INFO tokens before the
    /// connection is usable.
    PostLogin,
    /// Idle, no exchange in flight; the only state from which a new
    /// exchange may begin.
    Ready,
    /// A request is being written to the transport.
    Sending,
    /// A response is being read from the transport, up to and including its
    /// terminal DONE token.
    Receiving,
    /// Connection torn down; no further transitions are valid.
    Closed,
}

impl ConnectionState {
    /// Whether a new exchange may begin from this state.
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the connection has been torn down.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Human-readable name, used in diagnostics and [`crate::error::CodecError::NotReady`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PreLogin => "pre_login",
            Self::SslNegotiation => "ssl_negotiation",
            Self::Login => "login",
            Self::PostLogin => "post_login",
            Self::Ready => "ready",
            Self::Sending => "sending",
            Self::Receiving => "receiving",
            Self::Closed => "closed",
        }
    }

    /// Validate a proposed transition, returning the destination state if
    /// it is legal from `self`.
    ///
    /// `Closed` is reachable from everywhere (an I/O failure or explicit
    /// shutdown can occur in any phase); every other edge follows the
    /// handshake/exchange cycle described on the type.
    #[must_use]
    pub fn advance(self, to: ConnectionState) -> Option<ConnectionState> {
        use ConnectionState::{Closed, Login, PostLogin, PreLogin, Ready, Receiving, Sending, SslNegotiation};

        if to == Closed {
            return Some(Closed);
        }
        let legal = matches!(
            (self, to),
            (PreLogin, SslNegotiation)
                | (PreLogin, Login)
                | (SslNegotiation, Login)
                | (Login, PostLogin)
                | (PostLogin, Ready)
                | (Ready, Sending)
                | (Sending, Receiving)
                | (Receiving, Ready)
        );
        legal.then_some(to)
    }
}

/// Owns a [`ConnectionState`] and rejects illegal transitions at the call
/// site rather than letting callers silently desynchronize state.
#[derive(Debug, Clone, Copy)]
pub struct StateMachine {
    current: ConnectionState,
}

impl StateMachine {
    /// A machine freshly constructed for an unauthenticated socket.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ConnectionState::PreLogin,
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(self) -> ConnectionState {
        self.current
    }

    /// Attempt a transition, returning `false` (and leaving state
    /// unchanged) if `to` is not reachable from the current state.
    #[must_use]
    pub fn transition(&mut self, to: ConnectionState) -> bool {
        match self.current.advance(to) {
            Some(next) => {
                tracing::debug!(from = self.current.name(), to = next.name(), "state transition");
                self.current = next;
                true
            }
            None => {
                tracing::warn!(
                    from = self.current.name(),
                    attempted = to.name(),
                    "rejected illegal state transition"
                );
                false
            }
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::{Closed, Login, PostLogin, PreLogin, Ready, Receiving, Sending, SslNegotiation};

    #[test]
    fn handshake_happy_path() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state(), PreLogin);
        assert!(sm.transition(SslNegotiation));
        assert!(sm.transition(Login));
        assert!(sm.transition(PostLogin));
        assert!(sm.transition(Ready));
    }

    #[test]
    fn prelogin_may_skip_tls_straight_to_login() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(Login));
    }

    #[test]
    fn exchange_cycle_returns_to_ready() {
        let mut sm = StateMachine::new();
        sm.transition(Login);
        sm.transition(PostLogin);
        sm.transition(Ready);
        assert!(sm.transition(Sending));
        assert!(sm.transition(Receiving));
        assert!(sm.transition(Ready));
        assert_eq!(sm.state(), Ready);
    }

    #[test]
    fn cannot_send_before_login_completes() {
        let mut sm = StateMachine::new();
        assert!(!sm.transition(Sending));
        assert_eq!(sm.state(), PreLogin);
    }

    #[test]
    fn closed_is_reachable_from_any_state_and_terminal() {
        let mut sm = StateMachine::new();
        sm.transition(Login);
        assert!(sm.transition(Closed));
        assert!(!sm.transition(Ready));
        assert_eq!(sm.state(), Closed);
    }
}
