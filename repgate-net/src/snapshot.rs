//! TCP connection state and counter snapshot.

/// TCP state as reported by the kernel (`tcpi_state`).
///
/// Numbering follows the Linux TCP state machine; values outside it are
/// preserved in `Unknown` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    /// Peer sent FIN but the local side still holds the socket open: the
    /// half-close state the early-close detector looks for.
    CloseWait,
    LastAck,
    Listen,
    Closing,
    NewSynRecv,
    Unknown(u8),
}

impl TcpState {
    /// Decode the raw `tcpi_state` value.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => TcpState::Established,
            2 => TcpState::SynSent,
            3 => TcpState::SynRecv,
            4 => TcpState::FinWait1,
            5 => TcpState::FinWait2,
            6 => TcpState::TimeWait,
            7 => TcpState::Close,
            8 => TcpState::CloseWait,
            9 => TcpState::LastAck,
            10 => TcpState::Listen,
            11 => TcpState::Closing,
            12 => TcpState::NewSynRecv,
            other => TcpState::Unknown(other),
        }
    }
}

/// Point-in-time view of a connection's TCP-level counters.
///
/// Queried fresh at each inspection point and never cached: only the
/// verdict derived from it is ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSnapshot {
    /// Connection state at inspection time.
    pub state: TcpState,
    /// Inbound segments over the life of the socket (`tcpi_segs_in`).
    pub segments_in: u64,
    /// Bytes the peer has acknowledged receiving (`tcpi_bytes_acked`).
    pub bytes_acked: u64,
}

impl TcpSnapshot {
    /// Snapshot of an established connection with the given counters.
    pub fn established(segments_in: u64, bytes_acked: u64) -> Self {
        Self {
            state: TcpState::Established,
            segments_in,
            bytes_acked,
        }
    }

    /// Snapshot of a half-closed connection.
    pub fn close_wait(segments_in: u64, bytes_acked: u64) -> Self {
        Self {
            state: TcpState::CloseWait,
            segments_in,
            bytes_acked,
        }
    }
}
