//! Socket probing: peer identity, TCP counters, forced shutdown.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use crate::snapshot::{TcpSnapshot, TcpState};

/// Errors from socket inspection.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("getpeername failed: {0}")]
    PeerAddress(#[source] io::Error),

    #[error("unsupported socket address family {0}")]
    AddressFamily(i32),

    #[error("TCP_INFO query failed: {0}")]
    TcpInfo(#[source] io::Error),

    #[error("shutdown failed: {0}")]
    Shutdown(#[source] io::Error),
}

/// Trait for inspecting the live connection.
///
/// The gate holds exactly one probe for the connection it guards; every
/// call reflects the kernel's current view, not a cached one.
pub trait ConnectionProbe: Send + Sync {
    /// Canonical textual identity of the remote peer (numeric address).
    fn peer_host(&self) -> Result<String, NetError>;

    /// Fresh snapshot of the connection's TCP state and counters.
    fn snapshot(&self) -> Result<TcpSnapshot, NetError>;

    /// Forcibly shut down both directions of the connection.
    ///
    /// Idempotent: an already-disconnected peer is not an error.
    fn shutdown_both(&self) -> Result<(), NetError>;
}

/// Leading fields of the kernel's `struct tcp_info` (uapi/linux/tcp.h),
/// through `tcpi_segs_in`. The kernel copies at most the length we pass,
/// so trailing fields it may also know about are simply not requested.
#[repr(C)]
#[derive(Clone, Copy)]
struct RawTcpInfo {
    tcpi_state: u8,
    tcpi_ca_state: u8,
    tcpi_retransmits: u8,
    tcpi_probes: u8,
    tcpi_backoff: u8,
    tcpi_options: u8,
    tcpi_wscale: u8,
    tcpi_app_limited: u8,
    tcpi_rto: u32,
    tcpi_ato: u32,
    tcpi_snd_mss: u32,
    tcpi_rcv_mss: u32,
    tcpi_unacked: u32,
    tcpi_sacked: u32,
    tcpi_lost: u32,
    tcpi_retrans: u32,
    tcpi_fackets: u32,
    tcpi_last_data_sent: u32,
    tcpi_last_ack_sent: u32,
    tcpi_last_data_recv: u32,
    tcpi_last_ack_recv: u32,
    tcpi_pmtu: u32,
    tcpi_rcv_ssthresh: u32,
    tcpi_rtt: u32,
    tcpi_rttvar: u32,
    tcpi_snd_ssthresh: u32,
    tcpi_snd_cwnd: u32,
    tcpi_advmss: u32,
    tcpi_reordering: u32,
    tcpi_rcv_rtt: u32,
    tcpi_rcv_space: u32,
    tcpi_total_retrans: u32,
    tcpi_pacing_rate: u64,
    tcpi_max_pacing_rate: u64,
    tcpi_bytes_acked: u64,
    tcpi_bytes_received: u64,
    tcpi_segs_out: u32,
    tcpi_segs_in: u32,
}

/// Probe over a raw connected socket descriptor.
///
/// Does not own the descriptor; the process supervisor handed it to us and
/// the protected service will inherit it.
#[derive(Debug, Clone, Copy)]
pub struct SocketProbe {
    fd: RawFd,
}

impl SocketProbe {
    /// Probe an arbitrary descriptor.
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    /// Probe descriptor 0, the connection inherited from an inetd-style
    /// supervisor.
    pub fn stdin() -> Self {
        Self::new(0)
    }
}

impl ConnectionProbe for SocketProbe {
    fn peer_host(&self) -> Result<String, NetError> {
        let mut addr: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
        let rc = unsafe {
            libc::getpeername(
                self.fd,
                &mut addr as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                &mut len,
            )
        };
        if rc != 0 {
            return Err(NetError::PeerAddress(io::Error::last_os_error()));
        }
        match i32::from(addr.ss_family) {
            libc::AF_INET => {
                let v4 = unsafe { &*(&addr as *const libc::sockaddr_storage).cast::<libc::sockaddr_in>() };
                Ok(Ipv4Addr::from(u32::from_be(v4.sin_addr.s_addr)).to_string())
            }
            libc::AF_INET6 => {
                let v6 = unsafe { &*(&addr as *const libc::sockaddr_storage).cast::<libc::sockaddr_in6>() };
                Ok(Ipv6Addr::from(v6.sin6_addr.s6_addr).to_string())
            }
            family => Err(NetError::AddressFamily(family)),
        }
    }

    fn snapshot(&self) -> Result<TcpSnapshot, NetError> {
        let mut info: RawTcpInfo = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<RawTcpInfo>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                self.fd,
                libc::IPPROTO_TCP,
                libc::TCP_INFO,
                &mut info as *mut RawTcpInfo as *mut libc::c_void,
                &mut len,
            )
        };
        if rc != 0 {
            return Err(NetError::TcpInfo(io::Error::last_os_error()));
        }
        Ok(TcpSnapshot {
            state: TcpState::from_raw(info.tcpi_state),
            segments_in: u64::from(info.tcpi_segs_in),
            bytes_acked: info.tcpi_bytes_acked,
        })
    }

    fn shutdown_both(&self) -> Result<(), NetError> {
        let rc = unsafe { libc::shutdown(self.fd, libc::SHUT_RDWR) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            // Peer already gone: nothing left to tear down.
            if err.raw_os_error() == Some(libc::ENOTCONN) {
                return Ok(());
            }
            return Err(NetError::Shutdown(err));
        }
        Ok(())
    }
}

/// Mock probe for testing.
///
/// Returns a fixed peer identity and a scripted sequence of snapshots;
/// once the script runs out, the last snapshot repeats (the kernel keeps
/// answering with its current view, after all).
#[derive(Debug, Default)]
pub struct MockProbe {
    host: String,
    snapshots: Mutex<Vec<TcpSnapshot>>,
    cursor: AtomicUsize,
    shutdowns: AtomicUsize,
    fail_peer: bool,
    fail_snapshot: bool,
}

impl MockProbe {
    /// Mock probe for a peer with the given identity.
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    /// Mock probe with a scripted snapshot sequence.
    pub fn with_snapshots(host: &str, snapshots: Vec<TcpSnapshot>) -> Self {
        Self {
            host: host.to_string(),
            snapshots: Mutex::new(snapshots),
            ..Self::default()
        }
    }

    /// Mock probe whose `peer_host` fails.
    pub fn failing_peer() -> Self {
        Self {
            fail_peer: true,
            ..Self::default()
        }
    }

    /// Mock probe whose `snapshot` fails.
    pub fn failing_snapshot(host: &str) -> Self {
        Self {
            host: host.to_string(),
            fail_snapshot: true,
            ..Self::default()
        }
    }

    /// Append a snapshot to the script.
    pub fn push_snapshot(&self, snapshot: TcpSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot);
    }

    /// Number of `shutdown_both` calls observed.
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl ConnectionProbe for MockProbe {
    fn peer_host(&self) -> Result<String, NetError> {
        if self.fail_peer {
            return Err(NetError::PeerAddress(io::Error::other("mock failure")));
        }
        Ok(self.host.clone())
    }

    fn snapshot(&self) -> Result<TcpSnapshot, NetError> {
        if self.fail_snapshot {
            return Err(NetError::TcpInfo(io::Error::other("mock failure")));
        }
        let snapshots = self.snapshots.lock().unwrap();
        if snapshots.is_empty() {
            return Ok(TcpSnapshot::established(0, 0));
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(snapshots[idx.min(snapshots.len() - 1)])
    }

    fn shutdown_both(&self) -> Result<(), NetError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{Shutdown, TcpListener, TcpStream};
    use std::os::unix::io::AsRawFd;
    use std::time::{Duration, Instant};

    fn local_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let client = TcpStream::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        (client, server)
    }

    // ===========================================
    // SocketProbe against real sockets
    // ===========================================

    #[test]
    fn test_peer_host_is_numeric_ipv4() {
        let (_client, server) = local_pair();
        let probe = SocketProbe::new(server.as_raw_fd());
        assert_eq!(probe.peer_host().expect("peer host"), "127.0.0.1");
    }

    #[test]
    fn test_peer_host_is_numeric_ipv6() {
        // IPv6 loopback may be unavailable in minimal environments.
        let listener = match TcpListener::bind("[::1]:0") {
            Ok(l) => l,
            Err(_) => return,
        };
        let addr = listener.local_addr().expect("local addr");
        let _client = TcpStream::connect(addr).expect("connect");
        let (server, _) = listener.accept().expect("accept");
        let probe = SocketProbe::new(server.as_raw_fd());
        assert_eq!(probe.peer_host().expect("peer host"), "::1");
    }

    #[test]
    fn test_peer_host_on_non_socket_fails() {
        let file = std::fs::File::open("/dev/null").expect("open /dev/null");
        let probe = SocketProbe::new(file.as_raw_fd());
        assert!(matches!(probe.peer_host(), Err(NetError::PeerAddress(_))));
    }

    #[test]
    fn test_snapshot_of_established_connection() {
        let (_client, server) = local_pair();
        let probe = SocketProbe::new(server.as_raw_fd());
        let snapshot = probe.snapshot().expect("snapshot");
        assert_eq!(snapshot.state, TcpState::Established);
    }

    #[test]
    fn test_snapshot_counts_inbound_segments() {
        let (mut client, server) = local_pair();
        let probe = SocketProbe::new(server.as_raw_fd());
        let before = probe.snapshot().expect("snapshot").segments_in;

        client.write_all(b"hello").expect("write");
        client.flush().expect("flush");

        // Give the kernel a moment to process the segment.
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let after = probe.snapshot().expect("snapshot").segments_in;
            if after > before {
                break;
            }
            assert!(Instant::now() < deadline, "segment never counted");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_snapshot_sees_half_close() {
        let (client, server) = local_pair();
        let probe = SocketProbe::new(server.as_raw_fd());
        assert_eq!(probe.snapshot().expect("snapshot").state, TcpState::Established);

        client.shutdown(Shutdown::Write).expect("half-close");

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            if probe.snapshot().expect("snapshot").state == TcpState::CloseWait {
                break;
            }
            assert!(Instant::now() < deadline, "FIN never observed");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_shutdown_both_is_idempotent() {
        let (_client, server) = local_pair();
        let probe = SocketProbe::new(server.as_raw_fd());
        probe.shutdown_both().expect("first shutdown");
        // Second shutdown hits ENOTCONN, which is not an error.
        probe.shutdown_both().expect("second shutdown");
    }

    // ===========================================
    // MockProbe
    // ===========================================

    #[test]
    fn test_mock_probe_peer_host() {
        let probe = MockProbe::new("192.0.2.1");
        assert_eq!(probe.peer_host().expect("peer host"), "192.0.2.1");
    }

    #[test]
    fn test_mock_probe_scripted_snapshots() {
        let probe = MockProbe::with_snapshots(
            "192.0.2.1",
            vec![
                TcpSnapshot::established(1, 0),
                TcpSnapshot::established(2, 0),
            ],
        );
        assert_eq!(probe.snapshot().expect("first").segments_in, 1);
        assert_eq!(probe.snapshot().expect("second").segments_in, 2);
        // Script exhausted: last snapshot repeats.
        assert_eq!(probe.snapshot().expect("third").segments_in, 2);
    }

    #[test]
    fn test_mock_probe_empty_script_defaults() {
        let probe = MockProbe::new("192.0.2.1");
        let snapshot = probe.snapshot().expect("snapshot");
        assert_eq!(snapshot, TcpSnapshot::established(0, 0));
    }

    #[test]
    fn test_mock_probe_counts_shutdowns() {
        let probe = MockProbe::new("192.0.2.1");
        assert_eq!(probe.shutdown_count(), 0);
        probe.shutdown_both().expect("shutdown");
        probe.shutdown_both().expect("shutdown");
        assert_eq!(probe.shutdown_count(), 2);
    }

    #[test]
    fn test_mock_probe_failures() {
        let peer_failing = MockProbe::failing_peer();
        assert!(matches!(
            peer_failing.peer_host(),
            Err(NetError::PeerAddress(_))
        ));

        let snapshot_failing = MockProbe::failing_snapshot("192.0.2.1");
        assert!(matches!(
            snapshot_failing.snapshot(),
            Err(NetError::TcpInfo(_))
        ));
    }

    #[test]
    fn test_net_error_display() {
        let err = NetError::AddressFamily(42);
        assert_eq!(err.to_string(), "unsupported socket address family 42");
    }
}
