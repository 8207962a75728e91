//! Connection behavior classifier.
//!
//! After the protected service finishes, the gate judges the connection
//! from three cheap observables: inbound segment count, wall time spent
//! in the service, and payload bytes acknowledged by the peer. Scanners
//! and credential stuffers hang up early and exchange almost nothing;
//! legitimate sessions either last or move data.

use repgate_net::TcpSnapshot;

/// Connections with at least this many inbound segments have exchanged
/// enough traffic to be judged on the remaining signals.
pub const GOOD_SEGS_IN_THRESHOLD: u64 = 16;

/// Sessions at least this long are benign regardless of volume.
pub const GOOD_TIME_THRESHOLD_SECS: u64 = 300;

/// Sessions that moved at least this much acknowledged payload are benign.
pub const GOOD_BYTES_THRESHOLD: u64 = 4096;

/// The gate's judgment of a finished connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Looked like a real session; forgive any stored penalty.
    Benign,
    /// Looked like probing; escalate the stored penalty.
    Suspicious,
}

/// The observables the classifier operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnMetrics {
    /// Inbound TCP segments over the connection's lifetime.
    pub segments_in: u64,
    /// Seconds spent inside the protected service.
    pub elapsed_secs: u64,
    /// Payload bytes the peer acknowledged receiving.
    pub bytes_acked: u64,
}

impl ConnMetrics {
    /// Combine the post-service socket snapshot with the measured duration.
    pub fn new(snapshot: &TcpSnapshot, elapsed_secs: u64) -> Self {
        Self {
            segments_in: snapshot.segments_in,
            elapsed_secs,
            bytes_acked: snapshot.bytes_acked,
        }
    }
}

/// Classify a finished connection.
///
/// Rules are checked in order; the first match wins:
/// 1. fewer than 16 inbound segments is suspicious,
/// 2. 300 seconds or more is benign,
/// 3. 4096 acknowledged bytes or more is benign,
/// 4. everything else is suspicious.
pub fn classify(metrics: &ConnMetrics) -> Verdict {
    if metrics.segments_in < GOOD_SEGS_IN_THRESHOLD {
        return Verdict::Suspicious;
    }
    if metrics.elapsed_secs >= GOOD_TIME_THRESHOLD_SECS {
        return Verdict::Benign;
    }
    if metrics.bytes_acked >= GOOD_BYTES_THRESHOLD {
        return Verdict::Benign;
    }
    Verdict::Suspicious
}

#[cfg(test)]
mod tests {
    use super::*;
    use repgate_net::TcpState;

    fn metrics(segments_in: u64, elapsed_secs: u64, bytes_acked: u64) -> ConnMetrics {
        ConnMetrics {
            segments_in,
            elapsed_secs,
            bytes_acked,
        }
    }

    // ===========================================
    // Segment floor
    // ===========================================

    #[test]
    fn test_few_segments_is_suspicious_regardless_of_other_signals() {
        // Even a long, chatty-looking session cannot be benign with a
        // segment count this low.
        assert_eq!(classify(&metrics(15, 10_000, 1_000_000)), Verdict::Suspicious);
        assert_eq!(classify(&metrics(0, 0, 0)), Verdict::Suspicious);
    }

    #[test]
    fn test_segment_floor_boundary() {
        assert_eq!(classify(&metrics(15, 300, 0)), Verdict::Suspicious);
        assert_eq!(classify(&metrics(16, 300, 0)), Verdict::Benign);
    }

    // ===========================================
    // Duration rule
    // ===========================================

    #[test]
    fn test_long_session_is_benign() {
        assert_eq!(classify(&metrics(16, 300, 0)), Verdict::Benign);
        assert_eq!(classify(&metrics(100, 86_400, 0)), Verdict::Benign);
    }

    #[test]
    fn test_duration_boundary() {
        assert_eq!(classify(&metrics(16, 299, 0)), Verdict::Suspicious);
        assert_eq!(classify(&metrics(16, 300, 0)), Verdict::Benign);
    }

    // ===========================================
    // Volume rule
    // ===========================================

    #[test]
    fn test_high_volume_short_session_is_benign() {
        assert_eq!(classify(&metrics(16, 1, 4096)), Verdict::Benign);
    }

    #[test]
    fn test_volume_boundary() {
        assert_eq!(classify(&metrics(16, 0, 4095)), Verdict::Suspicious);
        assert_eq!(classify(&metrics(16, 0, 4096)), Verdict::Benign);
    }

    // ===========================================
    // Fallthrough
    // ===========================================

    #[test]
    fn test_short_quiet_session_is_suspicious() {
        assert_eq!(classify(&metrics(20, 5, 100)), Verdict::Suspicious);
    }

    // ===========================================
    // ConnMetrics construction
    // ===========================================

    #[test]
    fn test_metrics_from_snapshot() {
        let snapshot = TcpSnapshot {
            state: TcpState::Established,
            segments_in: 42,
            bytes_acked: 8192,
        };
        let m = ConnMetrics::new(&snapshot, 17);
        assert_eq!(m.segments_in, 42);
        assert_eq!(m.elapsed_secs, 17);
        assert_eq!(m.bytes_acked, 8192);
    }
}
