//! Heartbeat controller
//!
//! Runs the periodic heartbeat for one session: `Idle -> Armed ->
//! {AwaitingAck -> Acked -> Armed} | Timeout`. Armed on the server's
//! Hello with its interval; the first beat waits an additional jittered
//! delay so reconnecting fleets do not beat in lockstep. A beat that is
//! never acknowledged before the next one is due signals a timeout to the
//! owning session, which is the only liveness check a steady-state
//! connection has.

use crate::protocol::Envelope;
use crate::session::SequenceWatermark;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle to a running heartbeat task
pub struct Heartbeater {
    ack_pending: Arc<AtomicBool>,
    beats_sent: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl Heartbeater {
    /// Arm the controller: spawns the timer task.
    ///
    /// Outbound beats go through `outbound` (the session's serialized
    /// writer); a missed ack sends one message on `timeout` and stops the
    /// task.
    pub fn spawn(
        interval: Duration,
        sequence: Arc<SequenceWatermark>,
        outbound: mpsc::Sender<Envelope>,
        timeout: mpsc::Sender<()>,
    ) -> Self {
        let ack_pending = Arc::new(AtomicBool::new(false));
        let beats_sent = Arc::new(AtomicU64::new(0));

        let pending = ack_pending.clone();
        let beats = beats_sent.clone();
        let task = tokio::spawn(async move {
            let jitter = interval.mul_f64(rand::random::<f64>());
            tokio::time::sleep(jitter).await;

            loop {
                // Ack still outstanding from the previous beat: the
                // connection is zombied.
                if pending.swap(true, Ordering::SeqCst) {
                    tracing::warn!("heartbeat ack missed, signaling timeout");
                    let _ = timeout.send(()).await;
                    return;
                }

                let beat = Envelope::heartbeat(sequence.get());
                if outbound.send(beat).await.is_err() {
                    // Session writer is gone; nothing left to do.
                    return;
                }
                beats.fetch_add(1, Ordering::SeqCst);

                tokio::time::sleep(interval).await;
            }
        });

        Self {
            ack_pending,
            beats_sent,
            task,
        }
    }

    /// Record a heartbeat-ack from the server
    pub fn record_ack(&self) {
        self.ack_pending.store(false, Ordering::SeqCst);
    }

    /// Whether a beat is awaiting acknowledgement
    #[must_use]
    pub fn is_ack_pending(&self) -> bool {
        self.ack_pending.load(Ordering::SeqCst)
    }

    /// Number of beats sent since the controller was armed
    #[must_use]
    pub fn beats_sent(&self) -> u64 {
        self.beats_sent.load(Ordering::SeqCst)
    }

    /// Cancel the timer task immediately
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for Heartbeater {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Opcode;

    fn watermark_at(seq: u64) -> Arc<SequenceWatermark> {
        let watermark = Arc::new(SequenceWatermark::new());
        watermark.observe(seq);
        watermark
    }

    #[tokio::test(start_paused = true)]
    async fn test_beats_carry_the_watermark() {
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let (timeout_tx, _timeout_rx) = mpsc::channel(1);

        let hb = Heartbeater::spawn(
            Duration::from_millis(100),
            watermark_at(42),
            outbound_tx,
            timeout_tx,
        );

        let beat = outbound_rx.recv().await.unwrap();
        assert_eq!(beat.op, Opcode::Heartbeat);
        assert_eq!(beat.d, serde_json::json!(42));
        assert!(hb.is_ack_pending());

        hb.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ack_times_out_before_third_beat() {
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let (timeout_tx, mut timeout_rx) = mpsc::channel(1);

        let hb = Heartbeater::spawn(
            Duration::from_millis(100),
            Arc::new(SequenceWatermark::new()),
            outbound_tx,
            timeout_tx,
        );

        // First beat goes out, never acked.
        let first = outbound_rx.recv().await.unwrap();
        assert_eq!(first.op, Opcode::Heartbeat);

        // The timeout arrives instead of a second beat.
        timeout_rx.recv().await.unwrap();
        assert_eq!(hb.beats_sent(), 1);
        assert!(outbound_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acked_beats_keep_flowing() {
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let (timeout_tx, mut timeout_rx) = mpsc::channel(1);

        let hb = Heartbeater::spawn(
            Duration::from_millis(100),
            Arc::new(SequenceWatermark::new()),
            outbound_tx,
            timeout_tx,
        );

        for _ in 0..3 {
            outbound_rx.recv().await.unwrap();
            hb.record_ack();
        }

        assert_eq!(hb.beats_sent(), 3);
        assert!(timeout_rx.try_recv().is_err());
        hb.shutdown();
    }
}
