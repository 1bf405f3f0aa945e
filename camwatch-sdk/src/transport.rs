//! Publication transports.
//!
//! A transport hands a frame and its camera info to subscribers as one unit.
//! camwatch does not ship a network transport; [`ChannelTransport`] is an
//! in-process broadcast used by the CLI and tests.

use camwatch_types::{CameraInfo, Frame};

/// Publishes a frame together with its camera info.
pub trait Transport: Send + Sync {
    /// Hand the pair to subscribers. Must not block.
    fn publish(&self, frame: Frame, info: CameraInfo);

    /// Number of live subscribers.
    fn subscriber_count(&self) -> usize;
}

/// A frame and its camera info, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub frame: Frame,
    pub info: CameraInfo,
}

#[cfg(feature = "tokio")]
pub use self::channel::ChannelTransport;

#[cfg(feature = "tokio")]
mod channel {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use camwatch_types::{CameraInfo, Frame};
    use tokio::sync::broadcast;
    use tracing::trace;

    use super::{Published, Transport};

    /// In-process broadcast transport on `tokio::sync::broadcast`.
    ///
    /// Slow subscribers lag and lose the oldest frames instead of blocking
    /// the publisher.
    ///
    /// ```rust
    /// use camwatch_sdk::{ChannelTransport, Transport};
    /// use camwatch_types::{CameraInfo, Calibration, Frame};
    /// use std::sync::Arc;
    ///
    /// let transport = ChannelTransport::new(8);
    /// let mut rx = transport.subscribe();
    /// assert_eq!(transport.subscriber_count(), 1);
    ///
    /// let frame = Frame::new("mono8", 2, 2, vec![0; 4]);
    /// let info = CameraInfo::new(frame.header.clone(), Arc::new(Calibration::uncalibrated()));
    /// transport.publish(frame, info);
    ///
    /// let published = rx.try_recv().unwrap();
    /// assert!(published.info.matches(&published.frame));
    /// ```
    #[derive(Debug)]
    pub struct ChannelTransport {
        tx: broadcast::Sender<Arc<Published>>,
        published: AtomicU64,
    }

    impl ChannelTransport {
        pub fn new(capacity: usize) -> Self {
            let (tx, _) = broadcast::channel(capacity.max(1));
            Self {
                tx,
                published: AtomicU64::new(0),
            }
        }

        pub fn subscribe(&self) -> broadcast::Receiver<Arc<Published>> {
            self.tx.subscribe()
        }

        /// Frames handed to the transport so far, whether or not anyone was
        /// listening.
        pub fn published(&self) -> u64 {
            self.published.load(Ordering::Relaxed)
        }
    }

    impl Transport for ChannelTransport {
        fn publish(&self, frame: Frame, info: CameraInfo) {
            self.published.fetch_add(1, Ordering::Relaxed);
            let seq = frame.header.seq;
            if self.tx.send(Arc::new(Published { frame, info })).is_err() {
                trace!(seq, "no subscribers for frame");
            }
        }

        fn subscriber_count(&self) -> usize {
            self.tx.receiver_count()
        }
    }

}
