//! Delivery side of the bridge
//!
//! Processed units are re-packetized for the outbound transport and fanned
//! out to every delivery session through an explicit [`TrackHandle`].
//!
//! # Architecture
//!
//! ```text
//!   RTP source ──► mpsc<Ingress> ──► pump()
//!                                      │
//!                                      ├─► Processor::process_rtp_packet()
//!                                      │
//!                                      └─► Forwarder::forward()
//!                                               │
//!                                          TrackHandle (broadcast)
//!                                               │
//!                              ┌────────────────┼────────────────┐
//!                              ▼                ▼                ▼
//!                          [session]        [session]        [session]
//! ```

pub mod forwarder;
pub mod pump;
pub mod track;

pub use forwarder::Forwarder;
pub use pump::{channel, pump, spawn, Ingress};
pub use track::TrackHandle;
