//! Websocket pipeline around the transcript merge core.
//!
//! A producer (the socket's receive side) deserializes incoming token
//! updates into a bounded ring; a consumer drains the ring on a timer,
//! merges each batch, and streams a transcript snapshot back. A client can
//! additionally open a time-bounded listen session that receives running
//! transcription feedback per drain and a terminal result on cancel,
//! timeout, or close.

mod ring;
mod service;
mod session;

pub use ring::UpdateRing;
pub use service::ListenService;
