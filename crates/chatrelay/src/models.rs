//! These models represent the objects that flow through the relay
//!
//! There are three related formats we need to interact with:
//! - chat messages sent from the interface, optionally annotated by auxiliary agents
//! - role/content turns sent from the relay to each provider
//! - normalized stream frames sent from the relay back to the interface
//!
//! Provider specific wire shapes live next to their provider in `crate::providers`.
pub mod frame;
pub mod message;
