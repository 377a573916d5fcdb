//! Network module
//!
//! Everything that leaves the machine goes through here:
//! - OSC message encoding and UDP sending ([`osc`])
//! - Host address resolution with environment fallback ([`address`])
//! - The set of send-only endpoints a session talks to ([`endpoints`])

pub mod address;
pub mod endpoints;
pub mod osc;

pub use endpoints::{EndpointOpener, NetworkEndpoints, UdpEndpointOpener};
pub use osc::{OscSink, OscType, UdpOscClient};
