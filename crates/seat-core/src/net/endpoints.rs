//! The network endpoint set of a session
//!
//! A session talks to five OSC destinations: the Unity display, the TASCAR
//! renderer and three TASCAR sample players. Endpoints are opened once during
//! setup, used send-only, and closed when the session ends.

use crate::config::AppConfig;
use crate::error::Result;
use crate::net::address::resolve_endpoints;
use crate::net::osc::{OscSink, UdpOscClient};
use std::fmt;

/// One of the three sample players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerSource {
    Source1,
    Source2,
    Source3,
}

impl SamplerSource {
    /// Source name as it appears in OSC addresses
    pub fn name(self) -> &'static str {
        match self {
            SamplerSource::Source1 => "source1",
            SamplerSource::Source2 => "source2",
            SamplerSource::Source3 => "source3",
        }
    }

    fn index(self) -> usize {
        match self {
            SamplerSource::Source1 => 0,
            SamplerSource::Source2 => 1,
            SamplerSource::Source3 => 2,
        }
    }
}

impl fmt::Display for SamplerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Send-only channels to every destination of a session
pub struct NetworkEndpoints {
    pub display: Box<dyn OscSink>,
    pub renderer: Box<dyn OscSink>,
    samplers: [Box<dyn OscSink>; 3],
}

impl NetworkEndpoints {
    pub fn new(
        display: Box<dyn OscSink>,
        renderer: Box<dyn OscSink>,
        samplers: [Box<dyn OscSink>; 3],
    ) -> Self {
        Self {
            display,
            renderer,
            samplers,
        }
    }

    pub fn sampler(&self, source: SamplerSource) -> &dyn OscSink {
        self.samplers[source.index()].as_ref()
    }
}

impl fmt::Debug for NetworkEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkEndpoints").finish_non_exhaustive()
    }
}

/// Opens the endpoint set for a session.
///
/// `config` is mutable so that addresses resolved from the environment are
/// persisted back into it.
pub trait EndpointOpener {
    fn open(&self, config: &mut AppConfig) -> Result<NetworkEndpoints>;
}

/// Opens one UDP OSC client per destination
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpEndpointOpener;

impl EndpointOpener for UdpEndpointOpener {
    fn open(&self, config: &mut AppConfig) -> Result<NetworkEndpoints> {
        let addrs = resolve_endpoints(config)?;
        tracing::info!(
            display = %addrs.display,
            renderer = %addrs.renderer,
            sampler1 = %addrs.samplers[0],
            sampler2 = %addrs.samplers[1],
            sampler3 = %addrs.samplers[2],
            "Opening OSC endpoints"
        );

        let connect = |addr| -> Result<Box<dyn OscSink>> {
            Ok(Box::new(UdpOscClient::connect(addr)?))
        };
        let [s1, s2, s3] = addrs.samplers;
        Ok(NetworkEndpoints::new(
            connect(addrs.display)?,
            connect(addrs.renderer)?,
            [connect(s1)?, connect(s2)?, connect(s3)?],
        ))
    }
}
