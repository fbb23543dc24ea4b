use std::fmt;

use crate::error::{CaptureError, Result};

/// Address a publish socket binds to, e.g. `tcp://*:5555`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishEndpoint {
    address: String,
}

impl PublishEndpoint {
    /// TCP endpoint on every local interface.
    pub fn all_interfaces(port: u16) -> Self {
        Self {
            address: format!("tcp://*:{}", port),
        }
    }

    /// Parse a transport address. Accepts `tcp://host:port` (host may be `*`,
    /// port may be `*` for an ephemeral port), `ipc://path` and
    /// `inproc://name`.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let (scheme, rest) = address
            .split_once("://")
            .ok_or_else(|| CaptureError::bind(address, "missing transport scheme"))?;
        if rest.is_empty() {
            return Err(CaptureError::bind(address, "missing transport address"));
        }
        match scheme {
            "tcp" => {
                let (host, port) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| CaptureError::bind(address, "tcp endpoint needs a port"))?;
                if host.is_empty() {
                    return Err(CaptureError::bind(address, "tcp endpoint needs a host"));
                }
                if port != "*" {
                    match port.parse::<u16>() {
                        Ok(0) | Err(_) => {
                            return Err(CaptureError::bind(
                                address,
                                format!("invalid tcp port '{}'", port),
                            ))
                        }
                        Ok(_) => {}
                    }
                }
            }
            "ipc" | "inproc" => {}
            other => {
                return Err(CaptureError::bind(
                    address,
                    format!("unsupported transport '{}'", other),
                ))
            }
        }
        Ok(Self {
            address: address.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// TCP port, when the endpoint names a fixed one.
    pub fn port(&self) -> Option<u16> {
        let rest = self.address.strip_prefix("tcp://")?;
        rest.rsplit_once(':')?.1.parse().ok()
    }
}

impl fmt::Display for PublishEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
