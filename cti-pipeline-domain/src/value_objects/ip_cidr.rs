// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A minimal IPv4/IPv6 CIDR network, used by an organization's
//! `inside_criteria` to test whether an event's address is "its own
//! network".

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpCidr {
    network: IpAddr,
    prefix: u8,
}

impl IpCidr {
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| PipelineError::invalid_config(format!("{s:?} is not a CIDR network")))?;
        let network: IpAddr = addr
            .parse()
            .map_err(|_| PipelineError::invalid_config(format!("{addr:?} is not a valid IP address")))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| PipelineError::invalid_config(format!("{prefix:?} is not a valid prefix length")))?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max_prefix {
            return Err(PipelineError::invalid_config(format!("prefix /{prefix} exceeds {max_prefix} for {network}")));
        }
        Ok(Self { network, prefix })
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(candidate)) => {
                let mask = prefix_mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(candidate) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(candidate)) => {
                let mask = prefix_mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(candidate) & mask
            }
            _ => false,
        }
    }
}

fn prefix_mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

fn prefix_mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix as u32)
    }
}

impl fmt::Display for IpCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl std::str::FromStr for IpCidr {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IpCidr {
    type Error = PipelineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<IpCidr> for String {
    fn from(cidr: IpCidr) -> Self {
        cidr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_address_within_network() {
        let net = IpCidr::parse("10.20.30.0/24").unwrap();
        assert!(net.contains("10.20.30.41".parse().unwrap()));
        assert!(!net.contains("10.20.31.1".parse().unwrap()));
    }

    #[test]
    fn rejects_oversized_prefix() {
        assert!(IpCidr::parse("10.0.0.0/33").is_err());
    }

    #[test]
    fn handles_ipv6() {
        let net = IpCidr::parse("2001:db8::/32").unwrap();
        assert!(net.contains("2001:db8::1".parse().unwrap()));
        assert!(!net.contains("2001:db9::1".parse().unwrap()));
    }
}
