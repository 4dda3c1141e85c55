// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The closed event category vocabulary.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of event categories. A new category cannot be introduced
/// without a code change, matching the "closed enum" invariant.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Amplifier,
    Bots,
    Backdoor,
    Cnc,
    Deface,
    DnsQuery,
    DosAttacker,
    DosVictim,
    Flow,
    FlowAnomaly,
    Fraud,
    Leak,
    Malurl,
    MalwareAction,
    Phish,
    Proxy,
    SandboxUrl,
    Scam,
    Scanning,
    ServerExploit,
    Spam,
    SpamUrl,
    Tor,
    Vulnerable,
    Webinject,
    Other,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::Amplifier,
        Category::Bots,
        Category::Backdoor,
        Category::Cnc,
        Category::Deface,
        Category::DnsQuery,
        Category::DosAttacker,
        Category::DosVictim,
        Category::Flow,
        Category::FlowAnomaly,
        Category::Fraud,
        Category::Leak,
        Category::Malurl,
        Category::MalwareAction,
        Category::Phish,
        Category::Proxy,
        Category::SandboxUrl,
        Category::Scam,
        Category::Scanning,
        Category::ServerExploit,
        Category::Spam,
        Category::SpamUrl,
        Category::Tor,
        Category::Vulnerable,
        Category::Webinject,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Amplifier => "amplifier",
            Category::Bots => "bots",
            Category::Backdoor => "backdoor",
            Category::Cnc => "cnc",
            Category::Deface => "deface",
            Category::DnsQuery => "dns-query",
            Category::DosAttacker => "dos-attacker",
            Category::DosVictim => "dos-victim",
            Category::Flow => "flow",
            Category::FlowAnomaly => "flow-anomaly",
            Category::Fraud => "fraud",
            Category::Leak => "leak",
            Category::Malurl => "malurl",
            Category::MalwareAction => "malware-action",
            Category::Phish => "phish",
            Category::Proxy => "proxy",
            Category::SandboxUrl => "sandbox-url",
            Category::Scam => "scam",
            Category::Scanning => "scanning",
            Category::ServerExploit => "server-exploit",
            Category::Spam => "spam",
            Category::SpamUrl => "spam-url",
            Category::Tor => "tor",
            Category::Vulnerable => "vulnerable",
            Category::Webinject => "webinject",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PipelineError::invalid_event(format!("unknown category {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), *c);
        }
    }

    #[test]
    fn rejects_unknown_category() {
        assert!("not-a-category".parse::<Category>().is_err());
    }
}
