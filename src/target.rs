//! Work-item tokens and their expansion into concrete IPv4 addresses.
//!
//! A target file holds one token per line. A token is either a plain IPv4
//! literal, an inclusive dash-separated range, or a CIDR block. Expansion is
//! a pure function of the token text: the same token always yields the same
//! ascending, duplicate-free address list.

use std::net::Ipv4Addr;
use std::str::FromStr;

use cidr_utils::cidr::{Ipv4Cidr, Ipv4Inet};
use cidr_utils::Ipv4CidrSize;
use thiserror::Error;

/// Ways a work-item token can fail to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token is neither a range nor a CIDR and does not parse as an
    /// IPv4 literal.
    #[error("'{0}' is not a valid IPv4 address")]
    MalformedAddress(String),
    /// A dash-separated token whose endpoints do not parse, or whose start
    /// is numerically above its end.
    #[error("'{0}' is not a valid IPv4 range")]
    MalformedRange(String),
    /// A token containing `/` that does not parse as network/prefix.
    #[error("'{0}' is not a valid CIDR block")]
    MalformedCidr(String),
}

/// One entry of the target file.
#[derive(Debug, Clone)]
pub enum WorkItem {
    /// A single IPv4 literal, e.g. `10.0.0.1`.
    Single(Ipv4Addr),
    /// An inclusive address interval, e.g. `10.0.0.1-10.0.0.20`.
    Range(Ipv4Addr, Ipv4Addr),
    /// A CIDR block, e.g. `10.0.0.0/24`.
    Cidr(Ipv4Cidr),
}

impl FromStr for WorkItem {
    type Err = TokenError;

    /// Classifies the token by syntax: `/` means CIDR, otherwise `-` means
    /// range, otherwise a single literal. A reversed range is rejected
    /// rather than treated as empty.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.contains('/') {
            // Parsed as an inet first so host bits are tolerated; the scan
            // covers the enclosing network either way.
            return Ipv4Inet::from_str(token)
                .map(|inet| WorkItem::Cidr(inet.network()))
                .map_err(|_| TokenError::MalformedCidr(token.to_owned()));
        }
        if let Some((start, end)) = token.split_once('-') {
            let malformed = || TokenError::MalformedRange(token.to_owned());
            let start = Ipv4Addr::from_str(start.trim()).map_err(|_| malformed())?;
            let end = Ipv4Addr::from_str(end.trim()).map_err(|_| malformed())?;
            if u32::from(start) > u32::from(end) {
                return Err(malformed());
            }
            return Ok(WorkItem::Range(start, end));
        }
        Ipv4Addr::from_str(token)
            .map(WorkItem::Single)
            .map_err(|_| TokenError::MalformedAddress(token.to_owned()))
    }
}

impl WorkItem {
    /// Expands the item into every concrete address it covers, ascending.
    ///
    /// CIDR blocks wider than two addresses drop their network and broadcast
    /// addresses; /31 and /32 keep everything, matching standard host
    /// enumeration.
    #[must_use]
    pub fn expand(&self) -> Vec<Ipv4Addr> {
        match self {
            WorkItem::Single(ip) => vec![*ip],
            WorkItem::Range(start, end) => (u32::from(*start)..=u32::from(*end))
                .map(Ipv4Addr::from)
                .collect(),
            WorkItem::Cidr(cidr) => {
                let mut hosts: Vec<Ipv4Addr> = cidr.iter().map(|inet| inet.address()).collect();
                if hosts.len() > 2 {
                    hosts.remove(0);
                    hosts.pop();
                }
                hosts
            }
        }
    }

    /// Number of addresses the raw entry spans, network and broadcast
    /// included. Used to order the target file smallest-first.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            WorkItem::Single(_) => 1,
            WorkItem::Range(start, end) => {
                u64::from(u32::from(*end)) - u64::from(u32::from(*start)) + 1
            }
            WorkItem::Cidr(cidr) => cidr.size(),
        }
    }
}
