// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat addresses accepted as send recipients and group identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WagateError;

/// Server part of a chat address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressServer {
    /// A regular user account (`s.whatsapp.net`, alias `c.us`).
    User,
    /// A group chat (`g.us`).
    Group,
    /// A linked identity (`lid`).
    Lid,
    Newsletter,
    Broadcast,
}

impl AddressServer {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressServer::User => "s.whatsapp.net",
            AddressServer::Group => "g.us",
            AddressServer::Lid => "lid",
            AddressServer::Newsletter => "newsletter",
            AddressServer::Broadcast => "broadcast",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "s.whatsapp.net" | "c.us" => Some(AddressServer::User),
            "g.us" => Some(AddressServer::Group),
            "lid" => Some(AddressServer::Lid),
            "newsletter" => Some(AddressServer::Newsletter),
            "broadcast" => Some(AddressServer::Broadcast),
            _ => None,
        }
    }
}

/// A normalized `<user>@<server>` chat address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatAddress {
    user: String,
    server: AddressServer,
}

impl ChatAddress {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn server(&self) -> AddressServer {
        self.server
    }

    pub fn is_group(&self) -> bool {
        self.server == AddressServer::Group
    }

    /// Parse an address that must name a group.
    pub fn parse_group(raw: &str) -> Result<Self, WagateError> {
        let addr: ChatAddress = raw.parse()?;
        if !addr.is_group() {
            return Err(WagateError::Validation(format!(
                "groupJid must be a @g.us address, got `{raw}`"
            )));
        }
        Ok(addr)
    }
}

fn is_phone_number(s: &str) -> bool {
    (7..=15).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for ChatAddress {
    type Err = WagateError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(WagateError::InvalidRecipient(raw.to_string()));
        }

        match s.split_once('@') {
            None => {
                let digits = s.strip_prefix('+').unwrap_or(s);
                if is_phone_number(digits) {
                    Ok(ChatAddress {
                        user: digits.to_string(),
                        server: AddressServer::User,
                    })
                } else {
                    Err(WagateError::InvalidRecipient(raw.to_string()))
                }
            }
            Some((user, server)) => {
                let valid_user = !user.is_empty()
                    && !user.contains('@')
                    && !user.chars().any(char::is_whitespace);
                match AddressServer::parse(server) {
                    Some(server) if valid_user => Ok(ChatAddress {
                        user: user.to_string(),
                        server,
                    }),
                    _ => Err(WagateError::InvalidRecipient(raw.to_string())),
                }
            }
        }
    }
}

impl fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server.as_str())
    }
}

impl Serialize for ChatAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChatAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
