//! Jid - XMPP-style address used for the `service` and `domain` columns
//!
//! Format: `[local@]domain[/resource]`
//!
//! Examples:
//! - `push.example`
//! - `p2@push.example/relay`
//!
//! Local part and domain are case-insensitive and stored lowercased; the
//! resource keeps its case. Every value written to or read from the database
//! goes through [`Jid::to_canonical_string`].

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    /// Node part before the `@`, if any
    pub local: Option<String>,
    /// Domain part, never empty
    pub domain: String,
    /// Resource part after the `/`, if any
    pub resource: Option<String>,
}

impl Jid {
    /// A bare domain address such as `push.example`
    ///
    /// Goes through [`Jid::parse`]; input with a local part or resource is rejected.
    pub fn domain(domain: &str) -> Result<Self> {
        let jid = Self::parse(domain)?;
        if jid.local.is_some() || jid.resource.is_some() {
            return Err(Error::InvalidAddress(format!("not a bare domain: {}", domain)));
        }
        Ok(jid)
    }

    /// Parse an address string into its canonical form
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidAddress("address must not be empty".to_string()));
        }

        let (bare, resource) = match input.split_once('/') {
            Some((bare, resource)) => {
                if resource.is_empty() {
                    return Err(Error::InvalidAddress(format!("empty resource in {}", input)));
                }
                (bare, Some(resource.to_string()))
            }
            None => (input, None),
        };

        let (local, domain) = match bare.split_once('@') {
            Some((local, domain)) => {
                if local.is_empty() {
                    return Err(Error::InvalidAddress(format!("empty local part in {}", input)));
                }
                (Some(local.to_lowercase()), domain)
            }
            None => (None, bare),
        };

        let domain = normalize_domain(domain);
        if domain.is_empty() || domain.contains('@') {
            return Err(Error::InvalidAddress(format!("invalid domain in {}", input)));
        }

        Ok(Self { local, domain, resource })
    }

    /// The address without its resource
    pub fn bare(&self) -> Self {
        Self {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    /// Canonical string form, as stored in the database
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        if let Some(local) = &self.local {
            out.push_str(local);
            out.push('@');
        }
        out.push_str(&self.domain);
        if let Some(resource) = &self.resource {
            out.push('/');
            out.push_str(resource);
        }
        out
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim_end_matches('.').to_lowercase()
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Jid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl ToSql for Jid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_canonical_string()))
    }
}

impl FromSql for Jid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Jid::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Serialize for Jid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Jid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Jid::parse(&s).map_err(serde::de::Error::custom)
    }
}
