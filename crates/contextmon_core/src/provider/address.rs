//! Address routing for the broadcast collection.
//!
//! Two patterns are registered: `<authority>/broadcasts` and
//! `<authority>/broadcasts/<digits>`, each optionally prefixed with
//! `content://`.

use super::{ProviderError, ProviderResult};
use crate::model::broadcast::{BroadcastId, TABLE_NAME};
use once_cell::sync::Lazy;
use regex::Regex;

pub const CONTENT_SCHEME: &str = "content://";

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:content://)?([^/\s]+)/([^/\s]+)(?:/([0-9]+))?$")
        .expect("valid address regex")
});

/// Routing decision for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Every row of the table.
    Collection,
    /// One row by store id.
    Item(BroadcastId),
}

/// Matches addresses registered under one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMatcher {
    authority: String,
}

impl AddressMatcher {
    pub fn new(authority: &str) -> ProviderResult<Self> {
        let authority = authority.trim();
        if !is_valid_authority(authority) {
            return Err(ProviderError::InvalidAuthority(authority.to_string()));
        }
        Ok(Self {
            authority: authority.to_string(),
        })
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Resolves `address` into a [`Route`].
    ///
    /// A digit segment too large for an id is treated as unrecognized.
    pub fn resolve(&self, address: &str) -> ProviderResult<Route> {
        let unrecognized = || ProviderError::UnrecognizedAddress(address.to_string());
        let captures = ADDRESS_RE.captures(address).ok_or_else(unrecognized)?;

        if &captures[1] != self.authority || &captures[2] != TABLE_NAME {
            return Err(unrecognized());
        }

        match captures.get(3) {
            None => Ok(Route::Collection),
            Some(segment) => segment
                .as_str()
                .parse::<BroadcastId>()
                .map(Route::Item)
                .map_err(|_| unrecognized()),
        }
    }

    /// `content://<authority>/broadcasts`
    pub fn collection_address(&self) -> String {
        format!("{CONTENT_SCHEME}{}/{TABLE_NAME}", self.authority)
    }

    /// `content://<authority>/broadcasts/<id>`
    pub fn item_address(&self, id: BroadcastId) -> String {
        format!("{}/{id}", self.collection_address())
    }

    /// Canonical address of a route, used as the notification key.
    pub fn canonical_address(&self, route: Route) -> String {
        match route {
            Route::Collection => self.collection_address(),
            Route::Item(id) => self.item_address(id),
        }
    }
}

fn is_valid_authority(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| !c.is_whitespace() && c != '/' && c != ':')
}
