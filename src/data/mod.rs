//! Core data models for parkpass
//!
//! Athlete identifiers, the cached profile payload, and the clients used to
//! fetch and parse parkrun profile pages.

pub mod athlete;
pub mod parkrun;
pub mod profile_page;

pub use athlete::{AthleteId, AthleteIdError};
pub use parkrun::{FetchError, ParkrunClient, ProfilePage, ProfileSource};
pub use profile_page::{FirstHeadingExtractor, NameExtractor};

use serde::{Deserialize, Serialize};

/// The part of an athlete's profile that is kept and cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Display name as shown on the profile page
    pub name: String,
}

impl AthleteProfile {
    /// Encodes the profile as the `{"name": ...}` payload served and cached
    pub fn to_json(&self) -> String {
        serde_json::json!({ "name": self.name }).to_string()
    }
}

/// Headers from the inbound request that may be forwarded upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHints {
    /// `User-Agent` of the caller
    pub user_agent: Option<String>,
    /// Caller's IP address
    pub real_ip: Option<String>,
    /// `Cookie` header of the caller
    pub cookie: Option<String>,
}
