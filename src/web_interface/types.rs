use serde::Serialize;
use std::collections::HashMap;

use crate::entity::{Cluster, Connection, Credentials, Infobase, Session};
use crate::error_handling::types::WebError;

pub const BAD_REQUEST_MESSAGE: &str = "bad request";
pub const INTERNAL_MESSAGE: &str = "internal problems";

/// API error payload
#[derive(Debug, Serialize, PartialEq)]
pub struct ApiError {
    pub message: String,
}

#[derive(Serialize)]
pub struct ClustersResponse {
    pub clusters: Vec<Cluster>,
}

#[derive(Serialize)]
pub struct InfobasesResponse {
    pub infobases: Vec<Infobase>,
}

#[derive(Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
}

#[derive(Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<Connection>,
}

/// Common inputs of every listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub entrypoint: String,
    pub use_cache: bool,
    pub credentials: Option<Credentials>,
}

impl ListParams {
    /// Builds the parameters from the query string and the `login` /
    /// `password` headers. A blank login and password pair means no
    /// credentials.
    pub fn parse(
        query: &HashMap<String, String>,
        login: Option<String>,
        password: Option<String>,
    ) -> Result<Self, WebError> {
        let entrypoint = query
            .get("entrypoint")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(WebError::MissingEntrypoint)?
            .to_string();

        let use_cache = match query.get("cache") {
            None => false,
            Some(raw) => parse_bool(raw).ok_or_else(|| WebError::InvalidFlag {
                name: "cache",
                value: raw.clone(),
            })?,
        };

        let credentials = Credentials::new(
            login.unwrap_or_default(),
            password.unwrap_or_default(),
        )
        .non_empty();

        Ok(Self {
            entrypoint,
            use_cache,
            credentials,
        })
    }
}

// Accepts the usual spellings: 1/0, t/f, true/false in lower, upper or title case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
