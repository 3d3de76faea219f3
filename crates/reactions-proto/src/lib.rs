// SPDX-License-Identifier: Apache-2.0
//! Wire schema shared by the reaction endpoint and the interaction client.
//!
//! The comment id travels in the URL path (`POST /comment/{id}`); the body is
//! a [`SubmitRequest`]. Responses are a bare `{success, count?}` object — no
//! structured error detail crosses the wire, validation failures collapse to
//! `{"success":false}`. Every successful mutation carries the authoritative
//! count, reverts included; clients must overwrite optimistic guesses with it.

use std::fmt;
use std::str::FromStr;

use reactions_catalog::BriefReaction;
use serde::{Deserialize, Serialize};

/// Comment identifier (positive integer).
pub type CommentId = u64;

/// Direction of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    /// Add one reaction.
    React,
    /// Take back one previously submitted reaction.
    Revert,
}

impl ReactionAction {
    /// Canonical wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Revert => "revert",
        }
    }
}

impl fmt::Display for ReactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an out-of-vocabulary action string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action {:?} (expected react or revert)", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for ReactionAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "react" => Ok(Self::React),
            "revert" => Ok(Self::Revert),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Body of `POST /comment/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Reaction alias; must exist in the catalog.
    pub reaction: String,
    /// Toggle direction. Unknown strings fail deserialization outright.
    pub action: ReactionAction,
}

/// Mutation response. `count` is present exactly when `success` is true and
/// is the authoritative post-mutation count (never negative; zero means the
/// counter entry no longer exists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Whether the mutation was applied.
    pub success: bool,
    /// Authoritative new count after the mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl SubmitResponse {
    /// A successful response carrying the authoritative count.
    pub fn ok(count: u64) -> Self {
        Self {
            success: true,
            count: Some(count),
        }
    }

    /// A rejection. No detail crosses the wire beyond the boolean.
    pub fn rejected() -> Self {
        Self {
            success: false,
            count: None,
        }
    }
}

/// Client-visible configuration handed to the front end at page-render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBootstrap {
    /// Base URL the client posts reaction submissions to.
    pub endpoint_url: String,
    /// Ledger cookie lifetime in days.
    pub cookie_days: u32,
    /// The full catalog in brief form, for the add-new-reaction picker.
    pub catalog: Vec<BriefReaction>,
}
