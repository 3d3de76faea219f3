// SPDX-License-Identifier: Apache-2.0
//! Browser-side memory of which reactions this visitor personally applied.
//!
//! The whole ledger is persisted as one cookie token so it survives page
//! loads without an account. Token format, kept byte-compatible with tokens
//! already in the wild: comma-separated per-comment groups, each group
//! `<comment_id>:<alias1>.<alias2>...`; a comment with no aliases serializes
//! as `<comment_id>:`. Parsing is total — malformed input degrades to
//! whatever parses and never errors, since a corrupt cookie self-heals on
//! the next successful write.
//!
//! The ledger is advisory. It drives "reacted" styling and toggle direction
//! only; counts always come from the server. Cleared cookies, shared
//! browsers, and multiple devices all make it drift, and that is fine.

use std::collections::{BTreeMap, BTreeSet};

/// Comment identifier (positive integer).
pub type CommentId = u64;

/// Parsed ledger: comment id to the set of aliases this browser applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<CommentId, BTreeSet<String>>,
}

impl Ledger {
    /// Parse a ledger token. Never fails; unparseable groups are dropped and
    /// empty alias segments (doubled or trailing dots) are tolerated.
    pub fn parse(token: &str) -> Self {
        let mut entries = BTreeMap::new();
        for group in token.split(',') {
            if group.is_empty() {
                continue;
            }
            let Some((id_part, alias_part)) = group.split_once(':') else {
                continue;
            };
            let Ok(comment_id) = id_part.trim().parse::<CommentId>() else {
                continue;
            };
            let aliases: BTreeSet<String> = alias_part
                .split('.')
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            entries.insert(comment_id, aliases);
        }
        Self { entries }
    }

    /// Serialize back into the token format.
    pub fn encode(&self) -> String {
        let groups: Vec<String> = self
            .entries
            .iter()
            .map(|(comment_id, aliases)| {
                let joined = aliases.iter().cloned().collect::<Vec<_>>().join(".");
                format!("{comment_id}:{joined}")
            })
            .collect();
        groups.join(",")
    }

    /// Whether this browser applied `alias` to `comment_id`.
    pub fn has(&self, comment_id: CommentId, alias: &str) -> bool {
        self.entries
            .get(&comment_id)
            .is_some_and(|aliases| aliases.contains(alias))
    }

    /// Record an applied reaction. Idempotent.
    pub fn add(&mut self, comment_id: CommentId, alias: &str) {
        self.entries
            .entry(comment_id)
            .or_default()
            .insert(alias.to_string());
    }

    /// Forget an applied reaction. Idempotent; the comment entry stays (as an
    /// empty set) so the encoded token keeps the `<id>:` group.
    pub fn remove(&mut self, comment_id: CommentId, alias: &str) {
        if let Some(aliases) = self.entries.get_mut(&comment_id) {
            aliases.remove(alias);
        }
    }

    /// Aliases recorded for one comment.
    pub fn aliases_for(&self, comment_id: CommentId) -> Option<&BTreeSet<String>> {
        self.entries.get(&comment_id)
    }

    /// Whether no reactions are recorded at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Storage port for the single ledger token (the cookie jar seam).
pub trait TokenStore {
    /// Read the current token, if any.
    fn load(&self) -> Option<String>;
    /// Overwrite the token with the given expiry window.
    fn store(&mut self, token: &str, ttl_days: u32);
}

/// Default ledger cookie lifetime in days.
pub const DEFAULT_COOKIE_DAYS: u32 = 30;

/// One page session's ledger: loaded once at construction, mutated in memory,
/// written back explicitly via [`LedgerSession::persist`].
///
/// Constructed once per page and passed to the interaction controller; there
/// is no implicit module-global copy.
pub struct LedgerSession<S> {
    ledger: Ledger,
    store: S,
    cookie_days: u32,
}

impl<S: TokenStore> LedgerSession<S> {
    /// Load the ledger from the store. A missing or malformed token yields an
    /// empty ledger.
    pub fn open(store: S, cookie_days: u32) -> Self {
        let ledger = store
            .load()
            .map(|token| Ledger::parse(&token))
            .unwrap_or_default();
        Self {
            ledger,
            store,
            cookie_days,
        }
    }

    /// Whether this browser applied `alias` to `comment_id`.
    pub fn has(&self, comment_id: CommentId, alias: &str) -> bool {
        self.ledger.has(comment_id, alias)
    }

    /// Record an applied reaction in memory.
    pub fn add(&mut self, comment_id: CommentId, alias: &str) {
        self.ledger.add(comment_id, alias);
    }

    /// Forget an applied reaction in memory.
    pub fn remove(&mut self, comment_id: CommentId, alias: &str) {
        self.ledger.remove(comment_id, alias);
    }

    /// Serialize the in-memory ledger back into the token store with the
    /// configured expiry, overwriting the previous token.
    pub fn persist(&mut self) {
        let token = self.ledger.encode();
        self.store.store(&token, self.cookie_days);
    }

    /// Read access to the in-memory ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}

/// In-memory token store for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Option<String>,
    /// TTL passed with the last store call, for assertions.
    pub last_ttl_days: Option<u32>,
}

impl MemoryTokenStore {
    /// Start with an existing token.
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            last_ttl_days: None,
        }
    }

    /// The stored token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token.clone()
    }

    fn store(&mut self, token: &str, ttl_days: u32) {
        self.token = Some(token.to_string());
        self.last_ttl_days = Some(ttl_days);
    }
}
