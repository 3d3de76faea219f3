// SPDX-License-Identifier: Apache-2.0
//! Interaction controller for reaction buttons.
//!
//! Each button is a small state machine: `Idle` or `Pending`. A click on an
//! idle button applies the optimistic delta immediately (count, badge,
//! reacted styling), goes `Pending`, and sends the submission; clicks while
//! `Pending` are ignored so a double click can neither send two requests nor
//! apply the delta twice. The response reconciles the displayed count to the
//! server's authoritative value — overwriting the optimistic guess, which is
//! how drift from concurrent reactors gets corrected — and only then touches
//! the ledger. A rejection or a network failure rolls everything back to the
//! pre-click snapshot and leaves the ledger alone; there is no retry.
//!
//! The three steps are named transitions ([`ReactionPanel::begin_click`],
//! the transport call, [`ReactionPanel::resolve`]) so each is testable on
//! its own; [`ReactionPanel::click`] composes them, with the transport call
//! as the only suspension point.

use std::collections::BTreeMap;

use reactions_catalog::BriefReaction;
use reactions_ledger::{LedgerSession, TokenStore};
use reactions_proto::{CommentId, ReactionAction, SubmitRequest, SubmitResponse};
use thiserror::Error;

/// Transport seam: carries one submission to the server.
pub trait SubmitTransport {
    /// POST the request for `comment_id`; resolves to the server's verdict.
    fn submit(
        &self,
        comment_id: CommentId,
        request: &SubmitRequest,
    ) -> impl std::future::Future<Output = Result<SubmitResponse, TransportError>>;
}

/// Failure to reach the server or to read its response.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Request never completed (connection refused, timeout, lost response).
    #[error("network error: {0}")]
    Network(String),
}

/// Button lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight; clicks are accepted.
    Idle,
    /// A submission is in flight; further clicks are ignored.
    Pending,
}

/// View-model for one rendered reaction button. The render layer observes
/// these; the controller is the only writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    /// Reaction alias this button submits.
    pub alias: String,
    /// Displayed count.
    pub count: u64,
    /// Whether this browser's ledger says the visitor reacted.
    pub reacted: bool,
    /// Whether the count badge is shown (hidden at zero).
    pub badge_visible: bool,
    /// Default-visible buttons stay rendered at count zero; others are
    /// removed when their count drops to zero.
    pub always_visible: bool,
    phase: Phase,
}

impl ButtonState {
    fn new(alias: &str, count: u64, reacted: bool, always_visible: bool) -> Self {
        Self {
            alias: alias.to_string(),
            count,
            reacted,
            badge_visible: count > 0,
            always_visible,
            phase: Phase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

/// Snapshot taken before the optimistic update, for rollback.
#[derive(Debug, Clone)]
struct Snapshot {
    state: ButtonState,
    position: usize,
    removed: bool,
}

/// An accepted click: the request to send plus what to restore on failure.
#[derive(Debug, Clone)]
pub struct PendingClick {
    /// Comment the click targets.
    pub comment_id: CommentId,
    /// The submission to send.
    pub request: SubmitRequest,
    snapshot: Snapshot,
}

/// Outcome of a click after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Server applied the mutation; carries the authoritative count.
    Applied(u64),
    /// Server rejected it or the network failed; optimistic state was
    /// rolled back. The visitor sees "nothing happened".
    Rejected,
    /// Click ignored (request already in flight, or no such button).
    Ignored,
}

/// Controller for all reaction buttons on one page.
///
/// Owns the per-page [`LedgerSession`] (constructed once, passed in — the
/// ledger is explicit state, not a module global) and the catalog brief for
/// the add-new-reaction picker.
pub struct ReactionPanel<T, S> {
    transport: T,
    ledger: LedgerSession<S>,
    catalog: Vec<BriefReaction>,
    buttons: BTreeMap<CommentId, Vec<ButtonState>>,
}

impl<T, S> ReactionPanel<T, S>
where
    T: SubmitTransport,
    S: TokenStore,
{
    /// Create an empty panel. The ledger must already be loaded; hydration
    /// reads it, so load-before-hydrate is enforced by construction.
    pub fn new(transport: T, ledger: LedgerSession<S>, catalog: Vec<BriefReaction>) -> Self {
        Self {
            transport,
            ledger,
            catalog,
            buttons: BTreeMap::new(),
        }
    }

    /// Register the server-rendered buttons of one comment. `reacted`
    /// styling is initialized from the ledger; `always_visible` marks the
    /// aliases rendered even at count zero.
    pub fn hydrate(
        &mut self,
        comment_id: CommentId,
        rendered: &[(String, u64)],
        always_visible: &[&str],
    ) {
        let buttons = rendered
            .iter()
            .map(|(alias, count)| {
                let reacted = self.ledger.has(comment_id, alias);
                ButtonState::new(alias, *count, reacted, always_visible.contains(&alias.as_str()))
            })
            .collect();
        self.buttons.insert(comment_id, buttons);
    }

    /// All buttons currently rendered for a comment, in display order.
    pub fn buttons(&self, comment_id: CommentId) -> &[ButtonState] {
        self.buttons.get(&comment_id).map_or(&[], Vec::as_slice)
    }

    /// One button by alias.
    pub fn button(&self, comment_id: CommentId, alias: &str) -> Option<&ButtonState> {
        self.buttons(comment_id).iter().find(|b| b.alias == alias)
    }

    /// Read access to the ledger session.
    pub fn ledger(&self) -> &LedgerSession<S> {
        &self.ledger
    }

    /// Transition 1: accept a click and apply the optimistic update.
    ///
    /// Returns `None` when the button is unknown or already `Pending` (the
    /// re-entrancy guard). Otherwise the button flips visual state, the
    /// count moves by ±1 (a revert that lands on zero hides the badge and
    /// removes a non-always-visible button), and the caller gets the
    /// request to send plus the rollback snapshot.
    pub fn begin_click(&mut self, comment_id: CommentId, alias: &str) -> Option<PendingClick> {
        let buttons = self.buttons.get_mut(&comment_id)?;
        let position = buttons.iter().position(|b| b.alias == alias)?;
        if buttons[position].phase == Phase::Pending {
            return None;
        }

        let snapshot_state = buttons[position].clone();
        let action = if snapshot_state.reacted {
            ReactionAction::Revert
        } else {
            ReactionAction::React
        };

        let button = &mut buttons[position];
        button.phase = Phase::Pending;
        let mut removed = false;
        match action {
            ReactionAction::React => {
                button.count += 1;
                button.badge_visible = true;
                button.reacted = true;
            }
            ReactionAction::Revert => {
                button.count = button.count.saturating_sub(1);
                button.reacted = false;
                if button.count == 0 {
                    button.badge_visible = false;
                    if !button.always_visible {
                        buttons.remove(position);
                        removed = true;
                    }
                }
            }
        }

        Some(PendingClick {
            comment_id,
            request: SubmitRequest {
                reaction: alias.to_string(),
                action,
            },
            snapshot: Snapshot {
                state: snapshot_state,
                position,
                removed,
            },
        })
    }

    /// Transition 2: reconcile a pending click with the server's verdict.
    ///
    /// Success overwrites the optimistic count with the authoritative one
    /// and updates + persists the ledger. Rejection and network failure are
    /// handled identically: restore the pre-click snapshot, ledger
    /// untouched.
    pub fn resolve(
        &mut self,
        pending: PendingClick,
        outcome: Result<SubmitResponse, TransportError>,
    ) -> ClickOutcome {
        match outcome {
            Ok(response) if response.success => {
                let count = response.count.unwrap_or(0);
                self.reconcile(&pending, count);
                let alias = &pending.request.reaction;
                match pending.request.action {
                    ReactionAction::React => self.ledger.add(pending.comment_id, alias),
                    ReactionAction::Revert => self.ledger.remove(pending.comment_id, alias),
                }
                self.ledger.persist();
                ClickOutcome::Applied(count)
            }
            Ok(_) | Err(_) => {
                self.rollback(&pending);
                ClickOutcome::Rejected
            }
        }
    }

    /// Click a rendered button: optimistic update, submission,
    /// reconciliation. Ignored while a request for the same button is in
    /// flight.
    pub async fn click(&mut self, comment_id: CommentId, alias: &str) -> ClickOutcome {
        let Some(pending) = self.begin_click(comment_id, alias) else {
            return ClickOutcome::Ignored;
        };
        let outcome = self.transport.submit(comment_id, &pending.request).await;
        self.resolve(pending, outcome)
    }

    /// The add-new-reaction picker. An alias already rendered on the comment
    /// is re-clicked instead of duplicated; a catalog alias not yet present
    /// synthesizes a fresh button (count zero, not reacted) and drives it
    /// through the same click transition. Aliases outside the catalog are
    /// ignored.
    pub async fn pick(&mut self, comment_id: CommentId, alias: &str) -> ClickOutcome {
        if self.button(comment_id, alias).is_none() {
            if !self.catalog.iter().any(|b| b.alias == alias) {
                return ClickOutcome::Ignored;
            }
            self.buttons
                .entry(comment_id)
                .or_default()
                .push(ButtonState::new(alias, 0, false, false));
        }
        self.click(comment_id, alias).await
    }

    fn reconcile(&mut self, pending: &PendingClick, count: u64) {
        let Some(buttons) = self.buttons.get_mut(&pending.comment_id) else {
            return;
        };
        let alias = &pending.request.reaction;
        if let Some(button) = buttons.iter_mut().find(|b| b.alias == *alias) {
            button.count = count;
            button.badge_visible = count > 0;
            button.phase = Phase::Idle;
        } else if count > 0 {
            // The optimistic revert removed the button but concurrent
            // reactors kept the server count above zero; bring it back.
            let mut button = ButtonState::new(alias, count, false, false);
            button.badge_visible = true;
            buttons.push(button);
        }
    }

    fn rollback(&mut self, pending: &PendingClick) {
        let Some(buttons) = self.buttons.get_mut(&pending.comment_id) else {
            return;
        };
        let snapshot = &pending.snapshot;
        if snapshot.removed {
            let position = snapshot.position.min(buttons.len());
            buttons.insert(position, snapshot.state.clone());
        } else if let Some(button) = buttons
            .iter_mut()
            .find(|b| b.alias == snapshot.state.alias)
        {
            *button = snapshot.state.clone();
        }
    }
}
