// SPDX-License-Identifier: Apache-2.0
//! Comment → parent content resolution port.

use std::collections::HashMap;

use reactions_proto::CommentId;
use serde::{Deserialize, Serialize};

use crate::ContentId;

/// Resolves comments to the content (post/page) they belong to.
///
/// The CMS owning the comments is an external collaborator; this port is the
/// seam it plugs into. Existence and parent lookup are one operation since
/// validation and cache scoping always need both.
pub trait CommentDirectory: Send + Sync {
    /// Parent content id for a comment, `None` when the comment is unknown.
    fn parent_of(&self, comment_id: CommentId) -> Option<ContentId>;

    /// Whether the comment exists.
    fn exists(&self, comment_id: CommentId) -> bool {
        self.parent_of(comment_id).is_some()
    }
}

/// Immutable directory backed by a fixed comment → content map, loaded from
/// server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCommentDirectory {
    comments: HashMap<CommentId, ContentId>,
}

impl StaticCommentDirectory {
    /// Build from explicit (comment, parent content) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (CommentId, ContentId)>) -> Self {
        Self {
            comments: pairs.into_iter().collect(),
        }
    }

    /// Number of known comments.
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

impl CommentDirectory for StaticCommentDirectory {
    fn parent_of(&self, comment_id: CommentId) -> Option<ContentId> {
        self.comments.get(&comment_id).copied()
    }
}
