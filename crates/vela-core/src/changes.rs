//! Content change events delivered by the content repository.
//!
//! Delivery is at-least-once: strategies must tolerate redundant
//! notifications for the same id.

use serde::{Deserialize, Serialize};

use crate::content::{ContentId, ObjectType};

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The item itself changed.
    Refresh,
    /// The item and all of its descendants changed (move, branch publish).
    RefreshBranch,
    /// The item was deleted.
    Remove,
}

/// Which version of the item changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    /// The draft (editable) version.
    Draft,
    /// The published version.
    Published,
}

/// One content mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// Affected item.
    pub id: ContentId,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Affected version.
    pub content_state: ContentState,
    /// Repository object type of the item.
    pub object_type: ObjectType,
    /// Whether the change altered the item's publish state.
    #[serde(default)]
    pub publish_state_affected: bool,
}

impl ContentChange {
    /// Create a change.
    pub fn new(
        id: ContentId,
        change_type: ChangeType,
        content_state: ContentState,
        object_type: ObjectType,
    ) -> Self {
        Self {
            id,
            change_type,
            content_state,
            object_type,
            publish_state_affected: false,
        }
    }

    /// Draft-version refresh of a content item.
    pub fn draft(id: ContentId, change_type: ChangeType) -> Self {
        Self::new(id, change_type, ContentState::Draft, ObjectType::Content)
    }

    /// Published-version refresh of a content item.
    pub fn published(id: ContentId, change_type: ChangeType) -> Self {
        Self::new(id, change_type, ContentState::Published, ObjectType::Content)
    }

    /// Override the object type.
    pub fn with_object_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    /// Flag the change as altering publish state.
    pub fn affecting_publish_state(mut self) -> Self {
        self.publish_state_affected = true;
        self
    }

    /// Whether the change asks for removal.
    pub fn is_removal(&self) -> bool {
        self.change_type == ChangeType::Remove
    }

    /// Whether descendants must be revisited.
    pub fn is_branch(&self) -> bool {
        self.change_type == ChangeType::RefreshBranch
    }
}
