//! Home hierarchy documents
//!
//! Written by the application's CRUD layer; homegate only reads the fields
//! it needs to walk a resource up to its home. Ids are application-issued
//! strings.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{
    Home, HomegateError, Item, ParentScope, ResourceKind, Room, Surface, Task, TaskScope,
};

pub const HOME_COLLECTION: &str = "homes";
pub const ROOM_COLLECTION: &str = "rooms";
pub const ITEM_COLLECTION: &str = "items";
pub const TASK_COLLECTION: &str = "tasks";
pub const PAINT_COLLECTION: &str = "paints";
pub const FLOORING_COLLECTION: &str = "floorings";

fn index(field: &str, name: &str) -> (Document, Option<IndexOptions>) {
    (
        doc! { field: 1 },
        Some(IndexOptions::builder().name(name.to_string()).build()),
    )
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct HomeDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Owning user id
    pub owner_id: String,
}

impl From<HomeDoc> for Home {
    fn from(doc: HomeDoc) -> Self {
        Home {
            id: doc.id,
            owner_id: doc.owner_id,
            name: doc.name,
        }
    }
}

impl IntoIndexes for HomeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![index("owner_id", "owner_id_index")]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RoomDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub home_id: String,
}

impl From<RoomDoc> for Room {
    fn from(doc: RoomDoc) -> Self {
        Room {
            id: doc.id,
            home_id: doc.home_id,
        }
    }
}

impl IntoIndexes for RoomDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![index("home_id", "home_id_index")]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ItemDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    pub room_id: String,
}

impl From<ItemDoc> for Item {
    fn from(doc: ItemDoc) -> Self {
        Item {
            id: doc.id,
            room_id: doc.room_id,
        }
    }
}

impl IntoIndexes for ItemDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![index("room_id", "room_id_index")]
    }
}

/// Task row: exactly one of the three parent fields is expected
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TaskDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,

    /// User who created the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
}

impl TryFrom<TaskDoc> for Task {
    type Error = HomegateError;

    fn try_from(doc: TaskDoc) -> Result<Self, Self::Error> {
        let scope = TaskScope::from_refs(&doc.id, doc.home_id, doc.room_id, doc.item_id)?;
        Ok(Task { id: doc.id, scope })
    }
}

impl IntoIndexes for TaskDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            index("home_id", "home_id_index"),
            index("room_id", "room_id_index"),
            index("item_id", "item_id_index"),
            index("creator_id", "creator_id_index"),
        ]
    }
}

/// Paint or flooring row: attached to a home or to one of its rooms
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SurfaceDoc {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl SurfaceDoc {
    pub fn into_surface(self, kind: ResourceKind) -> Result<Surface, HomegateError> {
        let scope = ParentScope::from_refs(kind, &self.id, self.home_id, self.room_id)?;
        Ok(Surface { id: self.id, scope })
    }
}

impl IntoIndexes for SurfaceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            index("home_id", "home_id_index"),
            index("room_id", "room_id_index"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_doc_with_single_parent() {
        let doc = TaskDoc {
            id: "t1".into(),
            item_id: Some("i1".into()),
            ..Default::default()
        };
        let task = Task::try_from(doc).unwrap();
        assert_eq!(task.scope, TaskScope::Item("i1".into()));
    }

    #[test]
    fn test_task_doc_without_parent_is_rejected() {
        let doc = TaskDoc {
            id: "t1".into(),
            ..Default::default()
        };
        assert!(matches!(
            Task::try_from(doc),
            Err(HomegateError::Integrity(_))
        ));
    }

    #[test]
    fn test_home_doc_decodes_from_bson() {
        let raw = doc! {
            "_id": "h1",
            "name": "Lake House",
            "owner_id": "u1",
        };
        let home: HomeDoc = bson::from_document(raw).unwrap();
        let home = Home::from(home);
        assert_eq!(home.owner_id, "u1");
        assert_eq!(home.name, "Lake House");
    }
}
