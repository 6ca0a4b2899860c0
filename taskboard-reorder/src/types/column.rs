//! Board column

use super::ids::ColumnId;
use serde::{Deserialize, Serialize};

/// A column defines a workflow stage. `position` is the zero-based display
/// order; across a project the positions are a dense permutation of `0..N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub position: usize,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            position,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Body of an `update_column` call. The server expects the full editable
/// record, not just the changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub name: String,
    pub position: usize,
    pub color: Option<String>,
}

impl From<&Column> for ColumnUpdate {
    fn from(column: &Column) -> Self {
        Self {
            name: column.name.clone(),
            position: column.position,
            color: column.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_wire_shape() {
        let column = Column::new(3, "In Review", 2).with_color("#ffcc00");
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "In Review");
        assert_eq!(json["color"], "#ffcc00");
        assert_eq!(json["position"], 2);
    }

    #[test]
    fn test_column_without_color_deserializes() {
        let column: Column =
            serde_json::from_str(r#"{"id": 1, "name": "Todo", "position": 0}"#).unwrap();
        assert!(column.color.is_none());
    }

    #[test]
    fn test_update_carries_name_and_color() {
        let column = Column::new(1, "Done", 4).with_color("green");
        let update = ColumnUpdate::from(&column);
        assert_eq!(update.name, "Done");
        assert_eq!(update.position, 4);
        assert_eq!(update.color.as_deref(), Some("green"));
    }
}
