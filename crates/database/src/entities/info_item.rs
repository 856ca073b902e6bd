//! Vault item entity definitions

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoItemKind {
    Link,
    Secret,
    File,
}

impl InfoItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoItemKind::Link => "link",
            InfoItemKind::Secret => "secret",
            InfoItemKind::File => "file",
        }
    }
}

impl std::str::FromStr for InfoItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(InfoItemKind::Link),
            "secret" => Ok(InfoItemKind::Secret),
            "file" => Ok(InfoItemKind::File),
            other => Err(format!("unknown vault item kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoItem {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub kind: InfoItemKind,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category: Option<String>,
    #[serde(skip_serializing)]
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl InfoItem {
    pub(crate) const COLUMNS: &'static str =
        "id, public_id, kind, title, description, content, category, created_by, created_at, updated_at";

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self, crate::DatabaseError> {
        let kind: String = row.try_get("kind")?;
        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            kind: kind.parse().map_err(crate::DatabaseError::CorruptRow)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            content: row.try_get("content")?,
            category: row.try_get("category")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub fn is_secret(&self) -> bool {
        self.kind == InfoItemKind::Secret
    }
}

#[derive(Debug, Clone)]
pub struct NewInfoItem {
    pub kind: InfoItemKind,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub created_by: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InfoItemUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub category: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct InfoItemFilter {
    pub kind: Option<InfoItemKind>,
    pub category: Option<String>,
    /// Case-insensitive match against title, description and category.
    pub search: Option<String>,
}
