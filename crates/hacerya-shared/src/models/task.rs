use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kanban column of a task. The order is workflow convention only; nothing in
/// the system ranks statuses numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "task_status"))]
pub enum TaskStatus {
    #[serde(rename = "Por hacer")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Por hacer"))]
    PorHacer,
    #[serde(rename = "En progreso")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "En progreso"))]
    EnProgreso,
    #[serde(rename = "En revisión")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "En revisión"))]
    EnRevision,
    #[serde(rename = "Hecho")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Hecho"))]
    Hecho,
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Hecho)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PorHacer => "Por hacer",
            Self::EnProgreso => "En progreso",
            Self::EnRevision => "En revisión",
            Self::Hecho => "Hecho",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "task_priority"))]
pub enum Priority {
    Baja,
    Media,
    Alta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Task joined with the assignee's profile for board listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithAssignee {
    #[serde(flatten)]
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_kanban_labels() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::PorHacer).unwrap(),
            "\"Por hacer\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::EnRevision).unwrap(),
            "\"En revisión\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"Hecho\"").unwrap();
        assert_eq!(parsed, TaskStatus::Hecho);
        assert!(parsed.is_done());
        assert!(!TaskStatus::EnProgreso.is_done());
    }
}
