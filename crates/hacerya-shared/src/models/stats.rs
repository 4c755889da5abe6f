use serde::{Deserialize, Serialize};

use crate::models::TaskStatus;

/// Admin dashboard headline numbers. Personal projects are excluded from the
/// project and task counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub total_users: i64,
    pub total_projects: i64,
    pub total_workspaces: i64,
    pub total_tasks_completed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTaskCount {
    pub name: String,
    pub task_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUser {
    pub full_name: String,
    pub action_count: i64,
}

/// Per-user workload view for the personal dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub total_active: i64,
    pub total_overdue: i64,
    pub active_by_status: Vec<StatusCount>,
    pub completed_on_time: i64,
    pub completed_late: i64,
    pub avg_lead_time_days: f64,
}
