//! Teachers

use cache_system::Freshness;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::facade::ResourceQuery;
use crate::params::ListParams;
use crate::traits::{MemoryBacked, Resource};

pub struct Teachers;

pub type TeacherQuery<A> = ResourceQuery<Teachers, A>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherStatus {
    Active,
    OnLeave,
    Retired,
}

impl TeacherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherStatus::Active => "active",
            TeacherStatus::OnLeave => "on_leave",
            TeacherStatus::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub status: TeacherStatus,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub status: TeacherStatus,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherStatistics {
    pub total: u64,
    pub active: u64,
    pub on_leave: u64,
    pub departments: u64,
}

impl Resource for Teachers {
    const NAME: &'static str = "teachers";
    const FRESHNESS: Freshness = Freshness::Volatile;

    type Item = Teacher;
    type Draft = TeacherDraft;
    type Stats = TeacherStatistics;

    fn id(item: &Teacher) -> Uuid {
        item.id
    }
}

impl MemoryBacked for Teachers {
    fn create_item(id: Uuid, draft: TeacherDraft) -> Teacher {
        Teacher {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            department: draft.department,
            status: draft.status,
            hired_on: draft.hired_on,
        }
    }

    fn update_item(item: &mut Teacher, draft: TeacherDraft) {
        *item = Self::create_item(item.id, draft);
    }

    fn matches(item: &Teacher, params: &ListParams) -> bool {
        params.search_matches(&[
            item.first_name.as_str(),
            item.last_name.as_str(),
            item.email.as_str(),
        ])
            && params.status.accepts(item.status.as_str())
            && params.category.accepts(&item.department)
    }

    fn summarize(items: &[Teacher]) -> TeacherStatistics {
        let mut departments: Vec<&str> = items.iter().map(|t| t.department.as_str()).collect();
        departments.sort_unstable();
        departments.dedup();

        TeacherStatistics {
            total: items.len() as u64,
            active: items
                .iter()
                .filter(|t| t.status == TeacherStatus::Active)
                .count() as u64,
            on_leave: items
                .iter()
                .filter(|t| t.status == TeacherStatus::OnLeave)
                .count() as u64,
            departments: departments.len() as u64,
        }
    }
}
