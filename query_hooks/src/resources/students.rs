//! Students

use cache_system::Freshness;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::facade::ResourceQuery;
use crate::params::ListParams;
use crate::traits::{MemoryBacked, Resource};

pub struct Students;

pub type StudentQuery<A> = ResourceQuery<Students, A>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Suspended,
    Graduated,
    Transferred,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Suspended => "suspended",
            StudentStatus::Graduated => "graduated",
            StudentStatus::Transferred => "transferred",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grade_level: u8,
    pub status: StudentStatus,
    pub date_of_birth: Option<NaiveDate>,
    pub enrolled_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub grade_level: u8,
    pub status: StudentStatus,
    pub date_of_birth: Option<NaiveDate>,
}

impl StudentDraft {
    pub fn new(first_name: &str, last_name: &str, grade_level: u8) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!(
                "{}.{}@campus.edu",
                first_name.to_lowercase(),
                last_name.to_lowercase()
            ),
            grade_level,
            status: StudentStatus::Active,
            date_of_birth: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentStatistics {
    pub total: u64,
    pub active: u64,
    pub suspended: u64,
    pub graduated: u64,
    pub transferred: u64,
}

impl Resource for Students {
    const NAME: &'static str = "students";
    const FRESHNESS: Freshness = Freshness::Volatile;

    type Item = Student;
    type Draft = StudentDraft;
    type Stats = StudentStatistics;

    fn id(item: &Student) -> Uuid {
        item.id
    }
}

impl MemoryBacked for Students {
    fn create_item(id: Uuid, draft: StudentDraft) -> Student {
        Student {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            grade_level: draft.grade_level,
            status: draft.status,
            date_of_birth: draft.date_of_birth,
            enrolled_at: Utc::now(),
        }
    }

    fn update_item(item: &mut Student, draft: StudentDraft) {
        item.first_name = draft.first_name;
        item.last_name = draft.last_name;
        item.email = draft.email;
        item.grade_level = draft.grade_level;
        item.status = draft.status;
        item.date_of_birth = draft.date_of_birth;
    }

    fn matches(item: &Student, params: &ListParams) -> bool {
        params.search_matches(&[
            item.first_name.as_str(),
            item.last_name.as_str(),
            item.email.as_str(),
        ])
            && params.status.accepts(item.status.as_str())
            && params
                .category
                .accepts(&format!("grade-{}", item.grade_level))
    }

    fn summarize(items: &[Student]) -> StudentStatistics {
        items.iter().fold(
            StudentStatistics {
                total: items.len() as u64,
                ..StudentStatistics::default()
            },
            |mut stats, student| {
                match student.status {
                    StudentStatus::Active => stats.active += 1,
                    StudentStatus::Suspended => stats.suspended += 1,
                    StudentStatus::Graduated => stats.graduated += 1,
                    StudentStatus::Transferred => stats.transferred += 1,
                }
                stats
            },
        )
    }
}
