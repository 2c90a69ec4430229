//! Course catalog

use std::collections::BTreeMap;

use cache_system::Freshness;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::facade::ResourceQuery;
use crate::params::ListParams;
use crate::traits::{MemoryBacked, Resource};

pub struct Courses;

pub type CourseQuery<A> = ResourceQuery<Courses, A>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub category: String,
    pub credits: u8,
    pub capacity: u32,
    pub enrolled: u32,
    pub teacher_id: Option<Uuid>,
    pub is_active: bool,
}

impl Course {
    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub code: String,
    pub title: String,
    pub category: String,
    pub credits: u8,
    pub capacity: u32,
    pub teacher_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseStatistics {
    pub total: u64,
    pub active: u64,
    pub total_capacity: u64,
    pub total_enrolled: u64,
    pub by_category: BTreeMap<String, u64>,
}

impl Resource for Courses {
    const NAME: &'static str = "courses";
    const FRESHNESS: Freshness = Freshness::Static;

    type Item = Course;
    type Draft = CourseDraft;
    type Stats = CourseStatistics;

    fn id(item: &Course) -> Uuid {
        item.id
    }
}

impl MemoryBacked for Courses {
    fn create_item(id: Uuid, draft: CourseDraft) -> Course {
        Course {
            id,
            code: draft.code,
            title: draft.title,
            category: draft.category,
            credits: draft.credits,
            capacity: draft.capacity,
            enrolled: 0,
            teacher_id: draft.teacher_id,
            is_active: draft.is_active,
        }
    }

    fn update_item(item: &mut Course, draft: CourseDraft) {
        item.code = draft.code;
        item.title = draft.title;
        item.category = draft.category;
        item.credits = draft.credits;
        item.capacity = draft.capacity;
        item.teacher_id = draft.teacher_id;
        item.is_active = draft.is_active;
    }

    fn matches(item: &Course, params: &ListParams) -> bool {
        let status = if item.is_active { "active" } else { "inactive" };
        params.search_matches(&[item.code.as_str(), item.title.as_str()])
            && params.status.accepts(status)
            && params.category.accepts(&item.category)
    }

    fn summarize(items: &[Course]) -> CourseStatistics {
        let mut stats = CourseStatistics {
            total: items.len() as u64,
            ..CourseStatistics::default()
        };
        for course in items {
            if course.is_active {
                stats.active += 1;
            }
            stats.total_capacity += u64::from(course.capacity);
            stats.total_enrolled += u64::from(course.enrolled);
            *stats.by_category.entry(course.category.clone()).or_default() += 1;
        }
        stats
    }
}
