//! Student transfers between courses
//!
//! Approving or rejecting a transfer changes enrollment, so mutations here
//! also invalidate cached students and courses.

use cache_system::Freshness;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::facade::ResourceQuery;
use crate::params::ListParams;
use crate::traits::{MemoryBacked, Resource};

pub struct Transfers;

pub type TransferQuery<A> = ResourceQuery<Transfers, A>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub student_id: Uuid,
    pub from_course_id: Option<Uuid>,
    pub to_course_id: Uuid,
    pub reason: String,
    pub status: TransferStatus,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub student_id: Uuid,
    pub from_course_id: Option<Uuid>,
    pub to_course_id: Uuid,
    pub reason: String,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferStatistics {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl Resource for Transfers {
    const NAME: &'static str = "transfers";
    const FRESHNESS: Freshness = Freshness::Volatile;

    type Item = Transfer;
    type Draft = TransferDraft;
    type Stats = TransferStatistics;

    fn id(item: &Transfer) -> Uuid {
        item.id
    }

    fn dependents() -> &'static [&'static str] {
        &["students", "courses"]
    }
}

impl MemoryBacked for Transfers {
    fn create_item(id: Uuid, draft: TransferDraft) -> Transfer {
        let decided_at = (draft.status != TransferStatus::Pending).then(Utc::now);
        Transfer {
            id,
            student_id: draft.student_id,
            from_course_id: draft.from_course_id,
            to_course_id: draft.to_course_id,
            reason: draft.reason,
            status: draft.status,
            requested_at: Utc::now(),
            decided_at,
        }
    }

    fn update_item(item: &mut Transfer, draft: TransferDraft) {
        if item.status != draft.status && draft.status != TransferStatus::Pending {
            item.decided_at = Some(Utc::now());
        }
        item.student_id = draft.student_id;
        item.from_course_id = draft.from_course_id;
        item.to_course_id = draft.to_course_id;
        item.reason = draft.reason;
        item.status = draft.status;
    }

    fn matches(item: &Transfer, params: &ListParams) -> bool {
        params.search_matches(&[item.reason.as_str()]) && params.status.accepts(item.status.as_str())
    }

    fn summarize(items: &[Transfer]) -> TransferStatistics {
        let count = |status: TransferStatus| {
            items.iter().filter(|t| t.status == status).count() as u64
        };
        TransferStatistics {
            total: items.len() as u64,
            pending: count(TransferStatus::Pending),
            approved: count(TransferStatus::Approved),
            rejected: count(TransferStatus::Rejected),
        }
    }
}
