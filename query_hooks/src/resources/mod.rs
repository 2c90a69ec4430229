//! Resources of the campus console

pub mod courses;
pub mod students;
pub mod teachers;
pub mod transfers;

pub use courses::{Course, CourseDraft, CourseQuery, CourseStatistics, Courses};
pub use students::{Student, StudentDraft, StudentQuery, StudentStatistics, StudentStatus, Students};
pub use teachers::{Teacher, TeacherDraft, TeacherQuery, TeacherStatistics, TeacherStatus, Teachers};
pub use transfers::{
    Transfer, TransferDraft, TransferQuery, TransferStatistics, TransferStatus, Transfers,
};
