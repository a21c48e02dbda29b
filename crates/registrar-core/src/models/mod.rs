//! Data models for academic records.
//!
//! This module contains the records mirrored from the backend:
//!
//! - `Student`, `Faculty`, `Admin`, `User`: people and accounts
//! - `AcademicSemester`, `AcademicYear`, `AcademicFaculty`, `AcademicDepartment`,
//!   `SemesterRegistration`: academic structure
//! - `Course`, `OfferedCourse`, `EnrolledCourse`, `Mark`: courses and grading
//! - `Job`, `Blog`, `Announcement`, `Certificate`, `Exam`, `Question`: content
//! - `Envelope`, `Collection`, `PageMeta`: response wrappers

pub mod academic;
pub mod content;
pub mod course;
pub mod envelope;
pub mod kind;
pub mod people;

pub use academic::{
    AcademicDepartment, AcademicFaculty, AcademicSemester, AcademicYear, RegistrationStatus,
    SemesterRegistration,
};
pub use content::{Announcement, Blog, Certificate, Exam, Job, Question};
pub use course::{Course, CourseMarks, EnrolledCourse, Mark, OfferedCourse};
pub use envelope::{Collection, Envelope, PageMeta};
pub use kind::{Entity, EntityKind};
pub use people::{Admin, Faculty, Name, Student, User, UserStatus};
