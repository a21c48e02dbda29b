use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, Registrar};
use crate::auth::Role;
use crate::cache::{params, QueryKey};
use crate::models::EntityKind;

/// Maximum concurrent counter reads.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// One number on a dashboard, read from a list's `meta.total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub label: &'static str,
    pub kind: EntityKind,
    pub path: &'static str,
}

impl Counter {
    const fn new(label: &'static str, kind: EntityKind, path: &'static str) -> Self {
        Self { label, kind, path }
    }
}

#[derive(Debug, Clone)]
pub struct CounterValue {
    pub counter: Counter,
    pub total: Result<u64, ApiError>,
}

/// Counters shown on `role`'s dashboard.
pub fn counters_for(role: Role) -> &'static [Counter] {
    const ADMIN: &[Counter] = &[
        Counter::new("Students", EntityKind::Student, "/students"),
        Counter::new("Faculty", EntityKind::Faculty, "/faculties"),
        Counter::new("Courses", EntityKind::Course, "/courses"),
        Counter::new("Offered Courses", EntityKind::OfferedCourse, "/offered-courses"),
        Counter::new("Registrations", EntityKind::SemesterRegistration, "/semester-registrations"),
        Counter::new("Blogs", EntityKind::Blog, "/blogs"),
    ];
    const FACULTY: &[Counter] = &[
        Counter::new("Offered Courses", EntityKind::OfferedCourse, "/offered-courses"),
        Counter::new("Enrollments", EntityKind::EnrolledCourse, "/enrolled-courses"),
        Counter::new("Exams", EntityKind::Exam, "/exams"),
        Counter::new("Blogs", EntityKind::Blog, "/blogs"),
    ];
    const STUDENT: &[Counter] = &[
        Counter::new(
            "Open Courses",
            EntityKind::OfferedCourse,
            "/offered-courses/my-offered-courses",
        ),
        Counter::new(
            "My Courses",
            EntityKind::EnrolledCourse,
            "/enrolled-courses/my-enrolled-courses",
        ),
        Counter::new("Jobs", EntityKind::Job, "/jobs"),
        Counter::new("Announcements", EntityKind::Announcement, "/announcements"),
    ];

    match role {
        Role::SuperAdmin | Role::Admin => ADMIN,
        Role::Faculty => FACULTY,
        Role::Student => STUDENT,
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    role: Role,
    values: Vec<CounterValue>,
}

impl Dashboard {
    /// Read every counter for `role`, a few at a time.
    ///
    /// A failing counter is reported in place; the rest still load.
    pub async fn load(registrar: &Registrar, role: Role) -> Self {
        let counters = counters_for(role);
        let mut indexed: Vec<(usize, CounterValue)> = stream::iter(counters.iter().copied().enumerate())
            .map(|(i, counter)| {
                let cache = registrar.cache().clone();
                async move {
                    let key = QueryKey::new(counter.path, &params([("limit", "1")]));
                    let total = match cache.fetch(key, &[counter.kind]).await {
                        Ok(data) => data.collection::<Value>().map(|c| c.total()),
                        Err(e) => Err(e),
                    };
                    (i, CounterValue { counter, total })
                }
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .collect()
            .await;

        indexed.sort_by_key(|(i, _)| *i);
        debug!(role = %role, counters = indexed.len(), "Dashboard loaded");
        Self {
            role,
            values: indexed.into_iter().map(|(_, v)| v).collect(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn values(&self) -> &[CounterValue] {
        &self.values
    }

    pub fn total(&self, label: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|v| v.counter.label == label)
            .and_then(|v| v.total.as_ref().ok().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_counters() {
        for role in [Role::SuperAdmin, Role::Admin, Role::Faculty, Role::Student] {
            assert!(!counters_for(role).is_empty());
        }
        assert_eq!(counters_for(Role::SuperAdmin), counters_for(Role::Admin));
    }
}
