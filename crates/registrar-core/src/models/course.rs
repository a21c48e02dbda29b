use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::{impl_entity, EntityKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreRequisite {
    pub course: Value,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub title: String,
    pub prefix: String,
    pub code: u32,
    pub credits: u32,
    #[serde(default)]
    pub pre_requisite_courses: Vec<PreRequisite>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl_entity!(Course, EntityKind::Course);

impl Course {
    /// Course label as printed on transcripts, e.g. "CSE101".
    pub fn course_code(&self) -> String {
        format!("{}{}", self.prefix, self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedCourse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester_registration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<Value>,
    #[serde(default)]
    pub max_capacity: u32,
    #[serde(default)]
    pub section: u32,
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

impl_entity!(OfferedCourse, EntityKind::OfferedCourse);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMarks {
    #[serde(default)]
    pub class_test1: f64,
    #[serde(default)]
    pub mid_term: f64,
    #[serde(default)]
    pub class_test2: f64,
    #[serde(default)]
    pub final_term: f64,
}

impl CourseMarks {
    pub fn total(&self) -> f64 {
        self.class_test1 + self.mid_term + self.class_test2 + self.final_term
    }
}

/// Letter grade and grade point for a course total out of 100.
pub fn grade_for(total: f64) -> (&'static str, f64) {
    match total.round() as i64 {
        80..=100 => ("A", 4.00),
        60..=79 => ("B", 3.00),
        40..=59 => ("C", 2.00),
        20..=39 => ("D", 1.00),
        _ => ("F", 0.00),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_course: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Value>,
    #[serde(default)]
    pub course_marks: CourseMarks,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default)]
    pub grade_points: f64,
    #[serde(default)]
    pub is_completed: bool,
}

impl_entity!(EnrolledCourse, EntityKind::EnrolledCourse);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam: Option<Value>,
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
}

impl_entity!(Mark, EntityKind::Mark);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade_for(100.0), ("A", 4.00));
        assert_eq!(grade_for(79.6), ("A", 4.00));
        assert_eq!(grade_for(60.0), ("B", 3.00));
        assert_eq!(grade_for(45.0), ("C", 2.00));
        assert_eq!(grade_for(20.0), ("D", 1.00));
        assert_eq!(grade_for(19.0), ("F", 0.00));
    }

    #[test]
    fn test_course_marks_total() {
        let marks = CourseMarks {
            class_test1: 8.0,
            mid_term: 25.0,
            class_test2: 9.0,
            final_term: 40.0,
        };
        assert_eq!(marks.total(), 82.0);
    }

    #[test]
    fn test_course_code() {
        let course: Course = serde_json::from_str(
            r#"{"_id":"c1","title":"Intro to Programming","prefix":"CSE","code":101,"credits":3}"#,
        )
        .unwrap();
        assert_eq!(course.course_code(), "CSE101");
        assert!(course.pre_requisite_courses.is_empty());
    }
}
