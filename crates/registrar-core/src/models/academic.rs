use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::{impl_entity, EntityKind};

/// Semester names and the codes the backend pairs with them.
pub const SEMESTER_NAMES: [(&str, &str); 3] = [("Autumn", "01"), ("Summer", "02"), ("Fall", "03")];

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Semester code for a semester name, e.g. "Summer" -> "02".
pub fn semester_code(name: &str) -> Option<&'static str> {
    SEMESTER_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Zero-based month index, used to order start and end months.
pub fn month_index(month: &str) -> Option<usize> {
    MONTHS.iter().position(|m| m.eq_ignore_ascii_case(month))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicSemester {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
    pub code: String,
    pub year: String,
    #[serde(default)]
    pub start_month: String,
    #[serde(default)]
    pub end_month: String,
}

impl_entity!(AcademicSemester, EntityKind::AcademicSemester);

impl AcademicSemester {
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl_entity!(AcademicYear, EntityKind::AcademicYear);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicFaculty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
}

impl_entity!(AcademicFaculty, EntityKind::AcademicFaculty);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicDepartment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
    /// Either an id or the populated academic faculty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_faculty: Option<Value>,
}

impl_entity!(AcademicDepartment, EntityKind::AcademicDepartment);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrationStatus {
    Upcoming,
    Ongoing,
    Ended,
}

impl RegistrationStatus {
    /// The status a registration may move to next, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            RegistrationStatus::Upcoming => Some(RegistrationStatus::Ongoing),
            RegistrationStatus::Ongoing => Some(RegistrationStatus::Ended),
            RegistrationStatus::Ended => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_semester: Option<Value>,
    pub status: RegistrationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub min_credit: u32,
    #[serde(default)]
    pub max_credit: u32,
}

impl_entity!(SemesterRegistration, EntityKind::SemesterRegistration);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_semester_code() {
        assert_eq!(semester_code("Autumn"), Some("01"));
        assert_eq!(semester_code("fall"), Some("03"));
        assert_eq!(semester_code("Winter"), None);
    }

    #[test]
    fn test_month_index() {
        assert_eq!(month_index("January"), Some(0));
        assert_eq!(month_index("december"), Some(11));
        assert_eq!(month_index("Smarch"), None);
    }

    #[test]
    fn test_registration_status_progression() {
        let reg: SemesterRegistration = serde_json::from_value(json!({
            "_id": "r1",
            "status": "UPCOMING",
            "minCredit": 3,
            "maxCredit": 16
        }))
        .unwrap();
        assert_eq!(reg.status.next(), Some(RegistrationStatus::Ongoing));
        assert_eq!(RegistrationStatus::Ended.next(), None);
        assert_eq!(reg.max_credit, 16);
    }
}
