//! Domain records exchanged between client and server.

use serde::{Deserialize, Serialize};

/// Term labels offered by the client menu, in menu order.
pub const SESSIONS: [&str; 3] = ["Automne", "Hiver", "Ete"];

/// A course offered during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub session: String,
    pub code: String,
    pub name: String,
}

impl Course {
    pub fn new(
        session: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            session: session.into(),
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A registration request submitted by a student.
///
/// Only `student_id` and `course_code` are required on the wire; the
/// contact fields decode as empty strings when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub student_id: String,
    pub course_code: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl RegistrationForm {
    pub fn new(student_id: impl Into<String>, course_code: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            course_code: course_code.into(),
            session: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_optional_fields_default_to_empty() {
        let form: RegistrationForm =
            serde_json::from_str(r#"{"student_id":"123","course_code":"IFT1025"}"#).unwrap();
        assert_eq!(form, RegistrationForm::new("123", "IFT1025"));
    }

    #[test]
    fn test_form_requires_student_id() {
        let result: Result<RegistrationForm, _> =
            serde_json::from_str(r#"{"course_code":"IFT1025"}"#);
        assert!(result.is_err());
    }
}
