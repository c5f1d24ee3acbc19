use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub id: i64,
    pub name: String,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub section: String,
    pub roll: Option<i64>,
    pub gender: Option<String>,
    pub notebook: bool,
    pub copy_checked: bool,
    pub projects: i64,
    pub marks: Option<i64>,
    pub grade: Option<String>,
    pub class_id: Option<i64>,
}

/// A student joined to its class. `class_name` is `None` when `class_id`
/// does not resolve.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithClass {
    #[serde(flatten)]
    pub student: Student,
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStudent {
    pub name: String,
    pub section: String,
    pub roll: Option<i64>,
    pub gender: Option<String>,
    pub notebook: bool,
    pub copy_checked: bool,
    pub projects: i64,
    pub marks: Option<i64>,
    pub grade: Option<String>,
    pub class_id: Option<i64>,
}

/// Logged-in user as tracked by the sidecar between requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub role: Role,
}
