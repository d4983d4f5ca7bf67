//! Record Data Types
//!
//! The student record stored in the replicated cache, and the request/response bodies of
//! the record API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type StudentId = i64;

/// Distinguishes the two kinds of tracked student. Both share one record shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentKind {
    #[default]
    Undergraduate,
    Graduate,
}

/// A student and their course scores, as stored in the cache and on the wire.
///
/// Missing fields decode to their zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "id", default)]
    pub student_id: StudentId,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub class: String,
    /// Course name -> score.
    #[serde(default)]
    pub scores: HashMap<String, f64>,
    #[serde(default)]
    pub kind: StudentKind,
}

impl Student {
    /// Cache key of this record.
    pub fn key(&self) -> String {
        student_key(self.student_id)
    }
}

pub fn student_key(id: StudentId) -> String {
    id.to_string()
}

/// Partial update of a student's attributes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub class: Option<String>,
    pub scores: Option<HashMap<String, f64>>,
}

impl StudentUpdate {
    pub fn apply(self, student: &mut Student) {
        if let Some(name) = self.name {
            student.name = name;
        }
        if let Some(gender) = self.gender {
            student.gender = gender;
        }
        if let Some(class) = self.class {
            student.class = class;
        }
        if let Some(scores) = self.scores {
            student.scores = scores;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddScoreRequest {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyScoreRequest {
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: f64,
}
