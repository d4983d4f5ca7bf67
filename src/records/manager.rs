//! Student Record Manager
//!
//! Business operations on student records, layered on the replicated cache. Reads go
//! through `query` (and therefore lazy loading); writes use `insert`/`update` so they
//! are written through to the backing store.

use super::types::{Student, StudentId, StudentUpdate, student_key};
use crate::storage::cache::ReplicatedCache;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("student with ID {0} not found")]
    StudentNotFound(StudentId),
    #[error("student has no scores")]
    NoScores(StudentId),
    #[error("score for course {0} not found")]
    ScoreNotFound(String),
}

pub struct StudentManager {
    cache: Arc<ReplicatedCache<Student>>,
    /// Serializes read-modify-write sequences issued through this manager.
    write_lock: Mutex<()>,
}

impl StudentManager {
    pub fn new(cache: Arc<ReplicatedCache<Student>>) -> Self {
        Self {
            cache,
            write_lock: Mutex::new(()),
        }
    }

    /// Stores a student, replacing any record with the same id.
    pub async fn add_student(&self, student: Student) {
        let _guard = self.write_lock.lock().await;
        let key = student.key();
        tracing::debug!("Adding student {}", key);
        self.cache.insert(key, student).await;
    }

    pub async fn delete_student(&self, id: StudentId) -> Result<(), RecordError> {
        let _guard = self.write_lock.lock().await;
        let key = student_key(id);

        if self.cache.query(&key).await.is_none() {
            return Err(RecordError::StudentNotFound(id));
        }
        self.cache.delete(&key).await;
        Ok(())
    }

    pub async fn modify_student(
        &self,
        id: StudentId,
        update: StudentUpdate,
    ) -> Result<(), RecordError> {
        self.mutate(id, |student| {
            update.apply(student);
            Ok(())
        })
        .await
    }

    /// Adds or replaces the score of one course.
    pub async fn add_score(
        &self,
        id: StudentId,
        course: &str,
        score: f64,
    ) -> Result<(), RecordError> {
        self.mutate(id, |student| {
            student.scores.insert(course.to_string(), score);
            Ok(())
        })
        .await
    }

    /// Removes a course score. A student without any scores is left as is.
    pub async fn delete_score(&self, id: StudentId, course: &str) -> Result<(), RecordError> {
        self.mutate(id, |student| {
            student.scores.remove(course);
            Ok(())
        })
        .await
    }

    /// Sets a course score, only for students that already have scores.
    pub async fn modify_score(
        &self,
        id: StudentId,
        course: &str,
        score: f64,
    ) -> Result<(), RecordError> {
        self.mutate(id, |student| {
            if !student.scores.is_empty() {
                student.scores.insert(course.to_string(), score);
            }
            Ok(())
        })
        .await
    }

    pub async fn query_student(&self, id: StudentId) -> Result<Student, RecordError> {
        self.cache
            .query(&student_key(id))
            .await
            .ok_or(RecordError::StudentNotFound(id))
    }

    pub async fn query_score(&self, id: StudentId, course: &str) -> Result<f64, RecordError> {
        let student = self.query_student(id).await?;
        if student.scores.is_empty() {
            return Err(RecordError::NoScores(id));
        }
        student
            .scores
            .get(course)
            .copied()
            .ok_or_else(|| RecordError::ScoreNotFound(course.to_string()))
    }

    async fn mutate<F>(&self, id: StudentId, change: F) -> Result<(), RecordError>
    where
        F: FnOnce(&mut Student) -> Result<(), RecordError>,
    {
        let _guard = self.write_lock.lock().await;
        let key = student_key(id);

        let mut student = self
            .cache
            .query(&key)
            .await
            .ok_or(RecordError::StudentNotFound(id))?;
        change(&mut student)?;

        // Query just made the key resident, so this only fails if the record vanished
        // in between (a concurrent delete).
        if !self.cache.update(&key, student).await {
            return Err(RecordError::StudentNotFound(id));
        }
        Ok(())
    }
}
