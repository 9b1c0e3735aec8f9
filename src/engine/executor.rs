//! The execution protocol: how a job becomes a stored record.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::check::{Check, Subject};
use crate::config::CheckConfig;
use crate::dispatch::Job;
use crate::error::{ExecutionError, VigilError, VigilResult};
use crate::identity::{CheckSlug, Identifier};
use crate::record::{Acknowledgment, CheckRecord};
use crate::status::Status;
use crate::store::RecordPatch;

use super::{EvaluationOutcome, JobOutcome, SubjectFailure, VigilEngine};

impl VigilEngine {
    /// Executes a dispatched job.
    ///
    /// # Errors
    ///
    /// Fails when the slug is unregistered, the subject cannot be
    /// reconstructed, or (for single-subject jobs) the evaluation
    /// itself fails. Bulk jobs report per-subject failures in the
    /// outcome instead.
    pub fn execute(&self, job: &Job) -> VigilResult<JobOutcome> {
        match job {
            Job::RunCheck { slug } => self.run_check(slug),
            Job::RunSubject { slug, identifier } => {
                self.run_subject(slug, identifier).map(JobOutcome::Subject)
            }
        }
    }

    /// Evaluates every subject the check currently generates.
    ///
    /// Failures are isolated per subject: a failing subject is recorded
    /// in the outcome and its stored record is left untouched, while
    /// its siblings are still evaluated.
    ///
    /// # Errors
    ///
    /// Fails when the slug is unregistered or subject generation
    /// itself fails.
    pub fn run_check(&self, slug: &CheckSlug) -> VigilResult<JobOutcome> {
        let check = self.require_check(slug)?;

        let mut evaluated = 0usize;
        let mut failures = Vec::new();
        for subject in check.generate()? {
            match self.handle(check.as_ref(), &subject) {
                Ok(_) => evaluated += 1,
                Err(err) => {
                    let identifier = check.identifier(&subject).ok();
                    tracing::error!(
                        slug = %slug,
                        identifier = ?identifier,
                        error = %err,
                        "subject evaluation failed"
                    );
                    failures.push(SubjectFailure {
                        identifier,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(JobOutcome::Bulk {
            evaluated,
            failures,
        })
    }

    /// Re-evaluates one subject by its stored identifier.
    ///
    /// # Errors
    ///
    /// Fails when the slug is unregistered, the identifier no longer
    /// resolves to a subject, or the evaluation fails.
    pub fn run_subject(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
    ) -> VigilResult<EvaluationOutcome> {
        let check = self.require_check(slug)?;
        let subject = check.subject_for(identifier)?.ok_or_else(|| {
            VigilError::Execution(ExecutionError::SubjectNotFound {
                slug: slug.clone(),
                identifier: identifier.clone(),
            })
        })?;
        self.handle(check.as_ref(), &subject)
    }

    /// Evaluates one subject and upserts its record.
    ///
    /// The protocol: load any existing record, resolve the effective
    /// configuration, evaluate, then upsert. Assigned fields and the
    /// description are recomputed on every evaluation; the stored
    /// configuration is never written by an evaluation. When a subject
    /// that previously stood at warning or critical comes back ok, any
    /// standing acknowledgment is cleared in the same update.
    ///
    /// Safe under at-least-once delivery: re-handling an unchanged
    /// subject rewrites the same values.
    ///
    /// # Errors
    ///
    /// Fails when the check cannot identify or evaluate the subject, or
    /// the store rejects the upsert.
    pub fn handle(&self, check: &dyn Check, subject: &Subject) -> VigilResult<EvaluationOutcome> {
        let slug = check.slug();
        let identifier = check.identifier(subject)?;

        let existing = self.store.get(&slug, &identifier)?;
        let previous = existing.as_ref().map(|record| record.status);

        let config = effective_config(check, existing.as_ref());
        let status = check.evaluate(subject, &config)?;

        // A regression to ok on a known subject invalidates any
        // standing acknowledgment.
        let unacknowledge = previous.map_or(false, |old| old > Status::Ok && status == Status::Ok);

        let (assigned_user, assigned_group) = match check.assignment() {
            Some(assignment) => (
                assignment.assigned_user(subject, status),
                assignment.assigned_group(subject, status),
            ),
            None => (None, None),
        };
        let description = check.describe(subject);

        let mut candidate = CheckRecord::new(slug.clone(), identifier.clone(), status);
        candidate.assigned_user = assigned_user.clone();
        candidate.assigned_group = assigned_group.clone();
        candidate.description = description.clone();

        let (_, created) = self.store.get_or_create(candidate)?;

        if !created {
            let mut patch = RecordPatch::default()
                .status(status)
                .assigned_user(assigned_user)
                .assigned_group(assigned_group)
                .description(description);
            if unacknowledge {
                patch = patch.acknowledgment(None);
            }
            self.store.update(&slug, &identifier, patch)?;
        }

        Ok(EvaluationOutcome {
            slug,
            identifier,
            previous,
            status,
            created,
            unacknowledged: unacknowledge,
        })
    }

    /// The configuration the next evaluation of `subject` would use:
    /// the stored per-subject configuration when one exists, the
    /// check's declared defaults otherwise.
    ///
    /// # Errors
    ///
    /// Fails when the slug is unregistered or the subject cannot be
    /// identified.
    pub fn get_config(&self, slug: &CheckSlug, subject: &Subject) -> VigilResult<CheckConfig> {
        let check = self.require_check(slug)?;
        let identifier = check.identifier(subject)?;
        let existing = self.store.get(slug, &identifier)?;
        Ok(effective_config(check.as_ref(), existing.as_ref()))
    }

    /// Stores a per-subject configuration.
    ///
    /// The stored configuration is sticky: later changes to the check's
    /// declared defaults no longer affect this subject.
    ///
    /// # Errors
    ///
    /// Fails when no record exists under the key.
    pub fn save_config(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
        config: CheckConfig,
    ) -> VigilResult<CheckRecord> {
        let record = self
            .store
            .update(slug, identifier, RecordPatch::default().config(config))?;
        Ok(record)
    }

    /// Acknowledges a record: `by` owns it until `until`.
    ///
    /// The acknowledgment stands until it expires, is replaced, or the
    /// subject regresses to ok.
    ///
    /// # Errors
    ///
    /// Fails when the actor is empty, the expiry is not in the future,
    /// or no record exists under the key.
    pub fn acknowledge(
        &self,
        slug: &CheckSlug,
        identifier: &Identifier,
        by: impl Into<String>,
        until: DateTime<Utc>,
    ) -> VigilResult<CheckRecord> {
        let by = by.into();
        if by.trim().is_empty() {
            return Err(ExecutionError::InvalidAcknowledgment {
                reason: "acknowledging actor cannot be empty".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        if until <= now {
            return Err(ExecutionError::InvalidAcknowledgment {
                reason: "acknowledgment must expire in the future".to_string(),
            }
            .into());
        }

        let acknowledgment = Acknowledgment { by, at: now, until };
        let record = self.store.update(
            slug,
            identifier,
            RecordPatch::default().acknowledgment(Some(acknowledgment)),
        )?;
        Ok(record)
    }

    fn require_check(&self, slug: &CheckSlug) -> VigilResult<Arc<dyn Check>> {
        self.registry
            .get_check(slug)?
            .ok_or_else(|| VigilError::Execution(ExecutionError::UnknownCheck { slug: slug.clone() }))
    }
}

// Stored configuration wins whenever any of it exists; an empty stored
// map counts as absent, so such subjects keep following the defaults.
fn effective_config(check: &dyn Check, existing: Option<&CheckRecord>) -> CheckConfig {
    match existing {
        Some(record) if !record.config.is_empty() => record.config.clone(),
        _ => check.default_config(),
    }
}
