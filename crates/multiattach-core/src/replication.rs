//! Attachment replication engine.
//!
//! Gives every target record of a model its own copy of a reference
//! attachment. Records are visited in input order against a *working*
//! attachment: when the working attachment is not owned by the record, a copy
//! owned by the record is persisted and becomes the new working attachment;
//! otherwise the record is skipped.
//!
//! Since every copy is owned by the record it was made for, the only record
//! that can be skipped (apart from immediate duplicates in the input) is the
//! first one, when it already owns the reference attachment.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::Result;
use crate::models::{Attachment, RecordId, ResourceRef};
use crate::traits::AttachmentStore;

/// Decision taken for one target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplicationStep {
    /// The working attachment is already owned by the record.
    Skip { record: RecordId },
    /// A copy owned by `resource` is produced.
    Copy {
        record: RecordId,
        resource: ResourceRef,
    },
}

impl ReplicationStep {
    pub fn record(&self) -> RecordId {
        match self {
            Self::Skip { record } | Self::Copy { record, .. } => *record,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }
}

/// Compute the decisions the engine takes, starting from an attachment owned
/// by `current`, without touching any store.
pub fn plan(current: &ResourceRef, model: &str, records: &[RecordId]) -> Vec<ReplicationStep> {
    let mut working = current.clone();
    records
        .iter()
        .map(|&record| {
            let expected = ResourceRef::new(model, record);
            if working == expected {
                ReplicationStep::Skip { record }
            } else {
                working = expected.clone();
                ReplicationStep::Copy {
                    record,
                    resource: expected,
                }
            }
        })
        .collect()
}

/// Result of one replication run.
#[derive(Debug, Clone)]
pub struct ReplicationOutcome {
    /// Copies in creation order.
    pub copies: Vec<Attachment>,
    /// Records left untouched because they already owned the working attachment.
    pub skipped: Vec<RecordId>,
    /// The working attachment after the last record.
    pub current: Attachment,
}

impl ReplicationOutcome {
    pub fn copy_count(&self) -> usize {
        self.copies.len()
    }
}

/// Replicate `attachment` onto `records` of `model`.
///
/// Copies are persisted one at a time through `store`; the first failure is
/// returned unchanged and the caller's unit of work is expected to roll back.
pub async fn replicate<S>(
    store: &S,
    attachment: Attachment,
    model: &str,
    records: &[RecordId],
) -> Result<ReplicationOutcome>
where
    S: AttachmentStore + ?Sized,
{
    let start = Instant::now();
    debug!(
        subsystem = "replication",
        op = "replicate",
        model = %model,
        attachment_id = attachment.id,
        resource = %attachment.resource,
        record_count = records.len(),
        "Starting replication"
    );

    let mut working = attachment;
    let mut copies = Vec::new();
    let mut skipped = Vec::new();

    for &record in records {
        let expected = ResourceRef::new(model, record);
        if working.resource == expected {
            trace!(
                subsystem = "replication",
                record_id = record,
                attachment_id = working.id,
                "Record already owns the working attachment"
            );
            skipped.push(record);
            continue;
        }

        let copy = store.copy_attachment(&working, &expected).await?;
        trace!(
            subsystem = "replication",
            record_id = record,
            source_id = working.id,
            attachment_id = copy.id,
            "Attachment copied"
        );
        copies.push(copy.clone());
        working = copy;
    }

    info!(
        subsystem = "replication",
        op = "replicate",
        model = %model,
        record_count = records.len(),
        copy_count = copies.len(),
        skip_count = skipped.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Replication completed"
    );

    Ok(ReplicationOutcome {
        copies,
        skipped,
        current: working,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::models::NewAttachment;
    use crate::traits::Backend;

    #[test]
    fn test_plan_skips_record_that_owns_original() {
        let steps = plan(&ResourceRef::new("M", 7), "M", &[7, 8, 9]);
        assert_eq!(
            steps,
            vec![
                ReplicationStep::Skip { record: 7 },
                ReplicationStep::Copy {
                    record: 8,
                    resource: ResourceRef::new("M", 8)
                },
                ReplicationStep::Copy {
                    record: 9,
                    resource: ResourceRef::new("M", 9)
                },
            ]
        );
    }

    #[test]
    fn test_plan_owner_not_first_still_gets_copy() {
        // Once a copy was made for 8 the working attachment is "M,8",
        // so 7 no longer matches.
        let steps = plan(&ResourceRef::new("M", 7), "M", &[8, 7]);
        assert!(steps.iter().all(ReplicationStep::is_copy));
    }

    #[test]
    fn test_plan_other_model_copies_everything() {
        let steps = plan(&ResourceRef::new("X", 1), "M", &[7, 8]);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(ReplicationStep::is_copy));
    }

    #[test]
    fn test_plan_consecutive_duplicate_is_skipped() {
        let steps = plan(&ResourceRef::new("X", 1), "M", &[8, 8]);
        assert!(steps[0].is_copy());
        assert_eq!(steps[1], ReplicationStep::Skip { record: 8 });
    }

    #[test]
    fn test_plan_empty_records() {
        assert!(plan(&ResourceRef::new("M", 7), "M", &[]).is_empty());
    }

    async fn seeded(resource: ResourceRef) -> (MemoryBackend, Attachment) {
        let backend = MemoryBackend::new();
        let uow = backend.begin().await.unwrap();
        let attachment = uow
            .create_attachment(
                NewAttachment::new(resource, "report.pdf").with_content(b"data".to_vec()),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();
        (backend, attachment)
    }

    #[tokio::test]
    async fn test_replicate_follows_plan() {
        let (backend, attachment) = seeded(ResourceRef::new("M", 7)).await;
        let uow = backend.begin().await.unwrap();

        let expected = plan(&attachment.resource, "M", &[7, 8, 9]);
        let outcome = replicate(uow.as_ref(), attachment.clone(), "M", &[7, 8, 9])
            .await
            .unwrap();

        let copied: Vec<RecordId> = expected
            .iter()
            .filter(|s| s.is_copy())
            .map(ReplicationStep::record)
            .collect();
        let produced: Vec<RecordId> = outcome.copies.iter().map(|a| a.resource.id).collect();
        assert_eq!(copied, produced);
        assert_eq!(outcome.skipped, vec![7]);
        assert_eq!(outcome.current.resource, ResourceRef::new("M", 9));
    }

    #[tokio::test]
    async fn test_replicate_copies_are_independent() {
        let (backend, attachment) = seeded(ResourceRef::new("M", 7)).await;
        let uow = backend.begin().await.unwrap();

        let outcome = replicate(uow.as_ref(), attachment.clone(), "M", &[7, 8, 9])
            .await
            .unwrap();

        assert_eq!(outcome.copy_count(), 2);
        let mut ids: Vec<_> = outcome.copies.iter().map(|a| a.id).collect();
        ids.push(attachment.id);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3, "every copy must have its own identity");
        for copy in &outcome.copies {
            assert!(copy.same_content(&attachment));
            assert_ne!(copy.resource, attachment.resource);
        }
    }

    #[tokio::test]
    async fn test_replicate_no_records_produces_nothing() {
        let (backend, attachment) = seeded(ResourceRef::new("M", 7)).await;
        let uow = backend.begin().await.unwrap();

        let outcome = replicate(uow.as_ref(), attachment.clone(), "M", &[])
            .await
            .unwrap();
        assert!(outcome.copies.is_empty());
        assert_eq!(outcome.current, attachment);
    }
}
