// Best-effort fan-out over recipients with claim-based dedupe

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::JobReport;
use crate::application::bounded::bounded;
use crate::domain::Recipient;
use crate::error::Result;
use crate::port::{NotificationKind, NotificationLog};

/// Per-call budget and fan-out width shared by the notification jobs
#[derive(Debug, Clone, Copy)]
pub struct DeliverySettings {
    pub call_timeout: Duration,
    pub concurrency: usize,
}

enum DeliveryStatus {
    Sent,
    AlreadySent,
    Failed,
}

/// One batch of sends of a single kind
pub(crate) struct Delivery<'a> {
    pub job: &'static str,
    pub kind: NotificationKind,
    pub log: &'a dyn NotificationLog,
    pub settings: DeliverySettings,
    pub now: DateTime<Utc>,
}

impl Delivery<'_> {
    /// Claim, send, then confirm for every recipient; one failure never stops the batch.
    ///
    /// A failed send releases its claim so the next tick retries it. A run
    /// cancelled mid-send leaves its claims pending and the next run takes them over.
    pub async fn deliver<F, Fut>(&self, scope_key: &str, recipients: Vec<Recipient>, send: F) -> JobReport
    where
        F: Fn(Recipient) -> Fut + Sync,
        Fut: Future<Output = Result<()>> + Send,
    {
        let send = &send;
        let mut seen = HashSet::new();
        let recipients: Vec<Recipient> = recipients
            .into_iter()
            .filter(|r| seen.insert(r.dedupe_key()))
            .collect();
        let statuses: Vec<DeliveryStatus> = stream::iter(recipients)
            .map(|recipient| self.deliver_one(scope_key, recipient, send))
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut report = JobReport::default();
        for status in statuses {
            report.processed += 1;
            match status {
                DeliveryStatus::Sent => report.succeeded += 1,
                DeliveryStatus::AlreadySent => report.skipped += 1,
                DeliveryStatus::Failed => report.failed += 1,
            }
        }
        report
    }

    async fn deliver_one<F, Fut>(&self, scope_key: &str, recipient: Recipient, send: &F) -> DeliveryStatus
    where
        F: Fn(Recipient) -> Fut + Sync,
        Fut: Future<Output = Result<()>> + Send,
    {
        let timeout = self.settings.call_timeout;
        let key = recipient.dedupe_key();

        match bounded(
            timeout,
            "notification_log.claim",
            self.log.claim(self.kind, scope_key, &key, self.now),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(job = self.job, scope = scope_key, recipient = %key, "Already notified");
                return DeliveryStatus::AlreadySent;
            }
            Err(e) => {
                warn!(
                    job = self.job,
                    scope = scope_key,
                    recipient = %key,
                    error = %e,
                    "Dedupe claim failed, skipping recipient"
                );
                return DeliveryStatus::Failed;
            }
        }

        match bounded(timeout, self.kind.as_str(), send(recipient)).await {
            Ok(()) => {
                if let Err(e) = bounded(
                    timeout,
                    "notification_log.confirm",
                    self.log.confirm(self.kind, scope_key, &key),
                )
                .await
                {
                    warn!(
                        job = self.job,
                        scope = scope_key,
                        recipient = %key,
                        error = %e,
                        "Could not confirm claim; recipient may be notified again"
                    );
                }
                DeliveryStatus::Sent
            }
            Err(e) => {
                warn!(
                    job = self.job,
                    scope = scope_key,
                    recipient = %key,
                    error = %e,
                    "Notification send failed"
                );
                if let Err(release_err) = bounded(
                    timeout,
                    "notification_log.release",
                    self.log.release(self.kind, scope_key, &key),
                )
                .await
                {
                    warn!(
                        job = self.job,
                        scope = scope_key,
                        recipient = %key,
                        error = %release_err,
                        "Could not release claim; the next run takes it over"
                    );
                }
                DeliveryStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::notification_log::mocks::InMemoryNotificationLog;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings() -> DeliverySettings {
        DeliverySettings {
            call_timeout: Duration::from_millis(200),
            concurrency: 4,
        }
    }

    fn delivery(log: &InMemoryNotificationLog) -> Delivery<'_> {
        Delivery {
            job: "test",
            kind: NotificationKind::EventReminder,
            log,
            settings: settings(),
            now: Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap(),
        }
    }

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n).map(|i| Recipient::email(format!("u{}@example.com", i))).collect()
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let log = InMemoryNotificationLog::new();
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let report = delivery(&log)
            .deliver("evt-1", recipients(5), |r| async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                if r.address == "u2@example.com" {
                    Err(AppError::Notification("bounced".into()))
                } else {
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(
            report,
            JobReport {
                processed: 5,
                succeeded: 4,
                failed: 1,
                skipped: 0
            }
        );
        // the failed recipient stays eligible
        assert!(!log.contains(NotificationKind::EventReminder, "evt-1", "email:u2@example.com"));
        assert!(log.is_confirmed(NotificationKind::EventReminder, "evt-1", "email:u0@example.com"));
    }

    #[tokio::test]
    async fn test_claimed_recipients_are_skipped() {
        let log = InMemoryNotificationLog::new();
        let first = delivery(&log)
            .deliver("evt-1", recipients(3), |_| async { Ok::<(), AppError>(()) })
            .await;
        assert_eq!(first.succeeded, 3);

        let second = delivery(&log)
            .deliver("evt-1", recipients(3), |_| async {
                Err::<(), _>(AppError::Internal("must not be called".into()))
            })
            .await;
        assert_eq!(second.skipped, 3);
        assert_eq!(second.failed, 0);
    }

    #[tokio::test]
    async fn test_log_failure_counts_as_failed_without_sending() {
        let log = InMemoryNotificationLog::new();
        log.set_failing(true);
        let report = delivery(&log)
            .deliver("evt-1", recipients(2), |_| async {
                Err::<(), _>(AppError::Internal("must not be called".into()))
            })
            .await;
        assert_eq!(report.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_send_times_out() {
        let log = InMemoryNotificationLog::new();
        let report = delivery(&log)
            .deliver("evt-1", recipients(1), |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), AppError>(())
            })
            .await;
        assert_eq!(report.failed, 1);
        assert!(log.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_is_delivered_next_run() {
        let log = InMemoryNotificationLog::new();
        let slow = DeliverySettings {
            call_timeout: Duration::from_secs(60),
            concurrency: 4,
        };
        let mut cancelled = delivery(&log);
        cancelled.settings = slow;
        let aborted = tokio::time::timeout(
            Duration::from_secs(1),
            cancelled.deliver("evt-1", recipients(3), |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<(), AppError>(())
            }),
        )
        .await;
        assert!(aborted.is_err());
        assert!(!log.is_confirmed(NotificationKind::EventReminder, "evt-1", "email:u0@example.com"));

        let report = delivery(&log)
            .deliver("evt-1", recipients(3), |_| async { Ok::<(), AppError>(()) })
            .await;
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test]
    async fn test_duplicate_recipients_sent_once() {
        let log = InMemoryNotificationLog::new();
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;
        let mut twice = recipients(2);
        twice.extend(recipients(2));

        let report = delivery(&log)
            .deliver("evt-1", twice, |_| async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok::<(), AppError>(())
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.processed, 2);
    }
}
