use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::application::models::account::Account;
use crate::application::models::status::{Status, StatusId};
use crate::application::services::status_service::StatusService;
use crate::constants::{DEFAULT_STATUS_BUDGET, STATUS_PAGE_SIZE};
use crate::error::AppError;

/// Which statuses a cleanup run may delete, and how many.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Only statuses strictly older than this are candidates.
    pub min_age: Duration,
    /// Upper bound of candidates yielded in one run.
    pub limit: u64,
    /// When true, statuses with any favourites or boosts are kept.
    pub exempt_engaged: bool,
    tags: HashSet<String>,
}

impl RetentionPolicy {
    pub fn new(min_age: Duration) -> Self {
        Self {
            min_age,
            limit: DEFAULT_STATUS_BUDGET,
            exempt_engaged: false,
            tags: HashSet::new(),
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Restricts the run to statuses carrying at least one of `tags`,
    /// compared case-insensitively. An empty set means no restriction.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn with_engagement_exemption(mut self, exempt: bool) -> Self {
        self.exempt_engaged = exempt;
        self
    }

    /// Whether `status` is deletion-eligible at instant `now`. Age must
    /// exceed `min_age` strictly; the pinned flag is not consulted.
    pub fn is_candidate(&self, status: &Status, now: DateTime<Utc>) -> bool {
        let age = now - status.created_at;
        let mut candidate = age > self.min_age;

        if self.exempt_engaged {
            candidate =
                candidate && status.favourites_count == 0 && status.reblogs_count == 0;
        }

        if candidate && !self.tags.is_empty() {
            // A status with no tags cannot match a non-empty restriction.
            candidate = status
                .tags
                .iter()
                .any(|tag| self.tags.contains(&tag.name.to_lowercase()));
        }

        candidate
    }
}

/// Lazy, bounded scan over the account's history, fetching pages on demand
/// and yielding deletion candidates in arrival order.
///
/// Not restartable: every scan reads live remote state, so two runs may see
/// different histories. The cursor is the smallest status id seen so far;
/// each page requests only strictly-older statuses, so concurrent new posts
/// (larger ids) are never re-encountered.
pub struct RetentionScan<'a, S: StatusService> {
    service: &'a S,
    policy: RetentionPolicy,
    account: Account,
    cursor: Option<StatusId>,
    remaining: u64,
    page: VecDeque<Status>,
    exhausted: bool,
}

impl<'a, S: StatusService> RetentionScan<'a, S> {
    /// Resolves the acting account, then fetches nothing until polled.
    pub async fn begin(service: &'a S, policy: RetentionPolicy) -> Result<Self, AppError> {
        let account = service.verify_credentials().await?;
        let remaining = policy.limit;

        Ok(Self {
            service,
            policy,
            account,
            cursor: None,
            remaining,
            page: VecDeque::new(),
            exhausted: false,
        })
    }

    /// Smallest status id seen so far in this run; never increases.
    pub fn cursor(&self) -> Option<StatusId> {
        self.cursor
    }

    /// The next deletion candidate, or `None` once the history ends or the
    /// run budget is spent. An empty page is the normal end of stream.
    pub async fn next(&mut self) -> Result<Option<Status>, AppError> {
        while self.remaining > 0 {
            let status = match self.page.pop_front() {
                Some(status) => status,
                None => {
                    if self.exhausted {
                        return Ok(None);
                    }
                    let page = self
                        .service
                        .account_statuses(&self.account.id, self.cursor, STATUS_PAGE_SIZE)
                        .await?;
                    if page.is_empty() {
                        self.exhausted = true;
                        return Ok(None);
                    }
                    debug!(
                        "Fetched page of {} statuses below {:?}",
                        page.len(),
                        self.cursor.map(|id| id.0)
                    );
                    self.page = page.into();
                    continue;
                }
            };

            if self.cursor.map_or(true, |cursor| status.id < cursor) {
                self.cursor = Some(status.id);
            }

            if self.policy.is_candidate(&status, Utc::now()) {
                self.remaining -= 1;
                return Ok(Some(status));
            }
        }

        Ok(None)
    }
}
