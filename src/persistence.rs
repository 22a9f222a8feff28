//! Write-behind persistence.
//!
//! The editor applies every mutation locally first, then queues the matching
//! [`PersistenceOp`] here. Operations are dispatched one at a time in the
//! order they were issued, so a later delete can never be overtaken by an
//! earlier update. A failed call is retried with exponential backoff; each
//! failure is reported as a [`PersistenceWarning`] and the local model is
//! never rolled back.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

use crate::config::PersistenceSettings;
use crate::error::PersistenceWarning;
use crate::model::{Category, CategoryId, Geometry, Shape, ShapeId};

/// Identifies one queued operation across dispatch and completion.
pub type Ticket = u64;

/// Field changed by an annotation update.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationChange {
    Geometry(Geometry),
    Category(CategoryId),
}

/// A call to the persistence service.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceOp {
    CreateAnnotation { shape: Shape },
    UpdateAnnotation { id: ShapeId, change: AnnotationChange },
    DeleteAnnotation { id: ShapeId },
    CreateCategory { category: Category },
    UpdateCategory { category: Category },
    DeleteCategory { id: CategoryId },
}

impl PersistenceOp {
    /// Short description used in warnings and logs.
    pub fn describe(&self) -> String {
        match self {
            PersistenceOp::CreateAnnotation { shape } => {
                format!("create {} annotation {}", shape.kind().name(), shape.id)
            }
            PersistenceOp::UpdateAnnotation { id, .. } => format!("update annotation {}", id),
            PersistenceOp::DeleteAnnotation { id } => format!("delete annotation {}", id),
            PersistenceOp::CreateCategory { category } => {
                format!("create category '{}'", category.name)
            }
            PersistenceOp::UpdateCategory { category } => {
                format!("update category '{}'", category.name)
            }
            PersistenceOp::DeleteCategory { id } => format!("delete category {}", id),
        }
    }
}

/// Outbound side of the persistence service.
///
/// `dispatch` starts the call and returns immediately. The host reports the
/// outcome later through [`WriteBehindQueue::complete`].
pub trait PersistenceService {
    fn dispatch(&mut self, ticket: Ticket, op: &PersistenceOp);
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &PersistenceSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&PersistenceSettings::default())
    }
}

#[derive(Debug)]
struct PendingOp {
    ticket: Ticket,
    op: PersistenceOp,
    attempts: u32,
    not_before: Option<Instant>,
}

/// FIFO of persistence operations with one call in flight at a time.
#[derive(Debug)]
pub struct WriteBehindQueue {
    policy: RetryPolicy,
    pending: VecDeque<PendingOp>,
    /// True while the front of `pending` has been dispatched and not completed.
    in_flight: bool,
    next_ticket: Ticket,
}

impl WriteBehindQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: VecDeque::new(),
            in_flight: false,
            next_ticket: 1,
        }
    }

    /// Queue an operation. It is sent on a later [`WriteBehindQueue::pump`].
    pub fn enqueue(&mut self, op: PersistenceOp) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        log::trace!("Queued #{}: {}", ticket, op.describe());
        self.pending.push_back(PendingOp {
            ticket,
            op,
            attempts: 0,
            not_before: None,
        });
        ticket
    }

    /// Dispatch the next operation if nothing is in flight and its backoff
    /// has elapsed. Returns the dispatched ticket.
    pub fn pump(&mut self, service: &mut dyn PersistenceService, now: Instant) -> Option<Ticket> {
        if self.in_flight {
            return None;
        }
        let front = self.pending.front_mut()?;
        if front.not_before.is_some_and(|at| now < at) {
            return None;
        }
        front.attempts += 1;
        self.in_flight = true;
        log::debug!(
            "💾 Dispatching #{} (attempt {}): {}",
            front.ticket,
            front.attempts,
            front.op.describe()
        );
        service.dispatch(front.ticket, &front.op);
        Some(front.ticket)
    }

    /// Record the outcome of a dispatched call.
    ///
    /// Returns a warning for every failure; `gave_up` is set when the retry
    /// budget is spent and the operation has been dropped.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<(), String>,
        now: Instant,
    ) -> Option<PersistenceWarning> {
        let is_current = self.in_flight && self.pending.front().is_some_and(|p| p.ticket == ticket);
        if !is_current {
            log::warn!("Ignoring completion for unknown ticket #{}", ticket);
            return None;
        }
        self.in_flight = false;

        let message = match result {
            Ok(()) => {
                if let Some(done) = self.pending.pop_front() {
                    log::trace!("Saved #{}: {}", done.ticket, done.op.describe());
                }
                return None;
            }
            Err(message) => message,
        };

        let front = self.pending.front_mut()?;
        let attempt = front.attempts;
        let operation = front.op.describe();
        let gave_up = attempt >= self.policy.max_attempts;
        if gave_up {
            log::warn!("Giving up on '{}' after {} attempts: {}", operation, attempt, message);
            self.pending.pop_front();
        } else {
            let delay = self.policy.delay_after(attempt);
            log::warn!(
                "Saving '{}' failed (attempt {}), retrying in {:?}: {}",
                operation,
                attempt,
                delay,
                message
            );
            front.not_before = Some(now + delay);
        }

        Some(PersistenceWarning {
            operation,
            message,
            attempt,
            gave_up,
        })
    }

    /// When the next retry becomes due, if the queue is waiting on backoff.
    pub fn next_retry_at(&self) -> Option<Instant> {
        if self.in_flight {
            return None;
        }
        self.pending.front().and_then(|p| p.not_before)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Number of operations not yet confirmed, including the one in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for WriteBehindQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
