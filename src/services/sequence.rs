use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    EntityTrait, QueryFilter,
};
use tracing::{instrument, warn};

use crate::{
    entities::sequence_counter::{self, Entity as SequenceCounterEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Counters shared by all concurrent clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Orders,
    Invoices,
    Transactions,
}

impl CounterKind {
    pub fn name(&self) -> &'static str {
        match self {
            CounterKind::Orders => "orders",
            CounterKind::Invoices => "invoices",
            CounterKind::Transactions => "transactions",
        }
    }

    /// Value a counter row is created with; the first allocated number is
    /// `seed + increment`.
    pub fn seed(&self) -> i64 {
        match self {
            CounterKind::Orders => 1000,
            CounterKind::Invoices | CounterKind::Transactions => 1,
        }
    }

    /// Prefix used when rendering a number for display. Stored values stay
    /// plain integers.
    pub fn display_prefix(&self) -> &'static str {
        match self {
            CounterKind::Orders => "ORD-",
            CounterKind::Invoices => "INV-",
            CounterKind::Transactions => "TXN-",
        }
    }

    pub fn format(&self, number: i64) -> String {
        format!("{}{}", self.display_prefix(), number)
    }
}

/// Outcome of a number allocation.
///
/// `Allocated` carries the uniqueness and monotonicity guarantee.
/// `Degraded` is the availability fallback: a wall-clock-derived identifier
/// handed out when the counter could not be advanced atomically. It is
/// collision-prone and breaks monotonicity; callers that cannot tolerate
/// that must reject it and retry instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceNumber {
    Allocated(i64),
    Degraded(i64),
}

impl SequenceNumber {
    pub fn value(&self) -> i64 {
        match self {
            SequenceNumber::Allocated(n) | SequenceNumber::Degraded(n) => *n,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SequenceNumber::Degraded(_))
    }
}

const INCREMENT: i64 = 1;
const MAX_ATTEMPTS: u32 = 5;

/// Generator of strictly increasing, collision-free numbers.
///
/// Correctness rests entirely on the store's atomic conditional update: the
/// increment is a compare-and-swap on `current_value`, so no two callers can
/// consume the same number regardless of how many processes share the
/// database. There is no client-side locking layer.
#[derive(Clone)]
pub struct SequenceService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl SequenceService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Allocate the next number for `kind`.
    ///
    /// Never fails outright: after `MAX_ATTEMPTS` lost races or store errors
    /// it returns `SequenceNumber::Degraded` with a unix-milliseconds
    /// identifier, logged at WARN and published as an event so the degraded
    /// path is observable.
    #[instrument(skip(self), fields(counter = kind.name()))]
    pub async fn next_number(&self, kind: CounterKind) -> SequenceNumber {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_allocate(kind).await {
                Ok(Some(number)) => return SequenceNumber::Allocated(number),
                Ok(None) => {
                    // Lost a CAS or creation race; back off briefly and retry.
                    let jitter = rand::thread_rng().gen_range(2..20);
                    tokio::time::sleep(Duration::from_millis(jitter)).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "counter allocation attempt failed");
                    tokio::time::sleep(Duration::from_millis(10 * attempt as u64)).await;
                }
            }
        }

        let fallback = Utc::now().timestamp_millis();
        warn!(
            counter = kind.name(),
            fallback, "sequence counter unavailable; returning degraded wall-clock identifier"
        );
        self.event_sender.send_or_log(Event::SequenceDegraded {
            counter: kind.name().to_string(),
            fallback,
        });
        SequenceNumber::Degraded(fallback)
    }

    /// Allocate the next number, treating the degraded fallback as an error.
    ///
    /// Used where a collision-prone number is worse than failing the
    /// operation, e.g. checkout.
    pub async fn next_allocated(&self, kind: CounterKind) -> Result<i64, ServiceError> {
        match self.next_number(kind).await {
            SequenceNumber::Allocated(n) => Ok(n),
            SequenceNumber::Degraded(_) => Err(ServiceError::SequenceUnavailable(format!(
                "{} counter could not be advanced atomically",
                kind.name()
            ))),
        }
    }

    /// One atomic allocation attempt. `Ok(None)` means a lost race that the
    /// caller should retry.
    async fn try_allocate(&self, kind: CounterKind) -> Result<Option<i64>, ServiceError> {
        let existing = SequenceCounterEntity::find_by_id(kind.name())
            .one(&*self.db)
            .await?;

        match existing {
            None => {
                // Lazy creation: insert the seed row already advanced by one
                // increment. A concurrent creator loses on the primary key
                // and falls back to the CAS path on retry.
                let first = kind.seed() + INCREMENT;
                let row = sequence_counter::ActiveModel {
                    name: Set(kind.name().to_string()),
                    current_value: Set(first),
                    increment: Set(INCREMENT),
                    updated_at: Set(Utc::now()),
                };
                match row.insert(&*self.db).await {
                    Ok(_) => Ok(Some(first)),
                    Err(_) => Ok(None),
                }
            }
            Some(counter) => {
                let next = counter.current_value + counter.increment;
                // Compare-and-swap: only advance from the value we observed.
                let result = SequenceCounterEntity::update_many()
                    .col_expr(sequence_counter::Column::CurrentValue, Expr::value(next))
                    .col_expr(sequence_counter::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(sequence_counter::Column::Name.eq(kind.name()))
                    .filter(sequence_counter::Column::CurrentValue.eq(counter.current_value))
                    .exec(&*self.db)
                    .await?;

                if result.rows_affected == 1 {
                    Ok(Some(next))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Current value of a counter, if it has been created.
    pub async fn current_value(&self, kind: CounterKind) -> Result<Option<i64>, ServiceError> {
        Ok(SequenceCounterEntity::find_by_id(kind.name())
            .one(&*self.db)
            .await?
            .map(|c| c.current_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_match_the_published_numbering_scheme() {
        assert_eq!(CounterKind::Orders.seed(), 1000);
        assert_eq!(CounterKind::Invoices.seed(), 1);
        assert_eq!(CounterKind::Transactions.seed(), 1);
    }

    #[test]
    fn first_allocated_value_is_seed_plus_increment() {
        assert_eq!(CounterKind::Orders.seed() + INCREMENT, 1001);
    }

    #[test]
    fn display_prefixes_are_presentation_only() {
        assert_eq!(CounterKind::Orders.format(1001), "ORD-1001");
        assert_eq!(CounterKind::Invoices.format(2), "INV-2");
        assert_eq!(CounterKind::Transactions.format(7), "TXN-7");
    }

    #[test]
    fn counter_names_are_stable() {
        assert_eq!(CounterKind::Orders.name(), "orders");
        assert_eq!(CounterKind::Invoices.name(), "invoices");
    }

    #[test]
    fn degraded_numbers_are_tagged() {
        let n = SequenceNumber::Degraded(1_700_000_000_000);
        assert!(n.is_degraded());
        assert_eq!(n.value(), 1_700_000_000_000);

        let n = SequenceNumber::Allocated(1001);
        assert!(!n.is_degraded());
        assert_eq!(n.value(), 1001);
    }
}
