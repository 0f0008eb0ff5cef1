//! Interval timer management.
//!
//! The [`TimerManager`] owns a bounded table of repeating timers. Each timer
//! gets a sequential identifier (starting at 1, never reused) and is armed on
//! a [`TimerBackend`], which delivers timer-expiry notifications carrying that
//! identifier. The first expiry happens one full period after creation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{ActionsResult, ResourceError, ValidationError};
use crate::notify::{Notification, Notifier};

/// Maximum number of live timers.
pub const MAX_TIMERS: usize = 255;

/// Identifier of a timer, used as the payload of timer-expiry notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

impl TimerId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw notification payload.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unit of a timer's repeat count.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timescale {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl Timescale {
    /// Convert `count` units into a repeat interval.
    #[must_use]
    pub fn interval(self, count: u32) -> Duration {
        let count = u64::from(count);
        match self {
            Self::Milliseconds => {
                let nanos = u32::try_from((count % 1000) * 1_000_000).unwrap_or(0);
                Duration::new(count / 1000, nanos)
            }
            Self::Seconds => Duration::from_secs(count),
            Self::Minutes => Duration::from_secs(count * 60),
            Self::Hours => Duration::from_secs(count * 3600),
            Self::Days => Duration::from_secs(count * 86_400),
            Self::Weeks => Duration::from_secs(count * 604_800),
        }
    }

    /// Long unit name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
        }
    }
}

impl FromStr for Timescale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "millisecond" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "sec" | "second" | "seconds" => Ok(Self::Seconds),
            "m" | "min" | "minute" | "minutes" => Ok(Self::Minutes),
            "h" | "hour" | "hours" => Ok(Self::Hours),
            "d" | "day" | "days" => Ok(Self::Days),
            "w" | "week" | "weeks" => Ok(Self::Weeks),
            _ => Err(ValidationError::UnknownTimescale { unit: s.to_string() }),
        }
    }
}

/// The repeat interval for `count` units, zero when the unit is unknown.
#[must_use]
pub fn repeat_interval(count: u32, unit: Option<Timescale>) -> Duration {
    unit.map_or(Duration::ZERO, |u| u.interval(count))
}

/// Delivers timer-expiry notifications for armed timers.
pub trait TimerBackend: Send {
    /// Start a timer that first fires after `period` and then every `period`.
    fn arm(&mut self, id: TimerId, period: Duration) -> Result<(), ResourceError>;
}

/// A created timer.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    pub id: TimerId,
    pub period: Duration,
    pub created_at: DateTime<Utc>,
}

/// Bounded, append-only table of repeating timers.
#[derive(Debug)]
pub struct TimerManager<B: TimerBackend> {
    backend: B,
    timers: Vec<TimerEntry>,
}

impl<B: TimerBackend> TimerManager<B> {
    /// An empty table arming timers on `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            timers: Vec::with_capacity(MAX_TIMERS),
        }
    }

    /// Create a repeating timer of `count` units.
    ///
    /// Fails without consuming an identifier when the interval is zero or the
    /// table already holds [`MAX_TIMERS`] timers.
    pub fn create_repeating_timer(&mut self, count: u32, unit: Option<Timescale>) -> ActionsResult<TimerId> {
        if self.timers.len() >= MAX_TIMERS {
            return Err(ResourceError::TimerTableFull { max: MAX_TIMERS }.into());
        }

        let period = repeat_interval(count, unit);
        if period.is_zero() {
            return Err(ResourceError::ZeroInterval {
                count,
                unit: unit.map_or("unknown", |u| u.as_str()).to_string(),
            }
            .into());
        }

        let raw = u32::try_from(self.timers.len() + 1).map_err(|_| ResourceError::TimerTableFull { max: MAX_TIMERS })?;
        let id = TimerId::new(raw);
        self.backend.arm(id, period)?;

        debug!(timer = raw, period_ms = period.as_millis() as u64, "created repeating timer");
        self.timers.push(TimerEntry {
            id,
            period,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    /// Look up a created timer.
    #[must_use]
    pub fn get(&self, id: TimerId) -> Option<&TimerEntry> {
        let idx = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.timers.get(idx)
    }

    /// Number of timers created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timer has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// One line per timer: identifier, period and creation time.
    #[must_use]
    pub fn describe(&self) -> String {
        self.timers
            .iter()
            .map(|t| {
                format!(
                    "timer {}: every {:?}, created {}\n",
                    t.id,
                    t.period,
                    t.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                )
            })
            .collect()
    }

    /// Borrow the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

struct ArmMsg {
    id: TimerId,
    period: Duration,
}

/// Timer backend driven by a dedicated scheduler thread.
///
/// Deadlines advance by exactly one period per expiry, so a slow consumer
/// sees every expiry queued rather than a drifting schedule. Dropping the
/// backend stops the scheduler and waits for it.
#[derive(Debug)]
pub struct ThreadTimerBackend {
    control_tx: Sender<ArmMsg>,
    scheduler: Option<JoinHandle<()>>,
}

impl ThreadTimerBackend {
    /// Spawn the scheduler thread; expiries are raised on `notifier`.
    pub fn start(notifier: Notifier) -> ActionsResult<Self> {
        let (control_tx, control_rx) = unbounded::<ArmMsg>();
        let join = thread::Builder::new()
            .name("varactions-timers".to_string())
            .spawn(move || scheduler_loop(&control_rx, &notifier))
            .map_err(|e| ResourceError::TimerBackend {
                message: format!("failed to spawn timer scheduler: {e}"),
            })?;

        Ok(Self {
            control_tx,
            scheduler: Some(join),
        })
    }
}

impl TimerBackend for ThreadTimerBackend {
    fn arm(&mut self, id: TimerId, period: Duration) -> Result<(), ResourceError> {
        self.control_tx
            .send(ArmMsg { id, period })
            .map_err(|_| ResourceError::TimerBackend {
                message: "timer scheduler has stopped".to_string(),
            })
    }
}

impl Drop for ThreadTimerBackend {
    fn drop(&mut self) {
        // Close the control channel first; the scheduler exits on disconnect.
        let (closed_tx, _) = unbounded::<ArmMsg>();
        drop(std::mem::replace(&mut self.control_tx, closed_tx));

        if let Some(handle) = self.scheduler.take() {
            let _ = handle.join();
        }
    }
}

fn scheduler_loop(control_rx: &Receiver<ArmMsg>, notifier: &Notifier) {
    let mut schedule: BinaryHeap<Reverse<(Instant, TimerId, Duration)>> = BinaryHeap::new();

    loop {
        let msg = match schedule.peek() {
            Some(Reverse((deadline, _, _))) => control_rx.recv_deadline(*deadline),
            None => control_rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match msg {
            Ok(ArmMsg { id, period }) => {
                schedule.push(Reverse((Instant::now() + period, id, period)));
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                while let Some(Reverse((deadline, id, period))) = schedule.peek().copied() {
                    if deadline > now {
                        break;
                    }
                    schedule.pop();
                    if let Err(e) = notifier.raise(Notification::timer(id.get())) {
                        warn!(timer = id.get(), error = %e, "timer notification undeliverable, stopping scheduler");
                        return;
                    }
                    schedule.push(Reverse((deadline + period, id, period)));
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
