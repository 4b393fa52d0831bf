/*!
 * Daily quota for anonymous translation requests.
 */

use chrono::Local;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requests made on a given local calendar date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    /// Requests made so far today
    pub count: u32,
    /// Date the count applies to, `YYYY-MM-DD`
    pub date: String,
}

/// Source of the current calendar date
pub type Clock = Box<dyn Fn() -> String + Send + Sync>;

fn local_today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Daily request quota shared by every job in the process
///
/// Authenticated callers bypass the quota entirely. Anonymous callers get
/// `daily_limit` requests per local calendar day; the counter resets the
/// first time it is consulted on a new date.
pub struct UsagePolicy {
    daily_limit: u32,
    counter: Mutex<UsageCounter>,
    clock: Clock,
}

impl UsagePolicy {
    /// Create a policy using the local system clock
    pub fn new(daily_limit: u32) -> Self {
        Self::with_clock(daily_limit, Box::new(local_today))
    }

    /// Create a policy with an injected clock
    pub fn with_clock(daily_limit: u32, clock: Clock) -> Self {
        Self {
            daily_limit,
            counter: Mutex::new(UsageCounter::default()),
            clock,
        }
    }

    /// Configured daily limit
    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Check the quota and consume one request if allowed
    pub fn check_and_consume(&self, is_authenticated: bool) -> bool {
        if is_authenticated {
            return true;
        }

        let today = (self.clock)();
        let mut counter = self.counter.lock();

        if counter.date != today {
            if !counter.date.is_empty() {
                info!("New day {}, resetting usage counter", today);
            }
            counter.count = 0;
            counter.date = today;
        }

        if counter.count >= self.daily_limit {
            debug!("Daily limit of {} reached", self.daily_limit);
            return false;
        }

        counter.count += 1;
        debug!("Usage {}/{} for {}", counter.count, self.daily_limit, counter.date);
        true
    }

    /// Requests left today for anonymous callers
    pub fn remaining(&self) -> u32 {
        let today = (self.clock)();
        let counter = self.counter.lock();
        if counter.date != today {
            self.daily_limit
        } else {
            self.daily_limit.saturating_sub(counter.count)
        }
    }

    /// Copy of the current counter
    pub fn snapshot(&self) -> UsageCounter {
        self.counter.lock().clone()
    }

    /// Continue counting from a previously saved counter
    pub fn restore(&self, saved: UsageCounter) {
        *self.counter.lock() = saved;
    }
}

impl fmt::Debug for UsagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsagePolicy")
            .field("daily_limit", &self.daily_limit)
            .field("counter", &*self.counter.lock())
            .finish()
    }
}
