//! Strategies for waiting on a hardware condition.

use std::hint;
use std::time::Duration;
use std::time::Instant;

use crate::Error;
use crate::Result;

pub trait Wait {
    /// Evaluate `ready` until it returns `true`.
    ///
    /// `ready` is always evaluated at least once. Returns the number of
    /// evaluations performed.
    fn wait_until<F>(&mut self, ready: F) -> Result<u64>
    where
        F: FnMut() -> Result<bool>;
}

/// Busy-wait on the calling thread.
///
/// Without a timeout this spins forever if the condition never holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin {
    pub timeout: Option<Duration>,
}

impl Spin {
    pub fn new(timeout: Option<Duration>) -> Spin {
        Spin { timeout }
    }

    pub fn unbounded() -> Spin {
        Spin { timeout: None }
    }
}

impl Wait for Spin {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<u64>
    where
        F: FnMut() -> Result<bool>,
    {
        let start = Instant::now();
        let mut polls = 0u64;
        loop {
            polls += 1;
            if ready()? {
                return Ok(polls);
            }
            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    return Err(Error::Timeout { polls });
                }
            }
            hint::spin_loop();
        }
    }
}

/// Give up after a fixed number of evaluations.
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    pub max_polls: u64,
}

impl Bounded {
    pub fn new(max_polls: u64) -> Bounded {
        Bounded { max_polls }
    }
}

impl Wait for Bounded {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<u64>
    where
        F: FnMut() -> Result<bool>,
    {
        let mut polls = 0u64;
        loop {
            polls += 1;
            if ready()? {
                return Ok(polls);
            }
            if polls >= self.max_polls {
                return Err(Error::Timeout { polls });
            }
        }
    }
}
