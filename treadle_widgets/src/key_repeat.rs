// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Debounced key repeat.

use alloc::string::String;
use alloc::vec;
use core::fmt;

use treadle_core::coroutine::awaiters::{delay, first_of, key_pressed, key_released, other_key_pressed};
use treadle_core::coroutine::{Awaiter, CoroutineBody, Resume, Step};
use treadle_core::error::BoxError;
use treadle_core::time::Duration;

/// Timing of a [`KeyRepeat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyRepeatConfig {
    /// How long the key must be held before the first repeat.
    pub initial_delay: Duration,
    /// Time between repeats after that.
    pub interval: Duration,
}

impl KeyRepeatConfig {
    /// 400 ms before the first repeat, then every 40 ms.
    pub const DEFAULT: Self = Self {
        initial_delay: Duration::from_millis(400),
        interval: Duration::from_millis(40),
    };
}

impl Default for KeyRepeatConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Waiting,
    Delay,
    Interval,
}

/// A coroutine that runs an action when a key goes down and repeats it
/// while the key is held.
///
/// ```text
///   Waiting ── key pressed ──► fire ──► Delay ── initial delay ──► fire ──► Interval
///      ▲                                  │                                    │ interval:
///      └──── released, other key pressed ─┴────────────────────────────────────┘ fire again
/// ```
///
/// Releasing the key, or pressing any other key, goes back to waiting
/// without firing. The action runs at most once per frame.
pub struct KeyRepeat<F> {
    code: String,
    config: KeyRepeatConfig,
    action: F,
    state: State,
}

impl<F> fmt::Debug for KeyRepeat<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRepeat")
            .field("code", &self.code)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<F: FnMut()> KeyRepeat<F> {
    /// Repeats `action` for the key with physical `code`, with default
    /// timing.
    pub fn new(code: impl Into<String>, action: F) -> Self {
        Self::with_config(code, KeyRepeatConfig::DEFAULT, action)
    }

    /// Repeats `action` for the key with physical `code`.
    pub fn with_config(code: impl Into<String>, config: KeyRepeatConfig, action: F) -> Self {
        Self {
            code: code.into(),
            config,
            action,
            state: State::Start,
        }
    }

    fn wait(&mut self, duration: Duration) -> Awaiter {
        first_of(vec![
            key_released(&self.code),
            other_key_pressed(&self.code),
            delay(duration),
        ])
    }
}

impl<F: FnMut()> CoroutineBody for KeyRepeat<F> {
    fn resume(&mut self, r: Resume<'_>) -> Result<Step, BoxError> {
        let next = match self.state {
            State::Start => State::Waiting,
            State::Waiting => {
                (self.action)();
                State::Delay
            }
            State::Delay | State::Interval => {
                let elapsed = matches!(r.data.into_first_of(), Some((2, _)));
                if elapsed && r.frame.keys.is_down(&self.code) {
                    tracing::trace!(key = %self.code, frame = r.frame.frame_index, "key repeat");
                    (self.action)();
                    State::Interval
                } else {
                    State::Waiting
                }
            }
        };
        self.state = next;
        let awaiter = match next {
            State::Waiting => key_pressed(&self.code),
            State::Delay => self.wait(self.config.initial_delay),
            State::Interval => self.wait(self.config.interval),
            State::Start => unreachable!("never re-entered"),
        };
        Ok(Step::Await(awaiter))
    }
}
