//! Swipe and long-press classification.
//!
//! # Responsibility
//! - Turn raw press/move/release samples into navigation intents.
//!
//! # Invariants
//! - A motion is horizontal iff `|dx| > |dy|`.
//! - Motions shorter than the swipe threshold on both axes dispatch nothing.
//! - Motion past the jitter tolerance cancels a pending long press.
//! - A press that fired a long press never also fires a swipe.

use crate::config::EngineConfig;
use std::time::{Duration, Instant};

/// Swipe direction in screen coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved up: parents.
    Up,
    /// Finger moved down: children.
    Down,
    /// Finger moved left: siblings.
    Left,
    /// Finger moved right: spouse toggle.
    Right,
}

/// Gesture-layer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Swipe(SwipeDirection),
    LongPress,
}

/// Classifies a completed motion; `None` below `threshold`.
pub fn classify_swipe(dx: f64, dy: f64, threshold: f64) -> Option<SwipeDirection> {
    if dx.abs().max(dy.abs()) < threshold {
        return None;
    }
    let direction = if dx.abs() > dy.abs() {
        if dx < 0.0 {
            SwipeDirection::Left
        } else {
            SwipeDirection::Right
        }
    } else if dy < 0.0 {
        SwipeDirection::Up
    } else {
        SwipeDirection::Down
    };
    Some(direction)
}

#[derive(Debug, Clone, Copy)]
struct Press {
    origin: (f64, f64),
    last: (f64, f64),
    started_at: Instant,
    long_press_armed: bool,
    long_press_fired: bool,
}

/// Stateful tracker for one pointer.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    swipe_threshold: f64,
    jitter_tolerance: f64,
    long_press: Duration,
    active: Option<Press>,
}

impl GestureTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            swipe_threshold: config.swipe_threshold,
            jitter_tolerance: config.jitter_tolerance,
            long_press: config.long_press(),
            active: None,
        }
    }

    /// Starts a press and arms the long-press timer.
    pub fn press(&mut self, x: f64, y: f64, at: Instant) {
        self.active = Some(Press {
            origin: (x, y),
            last: (x, y),
            started_at: at,
            long_press_armed: true,
            long_press_fired: false,
        });
    }

    /// Records motion; moving past the jitter tolerance disarms long press.
    pub fn motion(&mut self, x: f64, y: f64) {
        let jitter = self.jitter_tolerance;
        if let Some(press) = self.active.as_mut() {
            press.last = (x, y);
            let (dx, dy) = (x - press.origin.0, y - press.origin.1);
            if dx.abs() > jitter || dy.abs() > jitter {
                press.long_press_armed = false;
            }
        }
    }

    /// Timer tick: fires the long press once when the hold time has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<GestureEvent> {
        let long_press = self.long_press;
        let press = self.active.as_mut()?;
        if press.long_press_armed
            && !press.long_press_fired
            && now.saturating_duration_since(press.started_at) >= long_press
        {
            press.long_press_fired = true;
            return Some(GestureEvent::LongPress);
        }
        None
    }

    /// Ends the press and classifies it.
    pub fn release(&mut self, x: f64, y: f64, now: Instant) -> Option<GestureEvent> {
        self.motion(x, y);
        let fired_now = self.poll(now);
        let press = self.active.take()?;
        if fired_now.is_some() {
            return fired_now;
        }
        if press.long_press_fired {
            return None;
        }
        let (dx, dy) = (press.last.0 - press.origin.0, press.last.1 - press.origin.1);
        classify_swipe(dx, dy, self.swipe_threshold).map(GestureEvent::Swipe)
    }

    /// Drops the active press without emitting anything.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_pressed(&self) -> bool {
        self.active.is_some()
    }
}
