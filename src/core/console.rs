// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Console boundary
//!
//! The teletype device talks to the outside world through this trait so
//! the core never touches a real terminal. Raw-mode handling, line
//! discipline and blocking reads all live with the implementor: inside
//! the emulation loop only the non-blocking [`Console::poll_char`] is
//! ever used, because a device dispatch must complete synchronously
//! before the next instruction proceeds.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Character-at-a-time console endpoint
pub trait Console {
    /// Fetch one input byte if available, without blocking
    fn poll_char(&mut self) -> Option<u8>;

    /// Emit one output byte
    fn put_char(&mut self, ch: u8);

    /// Emit a string
    fn put_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.put_char(b);
        }
    }
}

/// In-memory console backed by queues
///
/// Used by tests and headless runs: input is scripted up front, output
/// accumulates for later inspection. Clones share the same queues, so a
/// test can keep a handle after moving a clone into the teletype.
///
/// # Example
/// ```
/// use pdp8e::core::console::{BufferConsole, Console};
///
/// let console = BufferConsole::new();
/// let mut handle = console.clone();
/// handle.put_str("OK");
/// assert_eq!(console.output(), b"OK");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    inner: Rc<RefCell<Buffers>>,
}

#[derive(Debug, Default)]
struct Buffers {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be seen by subsequent polls
    pub fn push_input(&self, bytes: &[u8]) {
        self.inner.borrow_mut().input.extend(bytes);
    }

    /// Everything written so far
    pub fn output(&self) -> Vec<u8> {
        self.inner.borrow().output.clone()
    }
}

impl Console for BufferConsole {
    fn poll_char(&mut self) -> Option<u8> {
        self.inner.borrow_mut().input.pop_front()
    }

    fn put_char(&mut self, ch: u8) {
        self.inner.borrow_mut().output.push(ch);
    }
}
