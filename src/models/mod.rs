// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod session;

pub use session::{Session, SessionState, SessionStatus, SessionUser, SESSION_KEY};
