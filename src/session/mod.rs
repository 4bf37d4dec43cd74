// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side session lifecycle (storage, observation, sign-in/out).

pub mod signout;
pub mod storage;
pub mod store;

pub use signout::{Navigator, SignOutNotifier};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageEvent};
pub use store::{SessionStore, SignIn};
