// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configured mailbox accounts and their store.

pub mod model;
pub mod store;

pub use model::{Account, AccountPatch, AccountView, NewAccount, Secret};
pub use store::{AccountStore, AccountStoreError};
