// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Every function takes a [`crate::Database`] and runs
//! one statement (or one short transaction) on its connection.

pub mod history;
pub mod orders;
pub mod products;
pub mod users;
