/*
 * This module provides the application logic layer, centered around
 * `SessionHandler`, which owns the selection session and acts as the
 * presenter between the core services and the console layer. Tree rendering
 * state, the selection preview and the non-interactive batch mode live in their
 * own submodules. Unit tests for `SessionHandler` are in `handler_tests.rs`.
 */
pub mod batch;
pub mod handler;
pub mod preview;
pub mod tree_view_state;

#[cfg(test)]
mod handler_tests;

pub use handler::SessionHandler;
