//! # Quiz Arena Engine
//!
//! This library provides the competitive session engine for live,
//! multi-participant quizzes: the session state machine, the
//! answer-submission pipeline with its scoring rules, leaderboard
//! ranking, and the two competitive lifecycle variants built on top of
//! them (battle royale eliminations and tournament brackets).
//!
//! The crate is transport-agnostic: participants, presenters, and
//! persistence live in the surrounding application, which drives the
//! [`engine::Engine`] API and receives [`events::Event`]s through its
//! [`events::EventSink`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::missing_errors_doc)]

use derive_where::derive_where;
use itertools::Itertools;
use serde::Serialize;

pub mod constants;

pub mod bracket;
pub mod elimination;
pub mod engine;
pub mod error;
pub mod events;
pub mod leaderboard;
pub mod names;
pub mod participant;
pub mod question;
pub mod scoring;
pub mod session;
pub mod session_id;

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// Used wherever a broadcast payload should show only the leading slice
/// of a collection — the top of a leaderboard, say — while still
/// reporting how many items exist in total.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Maps a function over the items in the truncated vector
    pub fn map<F, U>(self, f: F) -> TruncatedVec<U>
    where
        F: Fn(T) -> U,
    {
        TruncatedVec {
            exact_count: self.exact_count,
            items: self.items.into_iter().map(f).collect_vec(),
        }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}
