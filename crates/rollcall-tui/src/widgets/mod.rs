//! Reusable rendering helpers shared by screens and the app chrome.

pub mod facets;
pub mod fmt;
pub mod popup;
