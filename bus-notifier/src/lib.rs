//! Bus arrival notifier.
//!
//! Polls live bus positions for the routes users watch and tells each
//! subscriber when a bus is close to their stop. The decision logic lives in
//! [`proximity`]; [`poll`] drives it over a [`source::LiveStatusSource`], a
//! [`store::SubscriptionStore`] and a [`notify::Notifier`].

pub mod cache;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod notify;
pub mod poll;
pub mod proximity;
pub mod simulator;
pub mod source;
pub mod store;
pub mod tdx;
pub mod web;
