//! Lexitrack core: the progress-tracking and scheduling domain.
//!
//! The pieces fit together as follows. A [`model::UserProfile`] selects a
//! severity, which picks a template out of the [`template::TemplateCatalog`].
//! The [`schedule`] module merges that template with persisted custom tasks,
//! the [`ledger`] records completed task ids per day and the [`milestone`]
//! engine walks the ordered milestone queue. [`calendar`] is the read side.
//! [`store`] ties the state together behind typed actions and [`session`]
//! executes the resulting persistence effects through the [`sync`] write
//! queue against a [`gateway::PersistenceGateway`].

pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod milestone;
pub mod model;
pub mod retry;
pub mod schedule;
pub mod session;
pub mod store;
pub mod sync;
pub mod template;
