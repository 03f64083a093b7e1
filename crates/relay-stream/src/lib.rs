// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Producer side of the Relay streaming layer.
//!
//! [`StreamWriter`] drives one generation job: it records every fragment in
//! the event log, keeps the job metadata current, honors cancellation
//! requests, and hands the finished reply to the durable conversation store.
//! [`JobRunner`] runs writers as background tasks, one per job id.

pub mod echo;
pub mod handoff;
pub mod runner;
pub mod writer;

pub use echo::EchoProvider;
pub use handoff::PersistenceHandoff;
pub use runner::JobRunner;
pub use writer::{JobReport, JobSpec, StreamWriter};
