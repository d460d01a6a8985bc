//! Persistence for the meme diffusion simulator.
//!
//! - [`graph`]: JSON graph documents, to and from [`meme_core::SocialGraph`]
//! - [`results`]: append-only comma-separated results tables shared by
//!   concurrent writers

pub mod error;
pub mod graph;
pub mod results;

pub use error::{IoError, IoResult};
pub use graph::{read_graph, write_graph, GraphDocument, NodeRecord};
pub use results::{EmpiricalRow, ResultRow, ResultsTable, Row};
