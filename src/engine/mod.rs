pub mod collector;
pub mod core;
pub mod executor;
pub mod state;
pub mod stats;


pub use collector::{CountingSink, DocSetCollector, Flow, MatchSink, MatchTuple, TupleCollector};
pub use core::SearchEngine;
pub use executor::QueryExecutor;
pub use state::{PostingState, DEFAULT_LIN_SEARCH_ITERS};
pub use stats::ExecStats;
