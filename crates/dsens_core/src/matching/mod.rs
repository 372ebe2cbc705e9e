pub mod greedy;
pub mod optimal;
pub mod types;

pub use greedy::greedy_match;
pub use optimal::optimal_match;
pub use types::{MatchedSet, Matching};
