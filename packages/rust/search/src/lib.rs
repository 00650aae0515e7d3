//! Web search for organization websites and social profiles.
//!
//! [`CandidateGatherer`] runs queries through a [`SearchBackend`]
//! (DuckDuckGo's HTML page or SerpAPI) and returns a
//! [`CandidateSet`](brandscout_shared::CandidateSet).
//! [`official`] decides which candidates plausibly belong to the business.

pub mod backends;
pub mod gather;
pub mod official;

pub use backends::{DuckDuckGoBackend, SearchBackend, SerpApiBackend};
pub use gather::{CandidateGatherer, select_heuristic};
pub use official::{
    AGGREGATOR_DOMAINS, host_of, is_aggregator, is_aggregator_url, looks_official, tokenize,
    trim_url,
};
