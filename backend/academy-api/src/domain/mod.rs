pub mod progression;
pub mod spaced_repetition;
pub mod ticker_search;
