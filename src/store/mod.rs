pub mod sentence_cache;
