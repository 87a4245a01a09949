pub mod chunk_store;
pub mod csv_util;
pub mod fact_store;
