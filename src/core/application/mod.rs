pub mod data_source;
pub mod source_selector;
