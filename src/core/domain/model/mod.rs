pub mod call_result;
pub mod soap_connection;
pub mod soap_fault;
pub mod source_options;
pub mod sql_connection;
pub mod summary;
