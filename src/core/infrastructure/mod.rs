pub mod http_transport;
pub mod mock_collector;
pub mod remote_operations;
pub mod soap_collector;
pub mod soap_envelope;
pub mod sql_collector;
pub mod sql_server;
