//! In-memory stand-ins for the collaborators of a MediaConnection, used by the crate's
//! tests and by interceptor authors testing their own plugins.

pub mod mock_interceptor;
pub mod mock_stream;
pub mod mock_transport;
