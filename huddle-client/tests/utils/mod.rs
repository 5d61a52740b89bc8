
pub use mock_signaling::*;
pub use mock_transport::*;
pub use session_helpers::*;
