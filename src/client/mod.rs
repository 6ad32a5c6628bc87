pub mod generation;
pub mod session;
pub mod state;
pub mod transport;

pub use generation::GenerationClient;
pub use session::{DocumentSession, Step};
pub use state::{GenerationOutcome, StreamSnapshot};
pub use transport::{GenerationRequest, GenerationTransport, HttpTransport};
