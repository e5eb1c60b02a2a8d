pub mod palette;
pub mod render;
pub mod repl;
pub mod session;
pub mod transport;

pub use session::{ ChatSession, SendError, SendOutcome, FALLBACK_REPLY };
pub use transport::{ ChatTransport, HttpTransport, TransportError };
