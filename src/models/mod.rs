pub mod channel;
pub mod provider;
pub mod stream;

pub use channel::*;
pub use provider::*;
pub use stream::*;
