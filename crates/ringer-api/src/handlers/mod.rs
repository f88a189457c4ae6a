pub mod call;
pub mod device;
pub mod push;

pub use call::*;
pub use device::*;
pub use push::*;
