pub mod booking;
pub mod payment_proof;
pub mod refund;
pub mod status;
pub mod transition;

pub use booking::*;
pub use payment_proof::*;
pub use refund::*;
pub use status::*;
pub use transition::*;
