pub use self::canceller::*;
pub use self::context::*;
pub use self::reason::*;

pub(crate) mod canceller;
pub(crate) mod context;
pub(crate) mod reason;
