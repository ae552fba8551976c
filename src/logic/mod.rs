pub mod bulk;
pub mod events;
pub mod notices;
pub mod relations;
pub mod report;
pub mod validate;

pub use bulk::*;
pub use events::*;
pub use notices::*;
pub use relations::*;
pub use report::*;
pub use validate::*;
