pub mod common;
pub mod filter;
pub mod record;
pub mod relationship;
pub mod tags;
pub mod tool;
pub mod tool_type;
pub mod user_context;

pub use common::*;
pub use filter::*;
pub use record::*;
pub use relationship::*;
pub use tags::*;
pub use tool::*;
pub use tool_type::*;
pub use user_context::*;
