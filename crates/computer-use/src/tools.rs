pub mod computer;
pub mod dispatcher;
pub mod system;

pub use computer::ComputerSystem;
pub use dispatcher::ToolDispatcher;
pub use system::System;
