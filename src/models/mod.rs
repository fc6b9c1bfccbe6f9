pub mod account;
pub mod page;
pub mod session;
pub mod settings;
pub mod task;

pub use account::*;
pub use page::*;
pub use session::*;
pub use settings::*;
pub use task::*;
