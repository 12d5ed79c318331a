pub mod directories;
pub mod housekeeping;
pub mod logging;
pub mod shutdown;
