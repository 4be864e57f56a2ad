// Audio module - click synthesis and the cpal output backend

pub mod click;
pub mod output;

pub use click::ClickTables;
pub use output::CpalClock;
