pub mod footer;
pub mod header;
pub mod results;
pub mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{ensure_valid_selection, entry_suffix, format_price, heart, truncate};
