/// Terminal surface: step table rendering and keyboard controls
pub mod table;
pub mod terminal;

pub use table::{render_row, render_table};
pub use terminal::{spawn_control_listener, TerminalView};
