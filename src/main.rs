//! Page entry point: cooldown for the page's form and the media replay button.

use log::Level;
use submit_cooldown::{dom::on_dom_ready, install_cooldown, install_replay};

fn main() {
    // Set the panic hook to log detailed errors to the console
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        Level::Debug
    } else {
        Level::Info
    };
    // a logger already installed by the embedding page wins
    let _ = console_log::init_with_level(level);

    on_dom_ready(|| {
        install_cooldown();
        install_replay();
    });
}
