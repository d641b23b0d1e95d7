pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod reindex;
pub mod report;
pub mod worker;

pub use error::{CoreError, Result};

use colored::Colorize;

const BANNER: &str = r#"
                         _ _       _
  _ __   ___ _ __ _ __ ___   __ _| (_)_ __ | | __
 | '_ \ / _ \ '__| '_ ` _ \ / _` | | | '_ \| |/ /
 | |_) |  __/ |  | | | | | | (_| | | | | | |   <
 | .__/ \___|_|  |_| |_| |_|\__,_|_|_|_| |_|_|\_\
 |_|"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "catalog url rewrites".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
