//! CLI command implementations.

pub mod build;
pub mod check;
pub mod feed;
pub mod init;

pub use build::build_site;
pub use check::check_site;
pub use feed::print_feed;
pub use init::init_project;
