//! Command handlers - extracted from main.rs for testability

pub mod check;
pub mod init;

pub use check::{check_document, execute_check, select_documents, DocumentCheck};
pub use init::{execute_init, scaffold, scaffold_files};
