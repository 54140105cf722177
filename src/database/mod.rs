// Database module
// SQLite storage for the board, the derived task embedding index and chat history

pub mod sqlite;

pub use sqlite::*;
