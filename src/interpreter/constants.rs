// Constants for the stack machine

/// Number of words in the process address space
pub const CAPACITY: usize = 500;

/// Index of the first word of the text segment
/// Cells below this index are never used
pub const CODE_START: usize = 10;

/// Default snapshot history limit for the viewer (256 MB)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 256 * 1024 * 1024;
