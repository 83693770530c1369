/// Middleware for the API server
///
/// - `access`: bearer authentication and board/workspace/project role guards
/// - `security`: security response headers

pub mod access;
pub mod security;
