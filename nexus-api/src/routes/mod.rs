/// API route handlers, one module per resource
///
/// - `health`: liveness and database check
/// - `users`: registration, sessions, email verification, password reset, OAuth
/// - `boards`: boards and board invitations
/// - `lists`: lists inside a board
/// - `cards`: cards on a board's lists
/// - `workspaces`: workspaces and member roles
/// - `projects`: projects inside a workspace
/// - `tasks`: tasks inside a project

pub mod boards;
pub mod cards;
pub mod health;
pub mod lists;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod workspaces;
