/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-up, login, logout and current user
/// - `articles`: Article listing, detail and editing
/// - `editor`: Category tree for the editor

pub mod articles;
pub mod auth;
pub mod editor;
pub mod health;
