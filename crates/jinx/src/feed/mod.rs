//! Posts, curses and curse styles, including the style-enriched timeline.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Curse, CurseStyle, Post, PostContent, PostType};
pub use repository::{CurseRepository, CurseStyleRepository, PostRepository, PostWithAuthor};
pub use service::{CurseService, FeedError, PostService, PostView, ANONYMOUS_NAME};
