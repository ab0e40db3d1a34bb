pub mod comment;
pub mod draft;
pub mod post;
pub mod raw;
pub mod source;

pub use comment::{normalize_thread, Comment, CommentThread};
pub use draft::{MediaUpload, PostDraft, ReplyTarget};
pub use post::{resolve_timestamp, MediaAttachment, Post};
pub use raw::{RawPost, RawThread};
pub use source::{Source, TimelineFilter};
