//! C3: ChangeSpec model, parser, serializer, and immutable update helpers.

pub mod model;
pub mod parse;
pub mod serialize;
pub mod update;

pub use model::{
    ChangeSpec, CommentEntry, CommitEntry, HookEntry, HookStatusLine, MentorEntry, MentorProfile,
    MentorStatusLine,
};
pub use parse::{parse_changespecs, parse_project_file};
pub use serialize::serialize_changespec;
