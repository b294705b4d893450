//! SeaORM entity models
//!
//! Database entities for Peerview

mod submission;
mod user;

pub use submission::{
    Entity as SubmissionEntity,
    Model as Submission,
    ActiveModel as SubmissionActiveModel,
    Column as SubmissionColumn,
    FileKind,
    SubmissionStatus,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};
