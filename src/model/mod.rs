//! Domain records harvested from the upstream API
//!
//! Users, tweets and hashtags are value-like records: the API client produces
//! them, the orchestrator owns them for the duration of one crawl step, and the
//! store takes durable ownership on upsert.

mod hashtag;
mod tweet;
mod user;

pub use hashtag::Hashtag;
pub use tweet::{Mention, ReplyTarget, Tweet};
pub use user::User;
