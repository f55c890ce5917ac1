//! Link resolution: follows shortened/redirecting URLs to their terminal
//! state, concurrently for whole batches of harvested links.

mod host;
mod pool;
mod redirect;

pub use host::{build_absolute_url, canonical_host};
pub use pool::ResolverPool;
pub use redirect::{RedirectResolver, ResolveOutcome};
