mod ask;
mod suggestions;

pub(crate) use ask::ask;
pub(crate) use suggestions::suggestions;
