pub(crate) mod args;
pub(crate) mod util;

mod run;

pub(crate) use run::run;
