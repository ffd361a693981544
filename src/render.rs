pub(crate) mod backend;
pub(crate) mod chrome;
pub(crate) mod frames;
pub(crate) mod page;
