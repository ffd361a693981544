pub(crate) mod converter;
pub(crate) mod workspace;
