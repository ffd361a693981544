pub(crate) mod tgs;
