pub(crate) mod transcode;
