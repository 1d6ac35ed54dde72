pub(crate) mod logging;

pub(crate) mod number_payload;

pub(crate) mod validators;
