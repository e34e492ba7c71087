pub(crate) mod ai;
pub(crate) mod health;
pub(crate) mod overview;
