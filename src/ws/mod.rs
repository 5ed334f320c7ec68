pub mod connctx;
pub mod registry;
