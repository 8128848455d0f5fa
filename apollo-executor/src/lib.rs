//! An in-process execution engine for GraphQL selection trees.
//!
//! A [`Schema`] describes the types, their fields and the resolvers producing the
//! values of those fields. An [`Executor`] walks the selection tree of a
//! [`graphql::Request`] against it and assembles a [`graphql::Response`], nulling
//! out what failed and reporting why in its `errors`.

#![cfg_attr(feature = "failfast", allow(unreachable_code))]
#![warn(unreachable_pub)]

macro_rules! failfast_debug {
    ($($tokens:tt)+) => {{
        tracing::debug!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

macro_rules! failfast_error {
    ($($tokens:tt)+) => {{
        tracing::error!($($tokens)+);
        #[cfg(feature = "failfast")]
        panic!(
            "failfast triggered. \
            Please remove the feature failfast if you don't want to see these panics"
        );
    }};
}

pub mod configuration;
mod context;
pub mod demo;
pub mod error;
mod executable;
pub mod execution;
pub mod graphql;
pub mod json_ext;
pub mod spec;
pub mod store;

pub use configuration::Configuration;
pub use context::Context;
pub use executable::Executable;
pub use executable::main;
pub use execution::Executor;
pub use execution::Resolver;
pub use execution::execute;
pub use spec::Schema;
pub use store::Store;
