//! A DNS client: a wire codec for [rfc1035] messages, and a [`Resolver`]
//! that races a query across several servers over UDP and TCP.
//!
//! ```rust,no_run
//! use dnsquery::clients::{Config, Resolver};
//! use dnsquery::{Query, Type};
//!
//! let resolver = Resolver::new(Config::default());
//!
//! let query = Query::new("example.com".parse()?, Type::A);
//! println!("{}", resolver.resolve(&query)?);
//! # Ok::<(), dnsquery::Error>(())
//! ```
//!
//! [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
//! [`Resolver`]: crate::clients::Resolver

#[macro_use]
mod cfg;

mod display;
mod dns;
mod errors;
mod from_str;
mod io;
mod name;

pub mod clients;
pub mod resource;
pub mod types;

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate lazy_static;

pub use crate::types::*;

// Pull up the various types that should be on the front page of the docs.
#[doc(inline)]
pub use crate::types::Message;
#[doc(inline)]
pub use crate::types::Query;
#[doc(inline)]
pub use crate::types::Question;
#[doc(inline)]
pub use crate::types::Record;

#[doc(inline)]
pub use crate::types::Class;

#[doc(inline)]
pub use crate::types::Type;

pub use crate::dns::HEADER_LEN;
pub use crate::errors::{Error, Protocol, Result};
pub use crate::from_str::FromStrError;
pub use crate::io::MAX_POINTER_HOPS;
pub use crate::name::{Label, Name};
