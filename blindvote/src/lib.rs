#[macro_use]
extern crate serde;

mod arith;
mod authority;
mod cache;
mod config;
mod contract;
mod credential;
mod error;
mod identity;
mod key;
mod protocol;
mod resolver;
mod scheme;
pub mod serde_decimal;

pub use arith::*;
pub use authority::*;
pub use cache::*;
pub use config::*;
pub use contract::*;
pub use credential::*;
pub use error::*;
pub use identity::*;
pub use key::*;
pub use protocol::*;
pub use resolver::*;
pub use scheme::*;

pub use rsa::BigUint;
