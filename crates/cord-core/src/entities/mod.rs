//! Domain entities decoded from gateway and REST payloads
//!
//! Representative subset of the remote service's object catalog; new
//! object kinds are added by declaring another struct here.

mod guild;
mod member;
mod message;
mod role;
mod user;

pub use guild::Guild;
pub use member::Member;
pub use message::Message;
pub use role::Role;
pub use user::User;
