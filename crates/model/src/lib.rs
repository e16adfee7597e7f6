//! # Codeowners Model
//!
//! Structured, round-trippable representation of a CODEOWNERS file and the
//! list of valid owners it is checked against.
//!
//! ## Architecture
//!
//! ```text
//! CODEOWNERS text
//!     │
//!     ├──> Line classification (never fails)
//!     │      └─ Blank | Comment | Rule(pattern, owners) | Unrecognized
//!     │
//!     ├──> Group (ordered lines, stable ids, dirty tracking)
//!     │      ├─ last-match-wins ownership lookup
//!     │      └─ line-addressed edits → refresh → serialize
//!     │
//!     └──> OwnersList (membership + "did you mean")
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codeowners_model::Group;
//!
//! let group = Group::parse("* @a\ndocs/* @b\n");
//! let owners: Vec<&str> = group.owners_for("docs/readme.md").unwrap().iter().collect();
//! assert_eq!(owners, vec!["@b"]);
//! assert_eq!(group.to_content(), "* @a\ndocs/* @b\n");
//! ```

mod distance;
mod error;
mod group;
mod line;
mod owners_list;
mod pattern;

pub use distance::{closest, edit_distance};
pub use error::{ModelError, Result};
pub use group::Group;
pub use line::{is_owner, LineId, OwnerSet, OwnershipLine, PatternRule, UnrecognizedLine};
pub use owners_list::OwnersList;
pub use pattern::Pattern;
