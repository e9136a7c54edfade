//! Built-in top-level model objects and the handlers that create them.
//!
//! | Object | Problem blocks |
//! |--------|----------------|
//! | [`Balance`] | equality `Balance:<name>` per period, slack `Flow:SlackFlow<name>` for power |
//! | [`Flow`] | variable `Flow:<name>` on the finest connected horizon |
//! | [`Storage`] | variables `Storage:<name>`, `StorageStart:<name>`; row `StartEqualStop:<name>` |
//!
//! Arrows, capacities, costs, right-hand-side terms and boundary conditions
//! are attached to one of these objects instead of becoming objects
//! themselves.

pub mod attach;
pub mod balance;
pub mod flow;
pub mod storage;
pub mod terms;

pub use balance::{Balance, BalanceKind, RhsTerm};
pub use flow::{Arrow, Flow};
pub use storage::Storage;
pub use terms::{Bound, Capacity, CostTerm, Direction, Pass, ScaledProduct, VariableTerms};
