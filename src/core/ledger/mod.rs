//! The ledger computation engine. Every function here is a pure view over
//! the full expense and payment history; nothing is cached between calls.

pub mod net;
pub mod pairwise;
pub mod simplify;
pub mod splits;
pub mod view;

pub use net::{net_balances, net_positions};
pub use pairwise::aggregate_pairwise;
pub use simplify::simplify_debts;
pub use splits::{
    MemberValue, SplitPolicy, SplitShare, SplitValidation, apply_remainder_fix, equal_split,
    percentage_split, share_split, unequal_split, validate_percentages, validate_splits,
};
pub use view::select_view;
