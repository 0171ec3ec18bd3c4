mod expense;
pub mod money;
mod participant;
mod settlement;
mod summary;
mod trip;
mod user;
mod validation;

pub use expense::*;
pub use money::{
    Cents, MAX_AMOUNT_CENTS, ParseCentsError, check_range, divide_half_up, format_cents,
    parse_cents,
};
pub use participant::*;
pub use settlement::*;
pub use summary::*;
pub use trip::*;
pub use user::*;
pub use validation::*;
