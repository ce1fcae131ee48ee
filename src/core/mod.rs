// Core modules implementing tokenization, cursor traversal, binding decode, and errors.
pub mod binding;
pub mod cursor;
pub mod error;
pub mod token;
