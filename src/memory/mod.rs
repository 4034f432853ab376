pub mod stm;

pub use stm::{ShortTermStore, StmState};
