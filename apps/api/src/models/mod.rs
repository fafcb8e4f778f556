pub mod coin;
pub mod swipe;
