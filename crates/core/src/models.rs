pub mod countdown;
pub mod participant;
pub mod rally;
