mod clusters;
mod seeds;

pub use clusters::*;
pub use seeds::*;

#[cfg(test)]
mod tests;
