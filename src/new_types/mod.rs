// (c) Roel Kluin, 2023, GPL v3

pub mod largeint;
pub mod strand;

pub mod twobit;
