mod entries;
mod spins;
