use anyhow::Result;

pub trait Source {
    type Item;
    fn scan(&self) -> Result<Vec<Self::Item>>;
}

pub mod installs;
pub mod lnk;
pub mod shortcuts;
