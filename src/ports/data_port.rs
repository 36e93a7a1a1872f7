//! Bar source port trait.

use crate::domain::bar::Bar;
use crate::domain::error::LftError;

pub trait BarSource {
    /// Bars for `symbol` in ascending time order.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, LftError>;

    fn list_symbols(&self) -> Result<Vec<String>, LftError>;
}
