//! Order message encoding port trait.

use crate::domain::order::OrderInstruction;

pub trait OrderEncoder {
    /// Renders one order as a wire message using sequence number `seq`.
    fn encode(&self, order: &OrderInstruction, seq: u32) -> String;

    fn encode_batch(&self, orders: &[OrderInstruction]) -> String {
        orders
            .iter()
            .zip(1u32..)
            .map(|(order, seq)| self.encode(order, seq))
            .collect()
    }
}
