//! FIX 5.0 SP2 style text encoder implementing OrderEncoder.
//!
//! Fields are `tag=value|`. The header carries body length and the trailer a
//! checksum (byte sum modulo 256) over the body.

use crate::domain::order::{OrderInstruction, Side};
use crate::ports::order_port::OrderEncoder;
use std::fmt::Write;

const BEGIN_STRING: &str = "FIX.5.0SP2";
const NEW_ORDER_SINGLE: &str = "D";
const ORD_TYPE_MARKET: u32 = 1;

const TAG_BEGIN_STRING: u32 = 8;
const TAG_BODY_LENGTH: u32 = 9;
const TAG_MSG_TYPE: u32 = 35;
const TAG_MSG_SEQ_NUM: u32 = 34;
const TAG_SENDER_COMP_ID: u32 = 49;
const TAG_TARGET_COMP_ID: u32 = 56;
const TAG_CL_ORD_ID: u32 = 11;
const TAG_HANDL_INST: u32 = 21;
const TAG_SYMBOL: u32 = 55;
const TAG_SIDE: u32 = 54;
const TAG_ORDER_QTY: u32 = 38;
const TAG_ORD_TYPE: u32 = 40;
const TAG_TIME_IN_FORCE: u32 = 59;
const TAG_TEXT: u32 = 58;
const TAG_CHECKSUM: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixEncoder {
    pub sender: String,
    pub target: String,
}

impl Default for FixEncoder {
    fn default() -> Self {
        FixEncoder {
            sender: "LFT2".to_string(),
            target: "ALPACA".to_string(),
        }
    }
}

fn side_code(side: Side) -> &'static str {
    match side {
        Side::Buy => "1",
        Side::Sell => "2",
    }
}

fn field(out: &mut String, tag: u32, value: impl std::fmt::Display) {
    // writing into a String cannot fail
    let _ = write!(out, "{}={}|", tag, value);
}

pub fn checksum(body: &str) -> u32 {
    body.bytes().map(u32::from).sum::<u32>() % 256
}

impl OrderEncoder for FixEncoder {
    fn encode(&self, order: &OrderInstruction, seq: u32) -> String {
        let mut body = String::new();
        field(&mut body, TAG_MSG_TYPE, NEW_ORDER_SINGLE);
        field(&mut body, TAG_MSG_SEQ_NUM, seq);
        field(&mut body, TAG_SENDER_COMP_ID, &self.sender);
        field(&mut body, TAG_TARGET_COMP_ID, &self.target);
        field(&mut body, TAG_CL_ORD_ID, &order.client_order_id);
        field(&mut body, TAG_HANDL_INST, 1);
        field(&mut body, TAG_SYMBOL, &order.symbol);
        field(&mut body, TAG_SIDE, side_code(order.side));
        field(&mut body, TAG_ORDER_QTY, order.quantity);
        field(&mut body, TAG_ORD_TYPE, ORD_TYPE_MARKET);
        field(&mut body, TAG_TIME_IN_FORCE, 0);
        if !order.tag.is_empty() {
            field(&mut body, TAG_TEXT, &order.tag);
        }

        let mut msg = String::new();
        field(&mut msg, TAG_BEGIN_STRING, BEGIN_STRING);
        field(&mut msg, TAG_BODY_LENGTH, body.len());
        msg.push_str(&body);
        field(&mut msg, TAG_CHECKSUM, format!("{:03}", checksum(&body)));
        msg.push('\n');
        msg
    }
}
