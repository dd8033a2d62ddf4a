//! Parametric logic programs.
//!
//! A template is fixed bytecode plus a list of insertion points. Populating a
//! template copies the bytecode and writes each parameter at its offset
//! (integers as uvarints, byte strings length-prefixed), so the same
//! parameters always produce the same program and the same address.

use crate::types::Address;
use crate::utils::encode_uvarint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateParam {
    AddrIdx,
    SeedAmount,
    EmitterId,
    AppId,
    AppAddress,
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateSlot {
    pub offset: usize,
    pub param: TemplateParam,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramTemplate {
    pub bytecode: &'static [u8],
    pub slots: &'static [TemplateSlot],
}

/// Parameters of a per-slot participation account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulateData {
    pub addr_idx: u64,
    pub app_address: Address,
    pub app_id: u64,
    pub emitter_id: Vec<u8>,
    pub seed_amount: u64,
}

/// An instantiated program and the address it controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicProgram {
    pub bytes: Vec<u8>,
    pub address: Address,
}

impl LogicProgram {
    pub fn new(bytes: Vec<u8>) -> Self {
        let address = Address::for_program(&bytes);
        Self { bytes, address }
    }
}

impl ProgramTemplate {
    pub fn populate(&self, data: &PopulateData) -> LogicProgram {
        let mut bytes = Vec::with_capacity(self.bytecode.len() + 64);
        let mut copied = 0;

        for slot in self.slots {
            bytes.extend_from_slice(&self.bytecode[copied..slot.offset]);
            copied = slot.offset;

            match slot.param {
                TemplateParam::AddrIdx => bytes.extend(encode_uvarint(data.addr_idx)),
                TemplateParam::SeedAmount => bytes.extend(encode_uvarint(data.seed_amount)),
                TemplateParam::AppId => bytes.extend(encode_uvarint(data.app_id)),
                TemplateParam::EmitterId => push_bytes(&mut bytes, &data.emitter_id),
                TemplateParam::AppAddress => push_bytes(&mut bytes, data.app_address.as_bytes()),
            }
        }
        bytes.extend_from_slice(&self.bytecode[copied..]);

        LogicProgram::new(bytes)
    }
}

fn push_bytes(out: &mut Vec<u8>, value: &[u8]) {
    out.extend(encode_uvarint(value.len() as u64));
    out.extend_from_slice(value);
}

const PARTICIPATION_BYTECODE: [u8; 52] = [
    0x06, 0x20, 0x01, 0x01, 0x81, // addr_idx
    0x48, 0x81, // seed amount
    0x48, 0x80, // emitter id
    0x48, 0x31, 0x10, 0x81, 0x06, 0x12, 0x44, 0x31, 0x19, 0x22, 0x12, 0x44, 0x31, 0x18, 0x81, // app id
    0x12, 0x44, 0x31, 0x20, 0x80, // app address
    0x12, 0x44, 0x31, 0x01, 0x81, 0x00, 0x12, 0x44, 0x31, 0x09, 0x32, 0x03, 0x12, 0x44, 0x31,
    0x15, 0x81, 0x00, 0x12, 0x44, 0x81, 0x01, 0x43,
];

const PARTICIPATION_SLOTS: [TemplateSlot; 5] = [
    TemplateSlot { offset: 5, param: TemplateParam::AddrIdx },
    TemplateSlot { offset: 7, param: TemplateParam::SeedAmount },
    TemplateSlot { offset: 9, param: TemplateParam::EmitterId },
    TemplateSlot { offset: 24, param: TemplateParam::AppId },
    TemplateSlot { offset: 29, param: TemplateParam::AppAddress },
];

/// Template for sequence, guardian-set and per-asset participation accounts.
pub const PARTICIPATION_TEMPLATE: ProgramTemplate = ProgramTemplate {
    bytecode: &PARTICIPATION_BYTECODE,
    slots: &PARTICIPATION_SLOTS,
};

/// Shared signature verifier; it has no parameters.
pub const VERIFIER_BYTECODE: [u8; 138] = [
    6, 32, 4, 1, 0, 32, 20, 38, 1, 0, 49, 32, 50, 3, 18, 68, 49, 16, 129, 6, 18, 68, 54, 26, 1,
    54, 26, 3, 54, 26, 2, 136, 0, 3, 68, 34, 67, 53, 2, 53, 1, 53, 0, 40, 53, 240, 40, 53, 241,
    52, 0, 21, 53, 5, 35, 53, 3, 35, 53, 4, 52, 3, 52, 5, 12, 65, 0, 68, 52, 1, 52, 0, 52, 3,
    129, 65, 8, 34, 88, 23, 52, 0, 52, 3, 34, 8, 36, 88, 52, 0, 52, 3, 129, 33, 8, 36, 88, 7, 0,
    53, 241, 53, 240, 52, 2, 52, 4, 37, 88, 52, 240, 52, 241, 80, 2, 87, 12, 20, 18, 68, 52, 3,
    129, 66, 8, 53, 3, 52, 4, 37, 8, 53, 4, 66, 255, 180, 34, 137,
];

pub fn verifier_program() -> LogicProgram {
    LogicProgram::new(VERIFIER_BYTECODE.to_vec())
}
