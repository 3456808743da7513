//! LC-3 Machine Code Encoder
//!
//! This module converts parsed LC-3 assembly code into binary machine code.
//! It implements the complete LC-3 Instruction Set Architecture (ISA).
//!
//! ## Supported Instructions
//!
//! - **Operate**: ADD, AND, NOT
//! - **Data Movement**: LD, LDI, LDR, LEA, ST, STI, STR
//! - **Control Flow**: BR (with condition codes), JMP, JSR, JSRR, RTI, RET
//! - **Trap**: TRAP, GETC, OUT, PUTS, IN, PUTSP, HALT
//!
//! ## Directives
//!
//! - **.ORIG** - Set origin address
//! - **.FILL** - Fill one word with value or label address
//! - **.BLKW** - Allocate block of words
//! - **.STRINGZ** - Store null-terminated string
//! - **.END** - End of program

use crate::codec::{self, Flags};
use crate::error::{AsmError, ErrorKind, Span};
use crate::first_pass::{symbol_table::SymbolTable, FirstPassResult};
use crate::parser::ast::{Instruction, LineContent, SourceLine};

/// Result of the encoding process
pub struct EncodeResult {
    /// Generated machine code as 16-bit words
    pub machine_code: Vec<u16>,
    /// Origin address where program should be loaded
    pub orig_address: u16,
    /// Errors encountered during encoding
    pub errors: Vec<AsmError>,
}

/// Encode the assembled program into LC-3 machine code
///
/// This function performs the second pass of the assembler, converting
/// the parsed AST and symbol table into binary machine code.
///
/// # Arguments
///
/// * `first_pass` - Result from the first pass containing AST and symbol table
///
/// # Returns
///
/// An `EncodeResult` containing the machine code and any errors encountered
#[must_use]
pub fn encode(first_pass: &FirstPassResult) -> EncodeResult {
    let mut encoder = Encoder::new(&first_pass.symbol_table, first_pass.orig_address);

    for line in &first_pass.source_lines {
        encoder.encode_line(line);
    }

    EncodeResult {
        machine_code: encoder.machine_code,
        orig_address: encoder.orig_address,
        errors: encoder.errors,
    }
}

/// Serialize an `EncodeResult` into the LC-3 object file format: the origin
/// address followed by each machine code word, each as big-endian bytes.
#[must_use]
pub fn object_bytes(result: &EncodeResult) -> Vec<u8> {
    let mut bytes = Vec::with_capacity((result.machine_code.len() + 1) * 2);
    bytes.extend_from_slice(&result.orig_address.to_be_bytes());
    for word in &result.machine_code {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    bytes
}

struct Encoder<'a> {
    symbol_table: &'a SymbolTable,
    machine_code: Vec<u16>,
    orig_address: u16,
    current_address: u16,
    errors: Vec<AsmError>,
}

impl<'a> Encoder<'a> {
    fn new(symbol_table: &'a SymbolTable, orig_address: u16) -> Self {
        Self {
            symbol_table,
            machine_code: Vec::new(),
            orig_address,
            current_address: orig_address,
            errors: Vec::new(),
        }
    }

    fn encode_line(&mut self, line: &SourceLine) {
        match &line.content {
            LineContent::Empty => {}
            LineContent::Orig(_) => {} // Already handled in first pass
            LineContent::End => {}     // End of program
            LineContent::FillImmediate(value) => {
                self.emit(*value as u16);
            }
            LineContent::FillLabel(label) => match self.symbol_table.get(label) {
                Some(addr) => self.emit(addr),
                None => {
                    self.errors
                        .push(AsmError::undefined_label(label, line.span));
                    self.emit(0);
                }
            },
            LineContent::Blkw(count) => {
                for _ in 0..*count {
                    self.emit(0);
                }
            }
            LineContent::Stringz(s) => {
                for ch in s.chars() {
                    self.emit(ch as u16);
                }
                self.emit(0); // Null terminator
            }
            LineContent::Instruction(inst) => {
                self.encode_instruction(inst, line.span);
            }
        }
    }

    fn encode_instruction(&mut self, inst: &Instruction, span: Span) {
        let decoded = match inst {
            // Operate instructions
            Instruction::AddReg { dr, sr1, sr2 } => {
                codec::Instruction::AddReg { dr: *dr, sr1: *sr1, sr2: *sr2 }
            }
            Instruction::AddImm { dr, sr1, imm5 } => {
                codec::Instruction::AddImm { dr: *dr, sr1: *sr1, imm5: *imm5 }
            }
            Instruction::AndReg { dr, sr1, sr2 } => {
                codec::Instruction::AndReg { dr: *dr, sr1: *sr1, sr2: *sr2 }
            }
            Instruction::AndImm { dr, sr1, imm5 } => {
                codec::Instruction::AndImm { dr: *dr, sr1: *sr1, imm5: *imm5 }
            }
            Instruction::Not { dr, sr } => codec::Instruction::Not { dr: *dr, sr: *sr },

            // Data movement with PC offset
            Instruction::Ld { dr, label } => {
                codec::Instruction::Ld { dr: *dr, pc_offset9: self.calc_pc_offset(label, 9, span) }
            }
            Instruction::Ldi { dr, label } => {
                codec::Instruction::Ldi { dr: *dr, pc_offset9: self.calc_pc_offset(label, 9, span) }
            }
            Instruction::Lea { dr, label } => {
                codec::Instruction::Lea { dr: *dr, pc_offset9: self.calc_pc_offset(label, 9, span) }
            }
            Instruction::St { sr, label } => {
                codec::Instruction::St { sr: *sr, pc_offset9: self.calc_pc_offset(label, 9, span) }
            }
            Instruction::Sti { sr, label } => {
                codec::Instruction::Sti { sr: *sr, pc_offset9: self.calc_pc_offset(label, 9, span) }
            }

            // Data movement with base+offset
            Instruction::Ldr { dr, base_r, offset6 } => {
                codec::Instruction::Ldr { dr: *dr, base_r: *base_r, offset6: *offset6 }
            }
            Instruction::Str { sr, base_r, offset6 } => {
                codec::Instruction::Str { sr: *sr, base_r: *base_r, offset6: *offset6 }
            }

            // Branch
            Instruction::Br { flags, label } => codec::Instruction::Br {
                flags: Flags { n: flags.n, z: flags.z, p: flags.p },
                pc_offset9: self.calc_pc_offset(label, 9, span),
            },

            // Jump
            Instruction::Jmp { base_r } => codec::Instruction::Jmp { base_r: *base_r },
            Instruction::Ret => codec::Instruction::Jmp { base_r: 7 },

            // Subroutine
            Instruction::Jsr { label } => {
                codec::Instruction::Jsr { pc_offset11: self.calc_pc_offset(label, 11, span) }
            }
            Instruction::Jsrr { base_r } => codec::Instruction::Jsrr { base_r: *base_r },

            // Trap
            Instruction::Trap { trapvect8 } => codec::Instruction::Trap { trapvect8: *trapvect8 },
            Instruction::Getc => codec::Instruction::Trap { trapvect8: codec::TRAP_GETC },
            Instruction::Out => codec::Instruction::Trap { trapvect8: codec::TRAP_OUT },
            Instruction::Puts => codec::Instruction::Trap { trapvect8: codec::TRAP_PUTS },
            Instruction::In => codec::Instruction::Trap { trapvect8: codec::TRAP_IN },
            Instruction::Putsp => codec::Instruction::Trap { trapvect8: codec::TRAP_PUTSP },
            Instruction::Halt => codec::Instruction::Trap { trapvect8: codec::TRAP_HALT },

            // System
            Instruction::Rti => codec::Instruction::Rti,
        };

        self.emit(codec::encode(decoded));
    }

    /// Calculate PC-relative offset to a label
    ///
    /// PC-relative addressing in LC-3 works as follows:
    /// 1. During execution, PC points to the NEXT instruction (current + 1)
    /// 2. The offset is added to this incremented PC: effective_address = PC + offset
    /// 3. Therefore: offset = target_address - (current_address + 1)
    ///
    /// The offset must fit in the specified number of bits as a signed value.
    /// For example, with 9 bits: range is -256 to +255
    fn calc_pc_offset(&mut self, label: &str, bits: u8, span: Span) -> i16 {
        match self.symbol_table.get(label) {
            Some(target_addr) => {
                // PC will point to next instruction during execution
                let pc = self.current_address.wrapping_add(1);

                // Calculate signed offset from PC to target
                let offset = (target_addr as i32) - (pc as i32);

                // Check if offset fits in the specified number of bits (signed range)
                let max_offset = (1 << (bits - 1)) - 1;
                let min_offset = -(1 << (bits - 1));

                if offset < min_offset || offset > max_offset {
                    self.errors.push(AsmError::new(
                        ErrorKind::OffsetOutOfRange,
                        format!(
                            "PC offset {} to label '{}' exceeds {}-bit range [{}, {}]",
                            offset, label, bits, min_offset, max_offset
                        ),
                        span,
                    ));
                    0 // Use 0 on error, but error is recorded
                } else {
                    offset as i16
                }
            }
            None => {
                self.errors.push(AsmError::undefined_label(label, span));
                0
            }
        }
    }

    fn emit(&mut self, word: u16) {
        self.machine_code.push(word);
        self.current_address = self.current_address.wrapping_add(1);
    }
}
