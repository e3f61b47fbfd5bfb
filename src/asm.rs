//! Two-pass assembler: source text in, ROM image out.
//!
//! Pass one walks the lines to assign every label an absolute address; pass
//! two re-walks them to emit bytes with the completed label table in hand,
//! so references may point forwards or backwards freely.

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AsmError, AsmErrorKind};
use crate::isa::{self, OperandKind};

/// Address the ROM image is mapped at; label addresses count from here.
const ORIGIN: u16 = 0x200;

type LabelMap = IndexMap<String, u16, FxBuildHasher>;

lazy_static! {
    static ref LABEL_DEF: Regex = Regex::new(r"^([A-Za-z_]+):$").unwrap();
    static ref LABEL_NAME: Regex = Regex::new(r"^[A-Za-z_]+$").unwrap();
    static ref DATA_WORD: Regex = Regex::new(r"(?i)^DW\s+#([0-9A-F]{4})$").unwrap();
    static ref DATA_BYTE: Regex = Regex::new(r"(?i)^DB\s+\$([01.]{8})$").unwrap();
}

/// Assemble source text into a ROM image mapped at 0x200.
///
/// Any failure carries the 1-based line number and the offending line.
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    let labels = resolve_labels(source)?;

    let mut rom = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = strip(raw);
        let fail = |kind| AsmError::at(index + 1, line, kind);

        if line.is_empty() || is_directive(line) || LABEL_DEF.is_match(line) {
            continue;
        }
        if let Some(caps) = DATA_WORD.captures(line) {
            let word = parse_hex(&caps[1]).map_err(fail)?;
            rom.extend_from_slice(&word.to_be_bytes());
        } else if let Some(caps) = DATA_BYTE.captures(line) {
            rom.push(pack_bits(&caps[1]));
        } else {
            let opcode = encode_instruction(line, &labels).map_err(fail)?;
            rom.extend_from_slice(&opcode.to_be_bytes());
        }
    }
    Ok(rom)
}

/// Pass one: walk the lines tracking the memory pointer, recording each
/// label definition at the pointer's current value.
fn resolve_labels(source: &str) -> Result<LabelMap, AsmError> {
    let mut labels = LabelMap::default();
    let mut pointer = ORIGIN;

    for (index, raw) in source.lines().enumerate() {
        let line = strip(raw);
        if line.is_empty() || is_directive(line) {
            continue;
        }
        if let Some(caps) = LABEL_DEF.captures(line) {
            let name = &caps[1];
            if labels.insert(name.to_string(), pointer).is_some() {
                return Err(AsmError::at(
                    index + 1,
                    line,
                    AsmErrorKind::DuplicateLabel(name.to_string()),
                ));
            }
        } else if is_instruction(line) || DATA_WORD.is_match(line) {
            pointer += 2;
        } else if DATA_BYTE.is_match(line) {
            // DB packs a single byte, so the pointer moves by one; anything
            // else here would shift every label defined after mixed data.
            pointer += 1;
        } else {
            return Err(AsmError::at(
                index + 1,
                line,
                AsmErrorKind::UnknownInstruction(mnemonic_of(line).to_string()),
            ));
        }
    }
    Ok(labels)
}

/// Drop the `;` comment and surrounding whitespace.
fn strip(raw: &str) -> &str {
    raw.split(';').next().unwrap_or("").trim()
}

fn is_directive(line: &str) -> bool {
    line.starts_with("option")
}

fn mnemonic_of(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((head, _)) => head,
        None => line,
    }
}

fn is_instruction(line: &str) -> bool {
    isa::by_mnemonic(mnemonic_of(line)).is_some()
}

/// Parse `MNEMONIC [op[, op[, op]]]` and encode it via the instruction
/// table. Errors come back bare; the caller attaches line context.
fn encode_instruction(line: &str, labels: &LabelMap) -> Result<u16, AsmErrorKind> {
    let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (line, ""),
    };
    let desc = isa::by_mnemonic(mnemonic)
        .ok_or_else(|| AsmErrorKind::UnknownInstruction(mnemonic.to_string()))?;

    let operands: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };
    if operands.len() != desc.fields.len() {
        return Err(AsmErrorKind::OperandCount {
            expected: desc.fields.len(),
            found: operands.len(),
        });
    }

    let mut values = [0u16; 3];
    for ((field, text), slot) in desc
        .fields
        .iter()
        .zip(operands.iter().copied())
        .zip(&mut values)
    {
        *slot = match field.kind {
            OperandKind::Reg => parse_register(text)?,
            OperandKind::Addr => parse_address(text, labels)?,
            OperandKind::Byte | OperandKind::Nibble => parse_literal(text, field.kind)?,
        };
    }
    Ok(desc.encode(&values[..operands.len()]))
}

/// `V` followed by one hex digit.
fn parse_register(text: &str) -> Result<u16, AsmErrorKind> {
    let digit = text
        .strip_prefix('V')
        .or_else(|| text.strip_prefix('v'))
        .filter(|d| d.len() == 1)
        .ok_or_else(|| bad_operand(text, "register (V0-VF)"))?;
    u16::from_str_radix(digit, 16).map_err(|_| bad_operand(text, "register (V0-VF)"))
}

/// `$XXX` or a label name looked up in the table from pass one.
fn parse_address(text: &str, labels: &LabelMap) -> Result<u16, AsmErrorKind> {
    if let Some(hex) = text.strip_prefix('$') {
        if hex.len() != 3 {
            return Err(bad_operand(text, "address ($XXX)"));
        }
        return parse_hex(hex).map_err(|_| bad_operand(text, "address ($XXX)"));
    }
    if LABEL_NAME.is_match(text) {
        return labels
            .get(text)
            .copied()
            .ok_or_else(|| AsmErrorKind::UnresolvedLabel(text.to_string()));
    }
    Err(bad_operand(text, "address ($XXX) or label"))
}

/// `#`-prefixed hex sized exactly to the field, or a decimal number.
/// Only the decimal path can overflow; a wrongly-sized hex literal is a
/// format error.
fn parse_literal(text: &str, kind: OperandKind) -> Result<u16, AsmErrorKind> {
    let limit = kind.limit();
    if let Some(hex) = text.strip_prefix('#') {
        let digits = (kind.width() / 4) as usize;
        if hex.len() != digits {
            return Err(bad_operand(text, "sized hex literal"));
        }
        return parse_hex(hex).map_err(|_| bad_operand(text, "sized hex literal"));
    }
    let value: u32 = text
        .parse()
        .map_err(|_| bad_operand(text, "decimal or # hex literal"))?;
    if value > limit as u32 {
        return Err(AsmErrorKind::LiteralOverflow { value, limit });
    }
    Ok(value as u16)
}

fn parse_hex(digits: &str) -> Result<u16, AsmErrorKind> {
    u16::from_str_radix(digits, 16)
        .map_err(|_| AsmErrorKind::Syntax(format!("bad hex digits `{digits}`")))
}

/// Pack a `DB` bit literal MSB-first; `.` reads as 0 so sprite rows stay
/// legible next to their 1s.
fn pack_bits(bits: &str) -> u8 {
    bits.chars()
        .fold(0u8, |acc, c| (acc << 1) | u8::from(c == '1'))
}

fn bad_operand(text: &str, expected: &str) -> AsmErrorKind {
    AsmErrorKind::OperandFormat(format!("`{text}` is not a {expected}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(result: Result<Vec<u8>, AsmError>) -> AsmErrorKind {
        result.expect_err("assembly should fail").kind
    }

    #[test]
    fn encodes_single_instructions() {
        assert_eq!(assemble("RTS").unwrap(), [0x00, 0xEE]);
        assert_eq!(assemble("LOAD VA, #6E").unwrap(), [0x6A, 0x6E]);
        assert_eq!(assemble("DRAW VA, V6, #E").unwrap(), [0xDA, 0x6E]);
        assert_eq!(assemble("SKE VA, 167").unwrap(), [0x3A, 0xA7]);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        assert_eq!(assemble("rts").unwrap(), [0x00, 0xEE]);
        assert_eq!(assemble("load v1, 1").unwrap(), [0x61, 0x01]);
    }

    #[test]
    fn byte_literal_boundaries() {
        assert_eq!(assemble("LOAD V0, 255").unwrap(), [0x60, 0xFF]);
        assert_eq!(
            kind_of(assemble("LOAD V0, 256")),
            AsmErrorKind::LiteralOverflow { value: 256, limit: 255 }
        );
    }

    #[test]
    fn nibble_literal_boundaries() {
        assert_eq!(assemble("DRAW V0, V1, 15").unwrap(), [0xD0, 0x1F]);
        assert_eq!(
            kind_of(assemble("DRAW V0, V1, 16")),
            AsmErrorKind::LiteralOverflow { value: 16, limit: 15 }
        );
    }

    #[test]
    fn oversized_hex_is_a_format_error_not_overflow() {
        assert!(matches!(
            kind_of(assemble("SKE VA, #6EF")),
            AsmErrorKind::OperandFormat(_)
        ));
    }

    #[test]
    fn rejects_malformed_registers() {
        assert!(matches!(
            kind_of(assemble("LOAD VG, 1")),
            AsmErrorKind::OperandFormat(_)
        ));
        assert!(matches!(
            kind_of(assemble("LOAD V10, 1")),
            AsmErrorKind::OperandFormat(_)
        ));
    }

    #[test]
    fn rejects_wrong_operand_count() {
        assert_eq!(
            kind_of(assemble("LOAD V1")),
            AsmErrorKind::OperandCount { expected: 2, found: 1 }
        );
        assert_eq!(
            kind_of(assemble("RTS V1")),
            AsmErrorKind::OperandCount { expected: 0, found: 1 }
        );
    }

    #[test]
    fn unknown_mnemonic_reports_line() {
        let err = assemble("LOAD V1, 1\nFROB V2\nRTS").expect_err("should fail");
        assert_eq!(err.line, 2);
        assert_eq!(err.kind, AsmErrorKind::UnknownInstruction("FROB".to_string()));
    }

    #[test]
    fn duplicate_label_is_fatal() {
        let err = assemble("A:\nRTS\nA:\nRTS").expect_err("should fail");
        assert_eq!(err.line, 3);
        assert_eq!(err.kind, AsmErrorKind::DuplicateLabel("A".to_string()));
    }

    #[test]
    fn unresolved_label_is_fatal() {
        assert_eq!(
            kind_of(assemble("JUMP NOWHERE")),
            AsmErrorKind::UnresolvedLabel("NOWHERE".to_string())
        );
    }

    #[test]
    fn address_operands_take_hex_form() {
        assert_eq!(assemble("JUMP $A23").unwrap(), [0x1A, 0x23]);
        assert!(matches!(
            kind_of(assemble("JUMP $A2")),
            AsmErrorKind::OperandFormat(_)
        ));
    }

    #[test]
    fn emits_data_words_high_byte_first() {
        assert_eq!(assemble("DW #0A1B").unwrap(), [0x0A, 0x1B]);
        assert_eq!(assemble("dw #ffff").unwrap(), [0xFF, 0xFF]);
    }

    #[test]
    fn packs_data_bytes_msb_first() {
        assert_eq!(assemble("DB $10100010").unwrap(), [0xA2]);
        assert_eq!(assemble("DB $1111....").unwrap(), [0xF0]);
        assert_eq!(assemble("DB $........").unwrap(), [0x00]);
    }

    #[test]
    fn db_advances_pointer_by_one_byte() {
        // The label lands on an odd address if and only if DB counts as a
        // single byte in pass one.
        let rom = assemble("JUMP END\nDB $11111111\nEND:\nRTS").unwrap();
        assert_eq!(rom, [0x12, 0x03, 0xFF, 0x00, 0xEE]);
    }

    #[test]
    fn directives_and_comments_are_skipped() {
        let rom = assemble("option something_cool\nLOAD V1, 1 ; set it\n; note\nRTS").unwrap();
        assert_eq!(rom, [0x61, 0x01, 0x00, 0xEE]);
    }
}
