//! Constant-pool rewriting for JVM class files.
//!
//! Every name a class file refers to (its own name, superclass, field and
//! method descriptors, generic signatures, string constants) lives in a
//! `CONSTANT_Utf8` entry of the constant pool. Rewriting those entries and
//! copying everything else verbatim relocates the class without touching
//! bytecode offsets.

use super::Relocator;
use crate::bundler::{Error, Result};

const MAGIC: u32 = 0xCAFE_BABE;

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_FLOAT: u8 = 4;
const CONSTANT_LONG: u8 = 5;
const CONSTANT_DOUBLE: u8 = 6;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_METHOD_HANDLE: u8 = 15;
const CONSTANT_METHOD_TYPE: u8 = 16;
const CONSTANT_DYNAMIC: u8 = 17;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
const CONSTANT_MODULE: u8 = 19;
const CONSTANT_PACKAGE: u8 = 20;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    entry: &'a str,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::InvalidClassFile {
                entry: self.entry.to_string(),
                reason: format!("truncated at offset {}", self.pos),
            }),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Relocates the constant pool of `bytes`.
///
/// Returns `Ok(None)` when no entry changed, so callers can keep the original
/// bytes untouched.
pub fn relocate_class(bytes: &[u8], relocator: &mut Relocator, entry: &str) -> Result<Option<Vec<u8>>> {
    let mut cursor = Cursor { bytes, pos: 0, entry };

    if cursor.u32()? != MAGIC {
        return Err(Error::InvalidClassFile {
            entry: entry.to_string(),
            reason: "bad magic number".to_string(),
        });
    }
    // minor_version, major_version
    cursor.take(4)?;
    let pool_count = cursor.u16()?;

    let mut out = Vec::with_capacity(bytes.len() + 64);
    out.extend_from_slice(&bytes[..cursor.pos]);
    let mut changed = false;

    let mut index = 1u16;
    while index < pool_count {
        let start = cursor.pos;
        let tag = cursor.u8()?;
        let width = match tag {
            CONSTANT_UTF8 => {
                let len = usize::from(cursor.u16()?);
                let data = cursor.take(len)?;
                match relocator.rewrite(data) {
                    Some(rewritten) => {
                        let new_len = u16::try_from(rewritten.len()).map_err(|_| {
                            Error::InvalidClassFile {
                                entry: entry.to_string(),
                                reason: "relocated constant exceeds 65535 bytes".to_string(),
                            }
                        })?;
                        out.push(CONSTANT_UTF8);
                        out.extend_from_slice(&new_len.to_be_bytes());
                        out.extend_from_slice(&rewritten);
                        changed = true;
                    }
                    None => out.extend_from_slice(&bytes[start..cursor.pos]),
                }
                index += 1;
                continue;
            }
            CONSTANT_CLASS | CONSTANT_STRING | CONSTANT_METHOD_TYPE | CONSTANT_MODULE
            | CONSTANT_PACKAGE => 2,
            CONSTANT_METHOD_HANDLE => 3,
            CONSTANT_INTEGER
            | CONSTANT_FLOAT
            | CONSTANT_FIELDREF
            | CONSTANT_METHODREF
            | CONSTANT_INTERFACE_METHODREF
            | CONSTANT_NAME_AND_TYPE
            | CONSTANT_DYNAMIC
            | CONSTANT_INVOKE_DYNAMIC => 4,
            CONSTANT_LONG | CONSTANT_DOUBLE => 8,
            other => {
                return Err(Error::InvalidClassFile {
                    entry: entry.to_string(),
                    reason: format!("unknown constant pool tag {other} at index {index}"),
                });
            }
        };
        cursor.take(width)?;
        out.extend_from_slice(&bytes[start..cursor.pos]);
        // Long and double occupy two pool slots
        index += if matches!(tag, CONSTANT_LONG | CONSTANT_DOUBLE) { 2 } else { 1 };
    }

    if !changed {
        return Ok(None);
    }
    out.extend_from_slice(&bytes[cursor.pos..]);
    Ok(Some(out))
}
