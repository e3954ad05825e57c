//! Restricted pickle codec for the DFL metadata dictionary
//!
//! The reader understands the opcodes Python emits for plain data under
//! protocols 0 to 5. Class references, `REDUCE` calls and `BUILD` states
//! become inert `MetaValue`s, so numpy arrays come through with their raw
//! buffers and nothing is ever imported or called. Opcodes that only
//! matter for arbitrary objects (`INST`, `OBJ`, `PERSID`, extension
//! registry, out-of-band buffers) are rejected.
//!
//! The writer emits protocol 4 without framing or memoization.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{BufRead, Cursor, Read, Write};

use crate::dfl::constants::{limits, opcodes};
use crate::dfl::types::MetaValue;
use crate::errors::{WatermarkError, WatermarkResult};

/// Decodes one pickle
pub fn loads(bytes: &[u8]) -> WatermarkResult<MetaValue> {
    Unpickler::new(bytes).run()
}

/// Encodes a value as a protocol 4 pickle
pub fn dumps(value: &MetaValue) -> WatermarkResult<Vec<u8>> {
    let mut out = Vec::new();
    out.write_u8(opcodes::PROTO)?;
    out.write_u8(limits::WRITE_PROTOCOL)?;
    write_value(&mut out, value, 0)?;
    out.write_u8(opcodes::STOP)?;
    Ok(out)
}

fn invalid(message: impl Into<String>) -> WatermarkError {
    WatermarkError::InvalidMetadata(message.into())
}

fn truncated(_: std::io::Error) -> WatermarkError {
    invalid("pickle is truncated")
}

/// A stack entry: the value, its nesting depth and the memo slot it
/// was stored in, if any
struct Slot {
    value: MetaValue,
    depth: usize,
    memo: Option<u32>,
}

impl Slot {
    fn scalar(value: MetaValue) -> Self {
        Slot { value, depth: 0, memo: None }
    }
}

struct MemoEntry {
    value: MetaValue,
    depth: usize,
    size: usize,
}

struct Unpickler<'a> {
    cursor: Cursor<&'a [u8]>,
    stack: Vec<Slot>,
    marks: Vec<usize>,
    memo: HashMap<u32, MemoEntry>,
    copied: usize,
}

impl<'a> Unpickler<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Unpickler {
            cursor: Cursor::new(bytes),
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
            copied: 0,
        }
    }

    fn run(mut self) -> WatermarkResult<MetaValue> {
        loop {
            let opcode = self.cursor.read_u8().map_err(|_| invalid("pickle ended without STOP"))?;
            match opcode {
                opcodes::PROTO => {
                    let version = self.cursor.read_u8().map_err(truncated)?;
                    if version > limits::MAX_PROTOCOL {
                        return Err(invalid(format!("unsupported pickle protocol {}", version)));
                    }
                }
                opcodes::FRAME => {
                    // Frames only group opcodes for buffered reads
                    self.cursor.read_u64::<LittleEndian>().map_err(truncated)?;
                }
                opcodes::STOP => return Ok(self.pop()?.value),

                opcodes::MARK => self.marks.push(self.stack.len()),
                opcodes::POP => {
                    if self.marks.last() == Some(&self.stack.len()) {
                        self.marks.pop();
                    } else {
                        self.pop()?;
                    }
                }
                opcodes::POP_MARK => {
                    self.pop_mark()?;
                }
                opcodes::DUP => {
                    let top = self.top()?;
                    let copy = Slot {
                        value: top.value.clone(),
                        depth: top.depth,
                        memo: None,
                    };
                    self.stack.push(copy);
                }

                opcodes::NONE => self.push(MetaValue::Null),
                opcodes::NEWTRUE => self.push(MetaValue::Bool(true)),
                opcodes::NEWFALSE => self.push(MetaValue::Bool(false)),
                opcodes::INT => {
                    let line = self.read_line()?;
                    let value = match line.as_str() {
                        "00" => MetaValue::Bool(false),
                        "01" => MetaValue::Bool(true),
                        text => MetaValue::Int(parse_int(text)?),
                    };
                    self.push(value);
                }
                opcodes::LONG => {
                    let line = self.read_line()?;
                    let value = parse_int(line.trim_end_matches('L'))?;
                    self.push(MetaValue::Int(value));
                }
                opcodes::BININT => {
                    let value = self.cursor.read_i32::<LittleEndian>().map_err(truncated)?;
                    self.push(MetaValue::Int(value as i64));
                }
                opcodes::BININT1 => {
                    let value = self.cursor.read_u8().map_err(truncated)?;
                    self.push(MetaValue::Int(value as i64));
                }
                opcodes::BININT2 => {
                    let value = self.cursor.read_u16::<LittleEndian>().map_err(truncated)?;
                    self.push(MetaValue::Int(value as i64));
                }
                opcodes::LONG1 => {
                    let len = self.cursor.read_u8().map_err(truncated)? as usize;
                    let value = decode_long(&self.read_bytes(len)?)?;
                    self.push(MetaValue::Int(value));
                }
                opcodes::LONG4 => {
                    let len = self.read_len32()?;
                    let value = decode_long(&self.read_bytes(len)?)?;
                    self.push(MetaValue::Int(value));
                }
                opcodes::FLOAT => {
                    let line = self.read_line()?;
                    let value = line
                        .parse::<f64>()
                        .map_err(|_| invalid(format!("bad float literal {:?}", line)))?;
                    self.push(MetaValue::Float(value));
                }
                opcodes::BINFLOAT => {
                    let value = self.cursor.read_f64::<BigEndian>().map_err(truncated)?;
                    self.push(MetaValue::Float(value));
                }

                opcodes::BINSTRING => {
                    let len = self.read_len32()?;
                    let bytes = self.read_bytes(len)?;
                    self.push(MetaValue::Str(latin1_decode(&bytes)));
                }
                opcodes::SHORT_BINSTRING => {
                    let len = self.cursor.read_u8().map_err(truncated)? as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(MetaValue::Str(latin1_decode(&bytes)));
                }
                opcodes::UNICODE => {
                    let line = self.read_raw_line()?;
                    self.push(MetaValue::Str(raw_unicode_unescape(&line)?));
                }
                opcodes::BINUNICODE => {
                    let len = self.cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
                    let text = self.read_utf8(len)?;
                    self.push(MetaValue::Str(text));
                }
                opcodes::SHORT_BINUNICODE => {
                    let len = self.cursor.read_u8().map_err(truncated)? as usize;
                    let text = self.read_utf8(len)?;
                    self.push(MetaValue::Str(text));
                }
                opcodes::BINUNICODE8 => {
                    let len = self.read_len64()?;
                    let text = self.read_utf8(len)?;
                    self.push(MetaValue::Str(text));
                }
                opcodes::BINBYTES => {
                    let len = self.cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(MetaValue::Bytes(bytes));
                }
                opcodes::SHORT_BINBYTES => {
                    let len = self.cursor.read_u8().map_err(truncated)? as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(MetaValue::Bytes(bytes));
                }
                opcodes::BINBYTES8 | opcodes::BYTEARRAY8 => {
                    let len = self.read_len64()?;
                    let bytes = self.read_bytes(len)?;
                    self.push(MetaValue::Bytes(bytes));
                }

                opcodes::EMPTY_LIST => self.push_nested(MetaValue::List(Vec::new()), 1)?,
                opcodes::EMPTY_TUPLE => self.push_nested(MetaValue::Tuple(Vec::new()), 1)?,
                opcodes::EMPTY_DICT => self.push_nested(MetaValue::Dict(Vec::new()), 1)?,
                opcodes::EMPTY_SET => self.push_nested(MetaValue::Set(Vec::new()), 1)?,
                opcodes::LIST => {
                    let items = self.pop_mark()?;
                    self.push_container(items, MetaValue::List)?;
                }
                opcodes::TUPLE => {
                    let items = self.pop_mark()?;
                    self.push_container(items, MetaValue::Tuple)?;
                }
                opcodes::TUPLE1 | opcodes::TUPLE2 | opcodes::TUPLE3 => {
                    let count = (opcode - opcodes::TUPLE1 + 1) as usize;
                    let items = self.pop_n(count)?;
                    self.push_container(items, MetaValue::Tuple)?;
                }
                opcodes::FROZENSET => {
                    let items = self.pop_mark()?;
                    self.push_container(items, MetaValue::FrozenSet)?;
                }
                opcodes::DICT => {
                    let items = self.pop_mark()?;
                    self.push_nested(MetaValue::Dict(Vec::new()), 1)?;
                    self.set_items(items)?;
                }
                opcodes::APPEND => {
                    let item = self.pop()?;
                    self.extend_top(vec![item])?;
                }
                opcodes::APPENDS | opcodes::ADDITEMS => {
                    let items = self.pop_mark()?;
                    self.extend_top(items)?;
                }
                opcodes::SETITEM => {
                    let items = self.pop_n(2)?;
                    self.set_items(items)?;
                }
                opcodes::SETITEMS => {
                    let items = self.pop_mark()?;
                    self.set_items(items)?;
                }

                opcodes::GET => {
                    let id = parse_memo_id(&self.read_line()?)?;
                    self.get(id)?;
                }
                opcodes::BINGET => {
                    let id = self.cursor.read_u8().map_err(truncated)? as u32;
                    self.get(id)?;
                }
                opcodes::LONG_BINGET => {
                    let id = self.cursor.read_u32::<LittleEndian>().map_err(truncated)?;
                    self.get(id)?;
                }
                opcodes::PUT => {
                    let id = parse_memo_id(&self.read_line()?)?;
                    self.put(id)?;
                }
                opcodes::BINPUT => {
                    let id = self.cursor.read_u8().map_err(truncated)? as u32;
                    self.put(id)?;
                }
                opcodes::LONG_BINPUT => {
                    let id = self.cursor.read_u32::<LittleEndian>().map_err(truncated)?;
                    self.put(id)?;
                }
                opcodes::MEMOIZE => {
                    let id = self.memo.len() as u32;
                    self.put(id)?;
                }

                opcodes::GLOBAL => {
                    let module = self.read_line()?;
                    let name = self.read_line()?;
                    self.push(MetaValue::Global { module, name });
                }
                opcodes::STACK_GLOBAL => {
                    let name = self.pop()?.value;
                    let module = self.pop()?.value;
                    match (module, name) {
                        (MetaValue::Str(module), MetaValue::Str(name)) => {
                            self.push(MetaValue::Global { module, name })
                        }
                        _ => return Err(invalid("STACK_GLOBAL needs two strings")),
                    }
                }
                opcodes::REDUCE => {
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    self.reduce(callable, args)?;
                }
                opcodes::NEWOBJ => {
                    let args = self.pop()?;
                    let class = self.pop()?;
                    let depth = class.depth.max(args.depth) + 1;
                    let value = MetaValue::NewObj {
                        class: Box::new(class.value),
                        args: Box::new(args.value),
                    };
                    self.push_nested(value, depth)?;
                }
                opcodes::BUILD => {
                    let state = self.pop()?;
                    self.build(state)?;
                }

                other => {
                    return Err(invalid(format!(
                        "unsupported pickle opcode {:#04x} at offset {}",
                        other,
                        self.cursor.position() - 1
                    )))
                }
            }
        }
    }

    fn push(&mut self, value: MetaValue) {
        self.stack.push(Slot::scalar(value));
    }

    fn push_nested(&mut self, value: MetaValue, depth: usize) -> WatermarkResult<()> {
        if depth > limits::MAX_DEPTH {
            return Err(invalid("pickle nesting is too deep"));
        }
        self.stack.push(Slot { value, depth, memo: None });
        Ok(())
    }

    fn push_container(
        &mut self,
        items: Vec<Slot>,
        build: fn(Vec<MetaValue>) -> MetaValue,
    ) -> WatermarkResult<()> {
        let depth = container_depth(&items);
        let value = build(items.into_iter().map(|slot| slot.value).collect());
        self.push_nested(value, depth)
    }

    fn top(&self) -> WatermarkResult<&Slot> {
        match (self.stack.last(), self.marks.last()) {
            (Some(_), Some(&mark)) if mark == self.stack.len() => Err(invalid("pickle stack underflow")),
            (Some(slot), _) => Ok(slot),
            (None, _) => Err(invalid("pickle stack underflow")),
        }
    }

    fn pop(&mut self) -> WatermarkResult<Slot> {
        self.top()?;
        self.stack.pop().ok_or_else(|| invalid("pickle stack underflow"))
    }

    fn pop_n(&mut self, count: usize) -> WatermarkResult<Vec<Slot>> {
        let floor = self.marks.last().copied().unwrap_or(0);
        if self.stack.len() < floor + count {
            return Err(invalid("pickle stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    fn pop_mark(&mut self) -> WatermarkResult<Vec<Slot>> {
        let start = self.marks.pop().ok_or_else(|| invalid("pickle has no MARK to pop"))?;
        Ok(self.stack.split_off(start))
    }

    /// Runs `update` on the top slot and refreshes its memo copy
    fn mutate_top(
        &mut self,
        added_depth: usize,
        update: impl FnOnce(&mut MetaValue) -> WatermarkResult<()>,
    ) -> WatermarkResult<()> {
        self.top()?;
        let slot = self.stack.last_mut().ok_or_else(|| invalid("pickle stack underflow"))?;
        update(&mut slot.value)?;
        slot.depth = slot.depth.max(added_depth);
        if slot.depth > limits::MAX_DEPTH {
            return Err(invalid("pickle nesting is too deep"));
        }
        if let Some(id) = slot.memo {
            let entry = MemoEntry {
                value: slot.value.clone(),
                depth: slot.depth,
                size: approximate_size(&slot.value),
            };
            self.memo.insert(id, entry);
        }
        Ok(())
    }

    fn extend_top(&mut self, items: Vec<Slot>) -> WatermarkResult<()> {
        let depth = container_depth(&items);
        self.mutate_top(depth, |target| match target {
            MetaValue::List(list) | MetaValue::Set(list) => {
                list.extend(items.into_iter().map(|slot| slot.value));
                Ok(())
            }
            _ => Err(invalid("APPEND target is not a list or set")),
        })
    }

    fn set_items(&mut self, items: Vec<Slot>) -> WatermarkResult<()> {
        if items.len() % 2 != 0 {
            return Err(invalid("SETITEMS needs key/value pairs"));
        }
        let depth = container_depth(&items);
        self.mutate_top(depth, |target| {
            let MetaValue::Dict(entries) = target else {
                return Err(invalid("SETITEM target is not a dict"));
            };
            let mut values = items.into_iter().map(|slot| slot.value);
            while let (Some(key), Some(value)) = (values.next(), values.next()) {
                match entries.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((key, value)),
                }
            }
            Ok(())
        })
    }

    fn reduce(&mut self, callable: Slot, args: Slot) -> WatermarkResult<()> {
        // Protocol 2 has no bytes opcode: bytes are pickled as
        // `_codecs.encode(text, 'latin1')`
        if callable.value.is_global("_codecs", "encode") {
            if let Some([MetaValue::Str(text), MetaValue::Str(encoding)]) = args.value.as_sequence() {
                if encoding == "latin1" || encoding == "latin-1" {
                    let bytes = latin1_encode(text)?;
                    self.push(MetaValue::Bytes(bytes));
                    return Ok(());
                }
            }
        }

        let depth = callable.depth.max(args.depth) + 1;
        let value = MetaValue::Reduce {
            callable: Box::new(callable.value),
            args: Box::new(args.value),
        };
        self.push_nested(value, depth)
    }

    fn build(&mut self, state: Slot) -> WatermarkResult<()> {
        let depth = state.depth + 1;
        self.mutate_top(depth, |object| {
            let built = std::mem::replace(object, MetaValue::Null);
            *object = MetaValue::Build {
                object: Box::new(built),
                state: Box::new(state.value),
            };
            Ok(())
        })
    }

    fn put(&mut self, id: u32) -> WatermarkResult<()> {
        self.top()?;
        let slot = self.stack.last_mut().ok_or_else(|| invalid("pickle stack underflow"))?;
        slot.memo = Some(id);
        let entry = MemoEntry {
            value: slot.value.clone(),
            depth: slot.depth,
            size: approximate_size(&slot.value),
        };
        self.memo.insert(id, entry);
        Ok(())
    }

    fn get(&mut self, id: u32) -> WatermarkResult<()> {
        let entry = self
            .memo
            .get(&id)
            .ok_or_else(|| invalid(format!("pickle memo slot {} is empty", id)))?;

        self.copied = self.copied.saturating_add(entry.size);
        if self.copied > limits::MAX_MEMO_COPY_BYTES {
            return Err(invalid("pickle memo references expand too far"));
        }

        let slot = Slot {
            value: entry.value.clone(),
            depth: entry.depth,
            memo: Some(id),
        };
        self.stack.push(slot);
        Ok(())
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn read_bytes(&mut self, len: usize) -> WatermarkResult<Vec<u8>> {
        if len > self.remaining() {
            return Err(invalid(format!(
                "pickle declares {} bytes but only {} remain",
                len,
                self.remaining()
            )));
        }
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes).map_err(truncated)?;
        Ok(bytes)
    }

    fn read_utf8(&mut self, len: usize) -> WatermarkResult<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| invalid("pickle string is not UTF-8"))
    }

    fn read_len32(&mut self) -> WatermarkResult<usize> {
        let len = self.cursor.read_i32::<LittleEndian>().map_err(truncated)?;
        usize::try_from(len).map_err(|_| invalid("negative length in pickle"))
    }

    fn read_len64(&mut self) -> WatermarkResult<usize> {
        let len = self.cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        usize::try_from(len).map_err(|_| invalid("pickle length overflows"))
    }

    fn read_raw_line(&mut self) -> WatermarkResult<Vec<u8>> {
        let mut line = Vec::new();
        self.cursor.read_until(b'\n', &mut line).map_err(truncated)?;
        if line.pop() != Some(b'\n') {
            return Err(invalid("pickle is truncated"));
        }
        Ok(line)
    }

    /// Reads a newline-terminated ASCII argument
    fn read_line(&mut self) -> WatermarkResult<String> {
        let mut line = self.read_raw_line()?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8(line).map_err(|_| invalid("pickle argument is not text"))
    }
}

fn container_depth(items: &[Slot]) -> usize {
    items.iter().map(|slot| slot.depth).max().unwrap_or(0) + 1
}

/// Rough heap footprint, used to bound memo copies
fn approximate_size(value: &MetaValue) -> usize {
    const BASE: usize = 16;
    match value {
        MetaValue::Str(text) => BASE + text.len(),
        MetaValue::Bytes(bytes) => BASE + bytes.len(),
        MetaValue::List(items)
        | MetaValue::Tuple(items)
        | MetaValue::Set(items)
        | MetaValue::FrozenSet(items) => BASE + items.iter().map(approximate_size).sum::<usize>(),
        MetaValue::Dict(entries) => {
            BASE + entries
                .iter()
                .map(|(k, v)| approximate_size(k) + approximate_size(v))
                .sum::<usize>()
        }
        MetaValue::Global { module, name } => BASE + module.len() + name.len(),
        MetaValue::Reduce { callable: a, args: b }
        | MetaValue::NewObj { class: a, args: b }
        | MetaValue::Build { object: a, state: b } => BASE + approximate_size(a) + approximate_size(b),
        _ => BASE,
    }
}

fn parse_int(text: &str) -> WatermarkResult<i64> {
    text.parse::<i64>()
        .map_err(|_| invalid(format!("integer literal {:?} out of range", text)))
}

fn parse_memo_id(text: &str) -> WatermarkResult<u32> {
    text.parse::<u32>()
        .map_err(|_| invalid(format!("bad memo id {:?}", text)))
}

/// Little-endian two's complement, as written by LONG1 and LONG4
fn decode_long(bytes: &[u8]) -> WatermarkResult<i64> {
    let Some(&last) = bytes.last() else {
        return Ok(0);
    };
    let fill = if last & 0x80 != 0 { 0xFF } else { 0x00 };
    if bytes.len() > 8 {
        // Redundant sign bytes still fit
        if bytes[8..].iter().any(|&b| b != fill) || (bytes[7] & 0x80 != 0) != (fill == 0xFF) {
            return Err(invalid("pickled integer does not fit in 64 bits"));
        }
    }
    let mut buf = [fill; 8];
    let used = bytes.len().min(8);
    buf[..used].copy_from_slice(&bytes[..used]);
    Ok(i64::from_le_bytes(buf))
}

fn encode_long(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_le_bytes();
    let mut len = bytes.len();
    while len > 1 {
        let last = bytes[len - 1];
        let sign = bytes[len - 2] & 0x80;
        if (last == 0x00 && sign == 0) || (last == 0xFF && sign != 0) {
            len -= 1;
        } else {
            break;
        }
    }
    bytes[..len].to_vec()
}

/// Decodes Python's `raw-unicode-escape`: latin-1 bytes plus `\\uXXXX`
/// and `\\UXXXXXXXX` escapes
fn raw_unicode_unescape(bytes: &[u8]) -> WatermarkResult<String> {
    let mut text = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let digits = match (bytes[i], bytes.get(i + 1)) {
            (b'\\', Some(b'u')) => 4,
            (b'\\', Some(b'U')) => 8,
            (byte, _) => {
                text.push(byte as char);
                i += 1;
                continue;
            }
        };
        let hex = bytes
            .get(i + 2..i + 2 + digits)
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .ok_or_else(|| invalid("truncated unicode escape in pickle"))?;
        let c = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| invalid(format!("bad unicode escape \\u{}", hex)))?;
        text.push(c);
        i += 2 + digits;
    }
    Ok(text)
}

fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn latin1_encode(text: &str) -> WatermarkResult<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(c as u32).map_err(|_| invalid("bytes literal is not latin-1")))
        .collect()
}

fn write_value(out: &mut Vec<u8>, value: &MetaValue, depth: usize) -> WatermarkResult<()> {
    if depth > limits::MAX_DEPTH {
        return Err(invalid("metadata nesting is too deep to write"));
    }

    match value {
        MetaValue::Null => out.write_u8(opcodes::NONE)?,
        MetaValue::Bool(true) => out.write_u8(opcodes::NEWTRUE)?,
        MetaValue::Bool(false) => out.write_u8(opcodes::NEWFALSE)?,
        MetaValue::Int(v) => write_int(out, *v)?,
        MetaValue::Float(v) => {
            out.write_u8(opcodes::BINFLOAT)?;
            out.write_f64::<BigEndian>(*v)?;
        }
        MetaValue::Str(text) => {
            if text.len() < 256 {
                out.write_u8(opcodes::SHORT_BINUNICODE)?;
                out.write_u8(text.len() as u8)?;
            } else {
                out.write_u8(opcodes::BINUNICODE)?;
                out.write_u32::<LittleEndian>(checked_len(text.len())?)?;
            }
            out.write_all(text.as_bytes())?;
        }
        MetaValue::Bytes(bytes) => {
            if bytes.len() < 256 {
                out.write_u8(opcodes::SHORT_BINBYTES)?;
                out.write_u8(bytes.len() as u8)?;
            } else {
                out.write_u8(opcodes::BINBYTES)?;
                out.write_u32::<LittleEndian>(checked_len(bytes.len())?)?;
            }
            out.write_all(bytes)?;
        }
        MetaValue::List(items) => {
            out.write_u8(opcodes::EMPTY_LIST)?;
            write_batched(out, items, opcodes::APPENDS, depth)?;
        }
        MetaValue::Set(items) => {
            out.write_u8(opcodes::EMPTY_SET)?;
            write_batched(out, items, opcodes::ADDITEMS, depth)?;
        }
        MetaValue::FrozenSet(items) => {
            out.write_u8(opcodes::MARK)?;
            for item in items {
                write_value(out, item, depth + 1)?;
            }
            out.write_u8(opcodes::FROZENSET)?;
        }
        MetaValue::Tuple(items) => match items.len() {
            0 => out.write_u8(opcodes::EMPTY_TUPLE)?,
            1..=3 => {
                for item in items {
                    write_value(out, item, depth + 1)?;
                }
                out.write_u8(opcodes::TUPLE1 + items.len() as u8 - 1)?;
            }
            _ => {
                out.write_u8(opcodes::MARK)?;
                for item in items {
                    write_value(out, item, depth + 1)?;
                }
                out.write_u8(opcodes::TUPLE)?;
            }
        },
        MetaValue::Dict(entries) => {
            out.write_u8(opcodes::EMPTY_DICT)?;
            for batch in entries.chunks(limits::BATCH_SIZE) {
                out.write_u8(opcodes::MARK)?;
                for (key, value) in batch {
                    write_value(out, key, depth + 1)?;
                    write_value(out, value, depth + 1)?;
                }
                out.write_u8(opcodes::SETITEMS)?;
            }
        }
        MetaValue::Global { module, name } => {
            if module.contains('\n') || name.contains('\n') {
                return Err(invalid("global names cannot contain newlines"));
            }
            out.write_u8(opcodes::GLOBAL)?;
            write!(out, "{}\n{}\n", module, name)?;
        }
        MetaValue::Reduce { callable, args } => {
            write_value(out, callable, depth + 1)?;
            write_value(out, args, depth + 1)?;
            out.write_u8(opcodes::REDUCE)?;
        }
        MetaValue::NewObj { class, args } => {
            write_value(out, class, depth + 1)?;
            write_value(out, args, depth + 1)?;
            out.write_u8(opcodes::NEWOBJ)?;
        }
        MetaValue::Build { object, state } => {
            write_value(out, object, depth + 1)?;
            write_value(out, state, depth + 1)?;
            out.write_u8(opcodes::BUILD)?;
        }
    }
    Ok(())
}

fn write_batched(out: &mut Vec<u8>, items: &[MetaValue], opcode: u8, depth: usize) -> WatermarkResult<()> {
    for batch in items.chunks(limits::BATCH_SIZE) {
        out.write_u8(opcodes::MARK)?;
        for item in batch {
            write_value(out, item, depth + 1)?;
        }
        out.write_u8(opcode)?;
    }
    Ok(())
}

fn write_int(out: &mut Vec<u8>, value: i64) -> WatermarkResult<()> {
    if (0..=0xFF).contains(&value) {
        out.write_u8(opcodes::BININT1)?;
        out.write_u8(value as u8)?;
    } else if (0..=0xFFFF).contains(&value) {
        out.write_u8(opcodes::BININT2)?;
        out.write_u16::<LittleEndian>(value as u16)?;
    } else if let Ok(small) = i32::try_from(value) {
        out.write_u8(opcodes::BININT)?;
        out.write_i32::<LittleEndian>(small)?;
    } else {
        let bytes = encode_long(value);
        out.write_u8(opcodes::LONG1)?;
        out.write_u8(bytes.len() as u8)?;
        out.write_all(&bytes)?;
    }
    Ok(())
}

fn checked_len(len: usize) -> WatermarkResult<u32> {
    u32::try_from(len).map_err(|_| invalid("value too large to pickle"))
}
