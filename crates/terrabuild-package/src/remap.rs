//! Renaming classes inside compiled class files.
//!
//! Only class names are remapped. The UTF-8 constants reached from class
//! references, field and method descriptors, generic signatures, record
//! components and annotation types are rewritten. String literals keep
//! their text even when they spell a mapped class name.

use std::collections::{BTreeMap, HashMap, HashSet};

use terrabuild_util::errors::TerraError;

use crate::mappings::ClassMappings;
use crate::shade::Entry;

const MAGIC: u32 = 0xCAFE_BABE;

/// Maps internal class names (`a/b/C`).
pub trait Remapper {
    fn map_class(&self, internal: &str) -> Option<&str>;

    /// Map a name, falling back to mapping the outer class of a nested
    /// class that has no entry of its own.
    fn map_name(&self, internal: &str) -> Option<String> {
        if let Some(mapped) = self.map_class(internal) {
            return Some(mapped.to_string());
        }
        let (outer, inner) = internal.rsplit_once('$')?;
        let outer = self.map_name(outer)?;
        Some(format!("{outer}${inner}"))
    }
}

/// Leaves every name unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRemapper;

impl Remapper for IdentityRemapper {
    fn map_class(&self, _internal: &str) -> Option<&str> {
        None
    }
}

impl Remapper for ClassMappings {
    fn map_class(&self, internal: &str) -> Option<&str> {
        self.get(internal)
    }
}

impl<R: Remapper + ?Sized> Remapper for &R {
    fn map_class(&self, internal: &str) -> Option<&str> {
        (**self).map_class(internal)
    }
}

/// Remap every class entry, renaming `.class` paths of mapped classes.
/// Other entries pass through untouched.
pub fn remap_entries<R: Remapper>(entries: Vec<Entry>, remapper: &R) -> miette::Result<Vec<Entry>> {
    let mut remapped = 0usize;
    let out = entries
        .into_iter()
        .map(|entry| {
            if !entry.is_class() {
                return Ok(entry);
            }
            let data = remap_class(&entry.data, remapper).map_err(|e| TerraError::Packaging {
                message: format!("malformed class file {}: {e}", entry.name),
            })?;
            let internal = entry.name.trim_end_matches(".class");
            let name = match remapper.map_name(internal) {
                Some(mapped) => {
                    remapped += 1;
                    format!("{mapped}.class")
                }
                None => entry.name.clone(),
            };
            Ok(Entry { name, data })
        })
        .collect::<miette::Result<Vec<_>>>()?;
    tracing::debug!("renamed {remapped} classes");
    Ok(out)
}

/// What a constant pool UTF-8 entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    ClassName,
    Descriptor,
    Signature,
}

/// A `u2` somewhere in the class file that points at a UTF-8 constant
/// holding a type.
#[derive(Debug)]
struct Reference {
    target: u16,
    role: Role,
    /// Byte offset of the `u2` in the class file.
    offset: usize,
}

#[derive(Debug, Default)]
struct References(Vec<Reference>);

impl References {
    fn read(&mut self, reader: &mut Reader<'_>, role: Role) -> Result<(), String> {
        let offset = reader.offset();
        let target = reader.u2()?;
        self.0.push(Reference {
            target,
            role,
            offset,
        });
        Ok(())
    }
}

/// Rewrite one class file.
///
/// A UTF-8 constant whose every type reference maps to the same new name
/// is rewritten in place. One that is also a string literal, or whose
/// references disagree, stays as it is: the renamed text is appended to
/// the constant pool and those references are pointed at the copy.
pub fn remap_class<R: Remapper>(data: &[u8], remapper: &R) -> Result<Vec<u8>, String> {
    let mut reader = Reader::new(data);
    if reader.u4()? != MAGIC {
        return Err("bad magic number".to_string());
    }
    reader.skip(4)?;
    let count_offset = reader.offset();
    let count = reader.u2()?;

    let mut utf8: HashMap<u16, (usize, usize)> = HashMap::new();
    let mut literals: HashSet<u16> = HashSet::new();
    let mut refs = References::default();
    let mut index = 1u16;
    while index < count {
        let tag = reader.u1()?;
        match tag {
            1 => {
                let len = reader.u2()? as usize;
                let start = reader.offset();
                reader.skip(len)?;
                utf8.insert(index, (start, len));
            }
            3 | 4 => reader.skip(4)?,
            5 | 6 => {
                reader.skip(8)?;
                index += 1;
            }
            7 => refs.read(&mut reader, Role::ClassName)?,
            8 => {
                literals.insert(reader.u2()?);
            }
            16 => refs.read(&mut reader, Role::Descriptor)?,
            19 | 20 => reader.skip(2)?,
            12 => {
                reader.skip(2)?;
                refs.read(&mut reader, Role::Descriptor)?;
            }
            9 | 10 | 11 | 17 | 18 => reader.skip(4)?,
            15 => reader.skip(3)?,
            other => return Err(format!("unknown constant pool tag {other} at #{index}")),
        }
        index += 1;
    }
    let pool_end = reader.offset();

    let names = Utf8Table {
        data,
        entries: utf8,
    };
    collect_member_refs(&mut reader, &names, &mut refs)?;

    let mut renamed: BTreeMap<u16, Vec<(usize, String)>> = BTreeMap::new();
    let mut kept = literals;
    for r in &refs.0 {
        match map_by_role(names.get(r.target), r.role, remapper)? {
            Some(text) => renamed.entry(r.target).or_default().push((r.offset, text)),
            None => {
                kept.insert(r.target);
            }
        }
    }

    // (start, end, replacement) over the original bytes
    let mut edits: Vec<(usize, usize, Vec<u8>)> = Vec::new();
    let mut appended = Vec::new();
    let mut next = count;
    for (target, uses) in renamed {
        let shared = kept.contains(&target) || uses.iter().any(|(_, text)| *text != uses[0].1);
        if !shared {
            if let Some(&(start, len)) = names.entries.get(&target) {
                edits.push((start - 3, start + len, utf8_constant(&uses[0].1)?));
            }
            continue;
        }
        let mut copies: HashMap<String, u16> = HashMap::new();
        for (offset, text) in uses {
            let copy = match copies.get(&text) {
                Some(&copy) => copy,
                None => {
                    let copy = next;
                    next = next.checked_add(1).ok_or("constant pool is full")?;
                    appended.extend(utf8_constant(&text)?);
                    copies.insert(text, copy);
                    copy
                }
            };
            edits.push((offset, offset + 2, copy.to_be_bytes().to_vec()));
        }
    }
    if next != count {
        edits.push((count_offset, count_offset + 2, next.to_be_bytes().to_vec()));
        edits.push((pool_end, pool_end, appended));
    }
    edits.sort_by_key(|&(start, end, _)| (start, end));

    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;
    for (start, end, bytes) in edits {
        out.extend_from_slice(&data[pos..start]);
        out.extend_from_slice(&bytes);
        pos = end;
    }
    out.extend_from_slice(&data[pos..]);
    Ok(out)
}

fn utf8_constant(text: &str) -> Result<Vec<u8>, String> {
    let len = u16::try_from(text.len()).map_err(|_| format!("remapped name is too long: {text}"))?;
    let mut bytes = Vec::with_capacity(3 + text.len());
    bytes.push(1);
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(text.as_bytes());
    Ok(bytes)
}

/// `Some(new)` when `text` changes under the remapper.
fn map_by_role<R: Remapper>(text: &str, role: Role, remapper: &R) -> Result<Option<String>, String> {
    let mapped = match role {
        Role::ClassName if text.starts_with('[') => map_signature(text, remapper)?,
        Role::ClassName => match remapper.map_name(text) {
            Some(name) => name,
            None => return Ok(None),
        },
        Role::Descriptor | Role::Signature => map_signature(text, remapper)?,
    };
    Ok((mapped != text).then_some(mapped))
}

/// UTF-8 constants by pool index.
struct Utf8Table<'a> {
    data: &'a [u8],
    entries: HashMap<u16, (usize, usize)>,
}

impl<'a> Utf8Table<'a> {
    fn get(&self, index: u16) -> &'a str {
        self.entries
            .get(&index)
            .and_then(|&(start, len)| std::str::from_utf8(&self.data[start..start + len]).ok())
            .unwrap_or_default()
    }
}

/// Walk fields, methods and attributes after the constant pool, noting
/// where descriptors and signatures are referenced.
fn collect_member_refs(
    reader: &mut Reader<'_>,
    names: &Utf8Table<'_>,
    refs: &mut References,
) -> Result<(), String> {
    reader.skip(6)?;
    let interfaces = reader.u2()? as usize;
    reader.skip(interfaces * 2)?;
    // fields, then methods
    for _ in 0..2 {
        let members = reader.u2()?;
        for _ in 0..members {
            reader.skip(4)?;
            refs.read(reader, Role::Descriptor)?;
            attributes(reader, names, refs)?;
        }
    }
    attributes(reader, names, refs)
}

fn attributes(
    reader: &mut Reader<'_>,
    names: &Utf8Table<'_>,
    refs: &mut References,
) -> Result<(), String> {
    let count = reader.u2()?;
    for _ in 0..count {
        let name = names.get(reader.u2()?);
        let len = reader.u4()? as usize;
        let mut inner = reader.sub(len)?;
        match name {
            "Signature" => refs.read(&mut inner, Role::Signature)?,
            "Code" => {
                inner.skip(4)?;
                let code_len = inner.u4()? as usize;
                inner.skip(code_len)?;
                let handlers = inner.u2()? as usize;
                inner.skip(handlers * 8)?;
                attributes(&mut inner, names, refs)?;
            }
            "LocalVariableTable" | "LocalVariableTypeTable" => {
                let role = if name == "LocalVariableTable" {
                    Role::Descriptor
                } else {
                    Role::Signature
                };
                for _ in 0..inner.u2()? {
                    inner.skip(6)?;
                    refs.read(&mut inner, role)?;
                    inner.skip(2)?;
                }
            }
            "Record" => {
                for _ in 0..inner.u2()? {
                    inner.skip(2)?;
                    refs.read(&mut inner, Role::Descriptor)?;
                    attributes(&mut inner, names, refs)?;
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                for _ in 0..inner.u2()? {
                    annotation(&mut inner, refs)?;
                }
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                for _ in 0..inner.u1()? {
                    for _ in 0..inner.u2()? {
                        annotation(&mut inner, refs)?;
                    }
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                for _ in 0..inner.u2()? {
                    type_annotation(&mut inner, refs)?;
                }
            }
            "AnnotationDefault" => element_value(&mut inner, refs)?,
            _ => {}
        }
    }
    Ok(())
}

fn annotation(reader: &mut Reader<'_>, refs: &mut References) -> Result<(), String> {
    refs.read(reader, Role::Descriptor)?;
    for _ in 0..reader.u2()? {
        reader.skip(2)?;
        element_value(reader, refs)?;
    }
    Ok(())
}

/// A type annotation: target info and type path, then a plain annotation.
fn type_annotation(reader: &mut Reader<'_>, refs: &mut References) -> Result<(), String> {
    let target_len = match reader.u1()? {
        0x13..=0x15 => 0,
        0x00 | 0x01 | 0x16 => 1,
        0x10..=0x12 | 0x17 | 0x42..=0x46 => 2,
        0x47..=0x4B => 3,
        0x40 | 0x41 => reader.u2()? as usize * 6,
        other => return Err(format!("unknown type annotation target 0x{other:02x}")),
    };
    reader.skip(target_len)?;
    let path_len = reader.u1()? as usize;
    reader.skip(path_len * 2)?;
    annotation(reader, refs)
}

fn element_value(reader: &mut Reader<'_>, refs: &mut References) -> Result<(), String> {
    match reader.u1()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => reader.skip(2),
        b'e' => {
            refs.read(reader, Role::Descriptor)?;
            reader.skip(2)
        }
        b'c' => refs.read(reader, Role::Descriptor),
        b'@' => annotation(reader, refs),
        b'[' => {
            for _ in 0..reader.u2()? {
                element_value(reader, refs)?;
            }
            Ok(())
        }
        other => Err(format!("unknown annotation element tag `{}`", other as char)),
    }
}

/// Remap class names in a descriptor or generic signature.
pub fn map_signature<R: Remapper>(signature: &str, remapper: &R) -> Result<String, String> {
    let mut parser = SignatureMapper {
        src: signature.as_bytes(),
        pos: 0,
        out: String::with_capacity(signature.len()),
        remapper,
    };
    if parser.peek() == Some(b'<') {
        parser.formal_type_parameters()?;
    }
    while parser.peek().is_some() {
        parser.token()?;
    }
    Ok(parser.out)
}

struct SignatureMapper<'a, R> {
    src: &'a [u8],
    pos: usize,
    out: String,
    remapper: &'a R,
}

impl<R: Remapper> SignatureMapper<'_, R> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn next(&mut self) -> Result<u8, String> {
        let c = self.peek().ok_or("unexpected end of signature")?;
        self.pos += 1;
        Ok(c)
    }

    /// Copy bytes up to (not including) the first of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Result<&str, String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                let ident = &self.src[start..self.pos];
                return std::str::from_utf8(ident).map_err(|e| e.to_string());
            }
            self.pos += 1;
        }
        Err("unterminated identifier in signature".to_string())
    }

    fn formal_type_parameters(&mut self) -> Result<(), String> {
        let c = self.next()?;
        self.out.push(c as char);
        while self.peek() != Some(b'>') {
            let name = self.identifier(b":")?.to_string();
            self.out.push_str(&name);
            while self.peek() == Some(b':') {
                let c = self.next()?;
                self.out.push(c as char);
                if !matches!(self.peek(), Some(b':' | b'>')) && !self.at_type_parameter_start() {
                    self.field_type()?;
                }
            }
        }
        let c = self.next()?;
        self.out.push(c as char);
        Ok(())
    }

    /// An empty class bound is followed directly by the next parameter name.
    fn at_type_parameter_start(&self) -> bool {
        let rest = &self.src[self.pos..];
        match rest.iter().position(|c| matches!(c, b':' | b';' | b'<' | b'>')) {
            Some(i) => rest[i] == b':' && !matches!(rest.first(), Some(b'L' | b'T' | b'[')),
            None => false,
        }
    }

    fn token(&mut self) -> Result<(), String> {
        match self.peek() {
            Some(b'(' | b')' | b'^') => {
                self.pos += 1;
                self.out.push(self.src[self.pos - 1] as char);
                Ok(())
            }
            _ => self.field_type(),
        }
    }

    fn field_type(&mut self) -> Result<(), String> {
        match self.next()? {
            b'L' => self.class_type(),
            b'T' => {
                self.out.push('T');
                let var = self.identifier(b";")?.to_string();
                self.out.push_str(&var);
                let c = self.next()?;
                self.out.push(c as char);
                Ok(())
            }
            b'[' => {
                self.out.push('[');
                self.field_type()
            }
            c @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V') => {
                self.out.push(c as char);
                Ok(())
            }
            c => Err(format!("unexpected `{}` in signature", c as char)),
        }
    }

    fn class_type(&mut self) -> Result<(), String> {
        self.out.push('L');
        let mut original = self.identifier(b"<.;")?.to_string();
        let mut mapped = self
            .remapper
            .map_name(&original)
            .unwrap_or_else(|| original.clone());
        self.out.push_str(&mapped);
        loop {
            match self.next()? {
                b'<' => {
                    self.out.push('<');
                    while self.peek() != Some(b'>') {
                        match self.peek() {
                            Some(b'*') => {
                                self.pos += 1;
                                self.out.push('*');
                            }
                            Some(c @ (b'+' | b'-')) => {
                                self.pos += 1;
                                self.out.push(c as char);
                                self.field_type()?;
                            }
                            _ => self.field_type()?,
                        }
                    }
                    let c = self.next()?;
                    self.out.push(c as char);
                }
                b'.' => {
                    self.out.push('.');
                    let inner = self.identifier(b"<.;")?.to_string();
                    original = format!("{original}${inner}");
                    let full = self
                        .remapper
                        .map_name(&original)
                        .unwrap_or_else(|| format!("{mapped}${inner}"));
                    let simple = full.rsplit_once('$').map_or(inner.as_str(), |(_, s)| s);
                    self.out.push_str(simple);
                    mapped = full.clone();
                }
                b';' => {
                    self.out.push(';');
                    return Ok(());
                }
                c => return Err(format!("unexpected `{}` in class type", c as char)),
            }
        }
    }
}

/// Bounds-checked big-endian reader over class file bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data` within the whole class file.
    base: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Current position within the whole class file.
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// A reader over the next `len` bytes.
    fn sub(&mut self, len: usize) -> Result<Reader<'a>, String> {
        let base = self.offset();
        let data = self.bytes(len)?;
        Ok(Reader { data, pos: 0, base })
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| format!("truncated at offset {}", self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), String> {
        self.bytes(len).map(|_| ())
    }

    fn u1(&mut self) -> Result<u8, String> {
        Ok(self.bytes(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, String> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, String> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
