//! Recursive-descent parser for ABI type names
//!
//! Grammar:
//!
//! ```text
//! type := name [ '<' type (',' type)* '>' ]
//! name := any run of characters other than '<', '>' and ','
//! ```
//!
//! Names may contain spaces and dashes (`utf-8 string`, `counted-variadic`).

use std::collections::HashSet;

use super::error::{AbiError, AbiResult};
use super::types::{IntWidth, TypeDescriptor};

/// Default limit on `<...>` nesting in a type name
pub const DEFAULT_MAX_TYPE_DEPTH: usize = 64;

/// Answers whether a bare name refers to a known custom type
pub trait CustomTypeLookup {
    fn has_custom_type(&self, name: &str) -> bool;
}

/// Lookup for contexts without any custom types
pub struct NoCustomTypes;

impl CustomTypeLookup for NoCustomTypes {
    fn has_custom_type(&self, _name: &str) -> bool {
        false
    }
}

impl CustomTypeLookup for HashSet<String> {
    fn has_custom_type(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Parse a type name with the default depth limit
pub fn parse_type(input: &str, lookup: &dyn CustomTypeLookup) -> AbiResult<TypeDescriptor> {
    parse_type_with_depth(input, lookup, DEFAULT_MAX_TYPE_DEPTH)
}

pub fn parse_type_with_depth(
    input: &str,
    lookup: &dyn CustomTypeLookup,
    max_depth: usize,
) -> AbiResult<TypeDescriptor> {
    let mut parser = TypeParser {
        input,
        pos: 0,
        lookup,
        max_depth,
    };
    let ty = parser.parse(0)?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(ty),
        Some('>') => Err(parser.error("unbalanced '>'")),
        Some(c) => Err(parser.error(format!("unexpected '{c}' at offset {}", parser.pos))),
    }
}

struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
    lookup: &'a dyn CustomTypeLookup,
    max_depth: usize,
}

impl<'a> TypeParser<'a> {
    fn parse(&mut self, depth: usize) -> AbiResult<TypeDescriptor> {
        if depth > self.max_depth {
            return Err(self.error(format!("nesting deeper than {}", self.max_depth)));
        }

        let name = self.parse_name()?;
        self.skip_whitespace();

        if self.peek() != Some('<') {
            return self.build_plain(name);
        }
        self.pos += 1;

        let mut args = vec![self.parse(depth + 1)?];
        loop {
            self.skip_whitespace();
            match self.bump() {
                Some(',') => args.push(self.parse(depth + 1)?),
                Some('>') => break,
                Some(c) => {
                    return Err(self.error(format!("unexpected '{c}' in type arguments")));
                }
                None => return Err(self.error("unbalanced '<'")),
            }
        }

        self.build_generic(name, args)
    }

    fn parse_name(&mut self) -> AbiResult<&'a str> {
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest.find(['<', '>', ',']).unwrap_or(rest.len());
        self.pos += len;
        let name = rest[..len].trim();
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }
        Ok(name)
    }

    fn build_plain(&self, name: &str) -> AbiResult<TypeDescriptor> {
        if let Some(ty) = primitive(name) {
            return Ok(ty);
        }
        if looks_like_integer(name) {
            return Err(self.error(format!("unknown primitive '{name}'")));
        }
        if is_generic_name(name) {
            return Err(self.error(format!("'{name}' expects type arguments")));
        }
        if name.contains(char::is_whitespace) {
            return Err(self.error(format!("invalid type name '{name}'")));
        }
        if self.lookup.has_custom_type(name) {
            return Ok(TypeDescriptor::Custom(name.to_string()));
        }
        Err(AbiError::UnresolvedType(name.to_string()))
    }

    fn build_generic(
        &self,
        name: &str,
        mut args: Vec<TypeDescriptor>,
    ) -> AbiResult<TypeDescriptor> {
        let single = |args: &mut Vec<TypeDescriptor>| -> AbiResult<Box<TypeDescriptor>> {
            if args.len() != 1 {
                return Err(self.error(format!(
                    "'{name}' takes exactly one type argument, got {}",
                    args.len()
                )));
            }
            Ok(Box::new(args.remove(0)))
        };

        match name {
            "List" | "vec" | "Vec" | "ManagedVec" => Ok(TypeDescriptor::List(single(&mut args)?)),
            "Option" => Ok(TypeDescriptor::Option(single(&mut args)?)),
            "variadic" => Ok(TypeDescriptor::Variadic(single(&mut args)?)),
            "counted-variadic" => Ok(TypeDescriptor::CountedVariadic(single(&mut args)?)),
            "optional" => Ok(TypeDescriptor::OptionalValue(single(&mut args)?)),
            "tuple" => Ok(TypeDescriptor::Tuple(args)),
            "multi" => Ok(TypeDescriptor::Composite(args)),
            _ => {
                if let Some(len) = name.strip_prefix("array") {
                    let len: usize = len
                        .parse()
                        .map_err(|_| self.error(format!("non-numeric array length in '{name}'")))?;
                    if len == 0 {
                        return Err(self.error("array length must be positive"));
                    }
                    return Ok(TypeDescriptor::Array(len, single(&mut args)?));
                }
                Err(self.error(format!("unknown generic type '{name}'")))
            }
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> AbiError {
        AbiError::type_syntax(self.input, reason)
    }
}

fn primitive(name: &str) -> Option<TypeDescriptor> {
    let ty = match name {
        "u8" => TypeDescriptor::unsigned(IntWidth::W8),
        "u16" => TypeDescriptor::unsigned(IntWidth::W16),
        "u32" | "usize" => TypeDescriptor::unsigned(IntWidth::W32),
        "u64" => TypeDescriptor::unsigned(IntWidth::W64),
        "u128" => TypeDescriptor::unsigned(IntWidth::W128),
        "u256" => TypeDescriptor::unsigned(IntWidth::W256),
        "i8" => TypeDescriptor::signed(IntWidth::W8),
        "i16" => TypeDescriptor::signed(IntWidth::W16),
        "i32" | "isize" => TypeDescriptor::signed(IntWidth::W32),
        "i64" => TypeDescriptor::signed(IntWidth::W64),
        "i128" => TypeDescriptor::signed(IntWidth::W128),
        "i256" => TypeDescriptor::signed(IntWidth::W256),
        "BigUint" => TypeDescriptor::unsigned(IntWidth::Arbitrary),
        "BigInt" => TypeDescriptor::signed(IntWidth::Arbitrary),
        "bool" => TypeDescriptor::Bool,
        "Address" => TypeDescriptor::Address,
        "H256" => TypeDescriptor::H256,
        "CodeMetadata" => TypeDescriptor::CodeMetadata,
        "nothing" => TypeDescriptor::Nothing,
        "TokenIdentifier" | "EgldOrEsdtTokenIdentifier" => TypeDescriptor::TokenIdentifier,
        "bytes" | "ManagedBuffer" | "BoxedBytes" => TypeDescriptor::Bytes,
        "utf-8 string" | "String" => TypeDescriptor::Utf8String,
        _ => return None,
    };
    Some(ty)
}

/// `u12`, `i7`: integer-shaped names that are not supported widths
fn looks_like_integer(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some('u') | Some('i'))
        && !chars.as_str().is_empty()
        && chars.all(|c| c.is_ascii_digit())
}

fn is_generic_name(name: &str) -> bool {
    matches!(
        name,
        "List" | "vec" | "Vec" | "ManagedVec" | "Option" | "variadic" | "counted-variadic"
            | "optional" | "tuple" | "multi"
    ) || name
        .strip_prefix("array")
        .is_some_and(|len| !len.is_empty() && len.chars().all(|c| c.is_ascii_digit()))
}
